//! Filesystem utilities: reading, atomic writes, worktree walking and stat.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Name of the metadata directory inside a worktree.
pub const GIT_DIR_NAME: &str = ".git";

/// Reads the entire contents of a file as bytes.
///
/// A missing file maps to `Error::PathNotFound`.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    fs::read(path.as_ref()).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::PathNotFound(path.as_ref().to_path_buf())
        } else {
            Error::Io(e)
        }
    })
}

/// Writes data to a file atomically.
///
/// The data goes to a uniquely named temporary file in the target's
/// directory which is then renamed over the target, so readers see either
/// the old or the new content and concurrent writers never share a temp
/// file. Parent directories are created as needed.
pub fn write_file_atomic<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<()> {
    let path = path.as_ref();

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    Ok(())
}

/// Converts a relative path to the `/`-separated form stored in the index.
pub fn to_repo_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Walks a worktree and yields `(path, is_dir)` pairs relative to `root`.
///
/// The metadata directory is pruned. Paths use `/` separators and come back
/// in sorted order; `root` itself is not included.
pub fn walk_worktree<P: AsRef<Path>>(root: P) -> Result<Vec<(String, bool)>> {
    let root = root.as_ref();
    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != GIT_DIR_NAME);

    for entry in walker {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => Error::Io(io),
            None => Error::PathNotFound(root.to_path_buf()),
        })?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| Error::PathOutsideWorktree(entry.path().to_path_buf()))?;
        entries.push((to_repo_path(relative), entry.file_type().is_dir()));
    }

    Ok(entries)
}

/// Lists the regular files of a worktree, excluding the metadata directory.
pub fn list_working_tree<P: AsRef<Path>>(root: P) -> Result<Vec<String>> {
    Ok(walk_worktree(root)?
        .into_iter()
        .filter(|(_, is_dir)| !is_dir)
        .map(|(path, _)| path)
        .collect())
}

/// Lists the files at or below `start`, as paths relative to `root`.
///
/// `keep(path, is_dir)` is asked about every entry below `start`; a
/// rejected directory is not descended into. The metadata directory is
/// always pruned. `start` may itself be a file.
pub fn walk_files<F>(root: &Path, start: &Path, mut keep: F) -> Result<Vec<String>>
where
    F: FnMut(&str, bool) -> bool,
{
    let mut files = Vec::new();

    let walker = WalkDir::new(start)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.file_name() == GIT_DIR_NAME {
                return false;
            }
            match e.path().strip_prefix(root) {
                Ok(rel) if rel.as_os_str().is_empty() => true,
                Ok(rel) => keep(&to_repo_path(rel), e.file_type().is_dir()),
                Err(_) => false,
            }
        });

    for entry in walker {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => Error::Io(io),
            None => Error::PathNotFound(start.to_path_buf()),
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| Error::PathOutsideWorktree(entry.path().to_path_buf()))?;
        files.push(to_repo_path(relative));
    }

    Ok(files)
}

/// File metadata cached in an index entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStat {
    /// Metadata change time as (seconds, nanoseconds).
    pub ctime: (u32, u32),
    /// Content modification time as (seconds, nanoseconds).
    pub mtime: (u32, u32),
    /// Device ID.
    pub dev: u32,
    /// Inode number.
    pub ino: u32,
    /// Owner user ID.
    pub uid: u32,
    /// Owner group ID.
    pub gid: u32,
    /// Size in bytes.
    pub size: u32,
}

impl FileStat {
    /// Stats a file. Values wider than 32 bits are truncated, as git does.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let metadata = fs::metadata(path.as_ref())?;
        Ok(Self::from_metadata(&metadata))
    }

    #[cfg(unix)]
    fn from_metadata(metadata: &fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        FileStat {
            ctime: (metadata.ctime() as u32, metadata.ctime_nsec() as u32),
            mtime: (metadata.mtime() as u32, metadata.mtime_nsec() as u32),
            dev: metadata.dev() as u32,
            ino: metadata.ino() as u32,
            uid: metadata.uid(),
            gid: metadata.gid(),
            size: metadata.size() as u32,
        }
    }

    #[cfg(not(unix))]
    fn from_metadata(metadata: &fs::Metadata) -> Self {
        let mtime = split_time(metadata.modified().ok());
        let ctime = metadata.created().ok().map_or(mtime, |t| split_time(Some(t)));

        FileStat {
            ctime,
            mtime,
            size: metadata.len() as u32,
            ..FileStat::default()
        }
    }
}

/// Splits a system time into whole seconds and nanoseconds since the epoch.
#[cfg_attr(unix, allow(dead_code))]
fn split_time(time: Option<SystemTime>) -> (u32, u32) {
    time.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| (d.as_secs() as u32, d.subsec_nanos()))
        .unwrap_or((0, 0))
}

/// Resolves `path` against `work_dir` and returns it relative to the worktree.
///
/// Relative paths are taken as relative to `work_dir`. `.` and `..`
/// components are folded lexically.
///
/// # Errors
///
/// `Error::PathOutsideWorktree` if the result escapes `work_dir`.
pub fn relative_to_worktree(work_dir: &Path, path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        work_dir.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                if !normalized.pop() {
                    return Err(Error::PathOutsideWorktree(path.to_path_buf()));
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
        .strip_prefix(work_dir)
        .map(Path::to_path_buf)
        .map_err(|_| Error::PathOutsideWorktree(path.to_path_buf()))
}
