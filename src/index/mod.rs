//! Staging index (`.git/index`), format version 2.
//!
//! The index is loaded once per operation, edited in memory and written
//! back in full.

mod reader;
mod tree_builder;
mod writer;

use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::infra::{read_file, write_file_atomic, FileStat};
use crate::objects::{FileMode, Oid};

pub use reader::parse;
pub use tree_builder::write_tree;
pub use writer::write;

/// The only index format version read or written.
pub const INDEX_VERSION: u32 = 2;

/// The 4-bit object type stored in an entry's mode word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeType {
    /// Regular file (`0b1000`).
    Regular,
    /// Symbolic link (`0b1010`).
    Symlink,
    /// Submodule commit (`0b1110`).
    Gitlink,
}

impl ModeType {
    /// The on-disk 4-bit code.
    pub fn bits(self) -> u16 {
        match self {
            ModeType::Regular => 0b1000,
            ModeType::Symlink => 0b1010,
            ModeType::Gitlink => 0b1110,
        }
    }

    /// Decodes a 4-bit code.
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0b1000 => Some(ModeType::Regular),
            0b1010 => Some(ModeType::Symlink),
            0b1110 => Some(ModeType::Gitlink),
            _ => None,
        }
    }
}

/// One staged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Metadata change time as (seconds, nanoseconds).
    pub ctime: (u32, u32),
    /// Content modification time as (seconds, nanoseconds).
    pub mtime: (u32, u32),
    pub dev: u32,
    pub ino: u32,
    pub mode_type: ModeType,
    /// Permission bits (`0o644`, `0o755`, or 0 for links).
    pub mode_perms: u16,
    pub uid: u32,
    pub gid: u32,
    /// File size in bytes, truncated to 32 bits.
    pub size: u32,
    /// Blob id of the staged content.
    pub oid: Oid,
    pub assume_valid: bool,
    /// Merge stage (0 for normal entries).
    pub stage: u8,
    /// Repository-relative path with `/` separators.
    pub name: String,
}

impl IndexEntry {
    /// Builds a regular-file entry (`0o644`) from stat data.
    pub fn from_stat(name: impl Into<String>, oid: Oid, stat: &FileStat) -> Self {
        IndexEntry {
            ctime: stat.ctime,
            mtime: stat.mtime,
            dev: stat.dev,
            ino: stat.ino,
            mode_type: ModeType::Regular,
            mode_perms: 0o644,
            uid: stat.uid,
            gid: stat.gid,
            size: stat.size,
            oid,
            assume_valid: false,
            stage: 0,
            name: name.into(),
        }
    }

    /// The tree leaf mode for this entry, e.g. `100644`.
    pub fn mode(&self) -> FileMode {
        FileMode::from_parts(self.mode_type.bits(), self.mode_perms)
    }
}

/// The staging area: entries sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    entries: Vec<IndexEntry>,
}

impl Index {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps entries as given. Order is preserved on write.
    pub fn from_entries(entries: Vec<IndexEntry>) -> Self {
        Index { entries }
    }

    /// Reads an index file; a missing file is an empty index.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        match read_file(path.as_ref()) {
            Ok(data) => parse(&data),
            Err(Error::PathNotFound(_)) => Ok(Index::new()),
            Err(e) => Err(e),
        }
    }

    /// Replaces the index file atomically.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_file_atomic(path.as_ref(), &write(self))?;
        debug!(entries = self.len(), "wrote index");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in stored order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Finds an entry by name.
    pub fn get(&self, name: &str) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }

    /// Inserts an entry at its sorted position, replacing one with the same name.
    pub fn add(&mut self, entry: IndexEntry) {
        match self
            .entries
            .binary_search_by(|e| e.name.as_str().cmp(entry.name.as_str()))
        {
            Ok(pos) => self.entries[pos] = entry,
            Err(pos) => self.entries.insert(pos, entry),
        }
    }

    /// Removes the entry with the given name.
    pub fn remove(&mut self, name: &str) -> Option<IndexEntry> {
        let pos = self.entries.iter().position(|e| e.name == name)?;
        Some(self.entries.remove(pos))
    }

    /// Sorts entries by name.
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn entry(name: &str, fill: u8) -> IndexEntry {
        IndexEntry {
            ctime: (1_700_000_000, 11),
            mtime: (1_700_000_001, 22),
            dev: 66306,
            ino: 1234,
            mode_type: ModeType::Regular,
            mode_perms: 0o644,
            uid: 1000,
            gid: 1000,
            size: 42,
            oid: Oid::from_bytes([fill; 20]),
            assume_valid: false,
            stage: 0,
            name: name.to_string(),
        }
    }

    // I-001: add keeps entries sorted and replaces by name
    #[test]
    fn test_add_sorted_and_replace() {
        let mut index = Index::new();
        index.add(entry("b.txt", 1));
        index.add(entry("a/x.txt", 2));
        index.add(entry("c", 3));
        index.add(entry("b.txt", 9));

        let names: Vec<_> = index.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a/x.txt", "b.txt", "c"]);
        assert_eq!(index.get("b.txt").unwrap().oid, Oid::from_bytes([9; 20]));
    }

    // I-002: remove returns the dropped entry
    #[test]
    fn test_remove() {
        let mut index = Index::from_entries(vec![entry("a", 1), entry("b", 2)]);

        assert_eq!(index.remove("a").unwrap().name, "a");
        assert!(index.remove("a").is_none());
        assert_eq!(index.len(), 1);
    }

    // I-003: mode combines type and permissions
    #[test]
    fn test_entry_mode() {
        let mut e = entry("run.sh", 1);
        assert_eq!(e.mode(), FileMode::REGULAR);
        e.mode_perms = 0o755;
        assert_eq!(e.mode(), FileMode::EXECUTABLE);
        e.mode_type = ModeType::Symlink;
        e.mode_perms = 0;
        assert_eq!(e.mode(), FileMode::SYMLINK);
    }

    #[test]
    fn test_mode_type_bits() {
        for t in [ModeType::Regular, ModeType::Symlink, ModeType::Gitlink] {
            assert_eq!(ModeType::from_bits(t.bits()), Some(t));
        }
        assert_eq!(ModeType::from_bits(0b0100), None);
    }

    // I-004: load of a missing file is empty; save then load round-trips
    #[test]
    fn test_load_save() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index");

        assert!(Index::load(&path).unwrap().is_empty());

        let index = Index::from_entries(vec![entry("a", 1), entry("dir/b", 2)]);
        index.save(&path).unwrap();
        assert_eq!(Index::load(&path).unwrap(), index);
    }

    #[test]
    fn test_sort() {
        let mut index = Index::from_entries(vec![entry("z", 1), entry("a", 2)]);
        index.sort();
        assert_eq!(index.entries()[0].name, "a");
    }
}
