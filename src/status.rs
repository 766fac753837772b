//! Working tree status.
//!
//! Two independent, read-only comparisons: HEAD's tree against the index
//! (what is staged) and the index against the files on disk (what is not).

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::Result;
use crate::ignore::IgnoreRules;
use crate::index::Index;
use crate::infra::list_working_tree;
use crate::objects::{LooseObjectStore, ObjectKind, Oid};
use crate::refs::Head;

/// Flattens a tree into `path -> id` for every non-tree leaf, recursively.
pub fn flatten_tree(
    store: &LooseObjectStore,
    tree_oid: &Oid,
    prefix: &str,
    result: &mut BTreeMap<String, Oid>,
) -> Result<()> {
    let tree = store.read(tree_oid)?.into_tree()?;

    for leaf in tree.leaves() {
        let path = if prefix.is_empty() {
            leaf.name.clone()
        } else {
            format!("{}/{}", prefix, leaf.name)
        };

        if leaf.mode.is_tree() {
            flatten_tree(store, &leaf.oid, &path, result)?;
        } else {
            result.insert(path, leaf.oid);
        }
    }

    Ok(())
}

/// Differences between HEAD's tree and the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedChanges {
    /// In the index but not in HEAD.
    pub new: Vec<String>,
    /// In both with different content.
    pub modified: Vec<String>,
    /// In HEAD but not in the index.
    pub deleted: Vec<String>,
}

impl StagedChanges {
    pub fn has_changes(&self) -> bool {
        !(self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty())
    }
}

/// Differences between the index and the working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeChanges {
    /// Content differs from the staged blob, or the file could not be read.
    pub modified: Vec<String>,
    /// Staged but missing on disk.
    pub deleted: Vec<String>,
    /// On disk, not staged and not ignored.
    pub untracked: Vec<String>,
}

impl WorktreeChanges {
    pub fn has_changes(&self) -> bool {
        !(self.modified.is_empty() && self.deleted.is_empty() && self.untracked.is_empty())
    }
}

/// Compares a flattened HEAD tree with the index.
///
/// An empty `head` (no commits yet) makes every index entry new.
pub fn head_vs_index(head: &BTreeMap<String, Oid>, index: &Index) -> StagedChanges {
    let mut changes = StagedChanges::default();
    let mut staged = HashSet::new();

    for entry in index.iter() {
        staged.insert(entry.name.as_str());
        match head.get(&entry.name) {
            None => changes.new.push(entry.name.clone()),
            Some(oid) if *oid != entry.oid => changes.modified.push(entry.name.clone()),
            Some(_) => {}
        }
    }

    changes.deleted = head
        .keys()
        .filter(|path| !staged.contains(path.as_str()))
        .cloned()
        .collect();

    changes
}

/// Compares the index with the files under `work_dir`.
///
/// Files are hashed as raw bytes. The metadata directory is never visited.
pub fn index_vs_worktree(
    work_dir: &Path,
    index: &Index,
    ignore: &IgnoreRules,
) -> Result<WorktreeChanges> {
    let mut changes = WorktreeChanges::default();

    for entry in index.iter() {
        let full_path = work_dir.join(&entry.name);

        if fs::symlink_metadata(&full_path).is_err() {
            changes.deleted.push(entry.name.clone());
            continue;
        }

        match fs::read(&full_path) {
            Ok(content) => {
                if Oid::for_object(ObjectKind::Blob, &content) != entry.oid {
                    changes.modified.push(entry.name.clone());
                }
            }
            Err(e) => {
                warn!(path = %entry.name, error = %e, "unreadable file treated as modified");
                changes.modified.push(entry.name.clone());
            }
        }
    }

    for path in list_working_tree(work_dir)? {
        if index.get(&path).is_none() && !ignore.check(&path)? {
            changes.untracked.push(path);
        }
    }

    Ok(changes)
}

/// The full status of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Where HEAD points.
    pub head: Head,
    /// HEAD vs index.
    pub staged: StagedChanges,
    /// Index vs working tree.
    pub unstaged: WorktreeChanges,
}

impl Status {
    /// True if the working tree is clean.
    pub fn is_clean(&self) -> bool {
        !self.staged.has_changes() && !self.unstaged.has_changes()
    }
}
