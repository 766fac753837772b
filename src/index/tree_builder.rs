//! Builds tree objects from the flat list of index entries.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::objects::{FileMode, LooseObjectStore, Object, Oid, Tree, TreeLeaf};

use super::Index;

/// Writes one tree per directory, deepest first, and returns the root id.
///
/// Every ancestor of a staged file gets a tree, even if it holds only
/// subdirectories. Returns `None` for an empty index.
pub fn write_tree(index: &Index, store: &LooseObjectStore) -> Result<Option<Oid>> {
    if index.is_empty() {
        return Ok(None);
    }

    let mut dirs: BTreeMap<String, Vec<TreeLeaf>> = BTreeMap::new();
    dirs.insert(String::new(), Vec::new());

    for entry in index.iter() {
        let (dir, name) = split_parent(&entry.name);

        let mut ancestor = dir;
        while !ancestor.is_empty() && !dirs.contains_key(ancestor) {
            dirs.insert(ancestor.to_string(), Vec::new());
            ancestor = split_parent(ancestor).0;
        }

        dirs.entry(dir.to_string())
            .or_default()
            .push(TreeLeaf::new(entry.mode(), name, entry.oid));
    }

    // Longer paths are deeper, so children are written before parents.
    let mut order: Vec<String> = dirs.keys().cloned().collect();
    order.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut root = None;
    for dir in order {
        let leaves = dirs.remove(&dir).unwrap_or_default();
        let oid = store.write(&Object::Tree(Tree::new(leaves)))?;

        if dir.is_empty() {
            root = Some(oid);
        } else {
            let (parent, name) = split_parent(&dir);
            dirs.entry(parent.to_string())
                .or_default()
                .push(TreeLeaf::new(FileMode::DIRECTORY, name, oid));
        }
    }

    Ok(root)
}

/// Splits `a/b/c` into (`a/b`, `c`); a top-level name has parent `""`.
fn split_parent(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(pos) => (&path[..pos], &path[pos + 1..]),
        None => ("", path),
    }
}
