//! Reading, writing and listing references.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::head::Head;
use crate::error::{Error, Result};
use crate::infra::write_file_atomic;
use crate::objects::Oid;

/// The content of one reference file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefValue {
    /// An object id.
    Direct(Oid),
    /// `ref: <name>` indirection to another reference.
    Symbolic(String),
}

/// A level of the reference namespace, sorted by name.
pub type RefTree = BTreeMap<String, RefNode>;

/// A node in a [`RefTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefNode {
    /// A reference and the id it resolves to.
    Ref(Oid),
    /// A directory of further references.
    Dir(RefTree),
}

/// Loose references under a `.git` directory.
#[derive(Debug)]
pub struct RefStore {
    /// Path to the `.git` directory.
    git_dir: PathBuf,
}

impl RefStore {
    /// Creates a new RefStore for the given `.git` directory.
    pub fn new<P: AsRef<Path>>(git_dir: P) -> Self {
        RefStore {
            git_dir: git_dir.as_ref().to_path_buf(),
        }
    }

    /// Reads a reference file. A missing file is `None`.
    pub fn read_ref_file(&self, name: &str) -> Result<Option<RefValue>> {
        let content = match fs::read_to_string(self.git_dir.join(name)) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        };

        let content = content.trim();
        if let Some(target) = content.strip_prefix("ref: ") {
            Ok(Some(RefValue::Symbolic(target.trim().to_string())))
        } else {
            Ok(Some(RefValue::Direct(Oid::from_hex(content)?)))
        }
    }

    /// Follows `ref: ` indirection until an id is found.
    ///
    /// Returns `None` when a reference in the chain does not exist, which is
    /// the normal state of `HEAD` before the first commit.
    ///
    /// # Errors
    ///
    /// `Error::ReferenceCycle` if the chain revisits a name.
    pub fn resolve(&self, name: &str) -> Result<Option<Oid>> {
        let mut visited = HashSet::new();
        let mut current = name.to_string();

        loop {
            if !visited.insert(current.clone()) {
                return Err(Error::ReferenceCycle(name.to_string()));
            }

            match self.read_ref_file(&current)? {
                None => return Ok(None),
                Some(RefValue::Direct(oid)) => return Ok(Some(oid)),
                Some(RefValue::Symbolic(target)) => current = target,
            }
        }
    }

    /// Points `name` at `oid`, overwriting any existing value.
    pub fn create(&self, name: &str, oid: &Oid) -> Result<()> {
        write_file_atomic(self.git_dir.join(name), format!("{}\n", oid).as_bytes())?;
        debug!(reference = name, oid = %oid, "updated reference");
        Ok(())
    }

    /// Makes `name` a symbolic reference to `target`.
    pub fn create_symbolic(&self, name: &str, target: &str) -> Result<()> {
        write_file_atomic(self.git_dir.join(name), format!("ref: {}\n", target).as_bytes())?;
        debug!(reference = name, target, "updated symbolic reference");
        Ok(())
    }

    /// True if a file exists for `name`.
    pub fn exists(&self, name: &str) -> bool {
        self.git_dir.join(name).is_file()
    }

    /// Reads `HEAD` as a branch or a detached id.
    ///
    /// A symbolic HEAD whose target is outside `refs/heads/` reads as
    /// detached at the target's id, or as unborn while the target is missing.
    pub fn head(&self) -> Result<Head> {
        match self.read_ref_file("HEAD")? {
            None => Err(Error::NoSuchReference("HEAD".to_string())),
            Some(RefValue::Direct(oid)) => Ok(Head::detached(oid)),
            Some(RefValue::Symbolic(target)) => {
                let oid = self.resolve(&target)?;
                if let Some(branch) = target.strip_prefix("refs/heads/") {
                    return Ok(Head::branch(branch, oid));
                }
                Ok(match oid {
                    Some(oid) => Head::detached(oid),
                    None => Head::unborn(target),
                })
            }
        }
    }

    /// Lists every resolvable reference under `root` (e.g. `refs`).
    ///
    /// Dangling references are left out.
    pub fn list(&self, root: &str) -> Result<RefTree> {
        self.list_dir(&self.git_dir.join(root), root)
    }

    fn list_dir(&self, dir: &Path, prefix: &str) -> Result<RefTree> {
        let mut tree = RefTree::new();

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(tree),
            Err(e) => return Err(Error::Io(e)),
        };

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let full_name = format!("{}/{}", prefix, name);

            if entry.file_type()?.is_dir() {
                tree.insert(name, RefNode::Dir(self.list_dir(&entry.path(), &full_name)?));
            } else if let Some(oid) = self.resolve(&full_name)? {
                tree.insert(name, RefNode::Ref(oid));
            }
        }

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const OID1: &str = "1111111111111111111111111111111111111111";
    const OID2: &str = "2222222222222222222222222222222222222222";

    fn setup() -> (TempDir, RefStore) {
        let temp_dir = TempDir::new().unwrap();
        let git_dir = temp_dir.path().join(".git");
        fs::create_dir_all(git_dir.join("refs/heads")).unwrap();
        fs::create_dir_all(git_dir.join("refs/tags")).unwrap();
        let store = RefStore::new(&git_dir);
        (temp_dir, store)
    }

    fn oid(hex: &str) -> Oid {
        Oid::from_hex(hex).unwrap()
    }

    // RF-001: HEAD -> refs/heads/master -> id
    #[test]
    fn test_resolve_chain() {
        let (_dir, store) = setup();
        store.create_symbolic("HEAD", "refs/heads/master").unwrap();
        store.create("refs/heads/master", &oid(OID1)).unwrap();

        assert_eq!(store.resolve("HEAD").unwrap(), Some(oid(OID1)));
        assert_eq!(
            store.read_ref_file("HEAD").unwrap(),
            Some(RefValue::Symbolic("refs/heads/master".to_string()))
        );
    }

    // RF-002: missing files resolve to None
    #[test]
    fn test_resolve_missing() {
        let (_dir, store) = setup();
        assert_eq!(store.resolve("HEAD").unwrap(), None);

        store.create_symbolic("HEAD", "refs/heads/master").unwrap();
        assert_eq!(store.resolve("HEAD").unwrap(), None);
    }

    // RF-003: cycles fail instead of recursing
    #[test]
    fn test_resolve_cycle() {
        let (_dir, store) = setup();
        store.create_symbolic("refs/heads/a", "refs/heads/b").unwrap();
        store.create_symbolic("refs/heads/b", "refs/heads/a").unwrap();
        store.create_symbolic("refs/heads/self", "refs/heads/self").unwrap();

        assert!(matches!(
            store.resolve("refs/heads/a"),
            Err(Error::ReferenceCycle(name)) if name == "refs/heads/a"
        ));
        assert!(matches!(
            store.resolve("refs/heads/self"),
            Err(Error::ReferenceCycle(_))
        ));
    }

    // RF-004: create overwrites and creates parents
    #[test]
    fn test_create_overwrites() {
        let (dir, store) = setup();
        store.create("refs/heads/feature/x", &oid(OID1)).unwrap();
        store.create("refs/heads/feature/x", &oid(OID2)).unwrap();

        let content = fs::read_to_string(dir.path().join(".git/refs/heads/feature/x")).unwrap();
        assert_eq!(content, format!("{}\n", OID2));
        assert!(store.exists("refs/heads/feature/x"));
    }

    // RF-005: list nests directories, sorts names, skips dangling refs
    #[test]
    fn test_list() {
        let (_dir, store) = setup();
        store.create("refs/heads/master", &oid(OID1)).unwrap();
        store.create("refs/heads/feature/x", &oid(OID2)).unwrap();
        store.create("refs/tags/v1", &oid(OID2)).unwrap();
        store.create_symbolic("refs/heads/dangling", "refs/heads/nope").unwrap();

        let refs = store.list("refs").unwrap();
        let top: Vec<_> = refs.keys().cloned().collect();
        assert_eq!(top, vec!["heads", "tags"]);

        let heads = match &refs["heads"] {
            RefNode::Dir(heads) => heads,
            other => panic!("expected dir, got {:?}", other),
        };
        let names: Vec<_> = heads.keys().cloned().collect();
        assert_eq!(names, vec!["feature", "master"]);
        assert_eq!(heads["master"], RefNode::Ref(oid(OID1)));

        let mut feature = RefTree::new();
        feature.insert("x".to_string(), RefNode::Ref(oid(OID2)));
        assert_eq!(heads["feature"], RefNode::Dir(feature));
    }

    // RF-006: head() on a branch, unborn branch and detached id
    #[test]
    fn test_head() {
        let (_dir, store) = setup();
        assert!(matches!(store.head(), Err(Error::NoSuchReference(_))));

        store.create_symbolic("HEAD", "refs/heads/master").unwrap();
        assert_eq!(store.head().unwrap(), Head::branch("master", None));

        store.create("refs/heads/master", &oid(OID1)).unwrap();
        assert_eq!(store.head().unwrap(), Head::branch("master", Some(oid(OID1))));

        store.create("HEAD", &oid(OID2)).unwrap();
        assert_eq!(store.head().unwrap(), Head::detached(oid(OID2)));
    }

    // RF-007: head() on a symbolic target outside refs/heads
    #[test]
    fn test_head_non_branch_target() {
        let (_dir, store) = setup();
        store.create_symbolic("HEAD", "refs/work/next").unwrap();
        assert_eq!(store.head().unwrap(), Head::unborn("refs/work/next"));

        store.create("refs/work/next", &oid(OID1)).unwrap();
        assert_eq!(store.head().unwrap(), Head::detached(oid(OID1)));
    }

    #[test]
    fn test_invalid_ref_content() {
        let (dir, store) = setup();
        fs::write(dir.path().join(".git/refs/heads/bad"), "not-a-hash\n").unwrap();
        assert!(matches!(
            store.resolve("refs/heads/bad"),
            Err(Error::InvalidOid(_))
        ));
    }
}
