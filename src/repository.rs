//! Repository handle and the operations built on the object store, the
//! index and the reference namespace.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ignore::{global_ignore_path, parse_rules, read_rules_file, IgnoreRules};
use crate::index::{write_tree, Index, IndexEntry};
use crate::infra::{relative_to_worktree, to_repo_path, walk_files, FileStat, GIT_DIR_NAME};
use crate::objects::{
    is_hex_prefix, Commit, FileMode, LooseObjectStore, Object, ObjectKind, Oid, Signature, Tag,
    Tree,
};
use crate::refs::{Head, RefStore, RefTree};
use crate::status::{flatten_tree, head_vs_index, index_vs_worktree, Status};

/// Branch HEAD points to in a new repository.
pub const DEFAULT_BRANCH: &str = "master";

/// Tagger used for annotated tags when no identity is configured.
const PLACEHOLDER_IDENTITY: &str = "looseleaf <looseleaf@localhost>";

const DESCRIPTION: &str =
    "Unnamed repository; edit this file 'description' to name the repository.\n";

/// Reference namespaces searched, in order, when resolving a short name.
const NAME_PREFIXES: [&str; 3] = ["refs/tags/", "refs/heads/", "refs/remotes/"];

/// One line of `ls-tree` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Leaf mode, displayed as six octal digits.
    pub mode: FileMode,
    /// Kind derived from the mode.
    pub kind: ObjectKind,
    pub oid: Oid,
    /// Path relative to the listed tree.
    pub path: String,
}

/// A commit reached by [`Repository::log`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub oid: Oid,
    pub commit: Commit,
}

/// A repository: a worktree and its `.git` directory.
///
/// Found once per command and passed to every operation.
#[derive(Debug)]
pub struct Repository {
    /// The root directory of the working tree.
    work_dir: PathBuf,
    /// The path to the `.git` directory.
    git_dir: PathBuf,
}

impl Repository {
    /// Creates a new repository at `path`.
    ///
    /// The directory is created if needed. An existing non-empty `.git`
    /// directory is refused.
    ///
    /// # Errors
    ///
    /// - `Error::NotADirectory` if `path` (or its `.git`) is a file.
    /// - `Error::DirectoryNotEmpty` if `.git` already has content.
    pub fn init<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() && !path.is_dir() {
            return Err(Error::NotADirectory(path.to_path_buf()));
        }

        let git_dir = path.join(GIT_DIR_NAME);
        if git_dir.exists() {
            if !git_dir.is_dir() {
                return Err(Error::NotADirectory(git_dir));
            }
            if fs::read_dir(&git_dir)?.next().is_some() {
                return Err(Error::DirectoryNotEmpty(git_dir));
            }
        }

        for dir in ["objects", "refs/heads", "refs/tags"] {
            fs::create_dir_all(git_dir.join(dir))?;
        }
        fs::write(git_dir.join("description"), DESCRIPTION)?;
        fs::write(
            git_dir.join("HEAD"),
            format!("ref: refs/heads/{}\n", DEFAULT_BRANCH),
        )?;
        fs::write(
            git_dir.join("config"),
            Config::repository_default().to_string(),
        )?;

        let work_dir = path.canonicalize()?;
        info!(path = %work_dir.display(), "initialized empty repository");

        Ok(Repository {
            git_dir: work_dir.join(GIT_DIR_NAME),
            work_dir,
        })
    }

    /// Opens the repository whose worktree (or `.git` directory) is `path`.
    ///
    /// # Errors
    ///
    /// - `Error::NotARepository` if there is no `.git` directory.
    /// - `Error::InvalidConfiguration` if `.git/config` is missing, unparseable
    ///   or lacks `core.repositoryformatversion`.
    /// - `Error::UnsupportedRepositoryFormat` if that version is not 0.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let abs_path = path
            .canonicalize()
            .map_err(|_| Error::NotARepository(path.to_path_buf()))?;

        let (work_dir, git_dir) = if abs_path.ends_with(GIT_DIR_NAME) {
            let work_dir = abs_path
                .parent()
                .ok_or_else(|| Error::NotARepository(path.to_path_buf()))?
                .to_path_buf();
            (work_dir, abs_path)
        } else {
            let git_dir = abs_path.join(GIT_DIR_NAME);
            (abs_path, git_dir)
        };

        if !git_dir.is_dir() {
            return Err(Error::NotARepository(path.to_path_buf()));
        }

        let repo = Repository { work_dir, git_dir };
        repo.validate_config()?;
        Ok(repo)
    }

    /// Walks up from `path` until a directory containing `.git` is found.
    ///
    /// # Errors
    ///
    /// `Error::NotARepository` if the filesystem root is reached.
    pub fn discover<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut current = path
            .canonicalize()
            .map_err(|_| Error::NotARepository(path.to_path_buf()))?;

        loop {
            if current.join(GIT_DIR_NAME).is_dir() {
                return Self::open(&current);
            }
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Err(Error::NotARepository(path.to_path_buf())),
            }
        }
    }

    fn validate_config(&self) -> Result<()> {
        let config = match self.config() {
            Ok(config) => config,
            Err(Error::PathNotFound(p)) => {
                return Err(Error::InvalidConfiguration(format!(
                    "configuration file missing: {}",
                    p.display()
                )))
            }
            Err(e) => return Err(e),
        };

        match config.get_int("core", "repositoryformatversion")? {
            Some(0) => Ok(()),
            Some(version) => Err(Error::UnsupportedRepositoryFormat(version)),
            None => Err(Error::InvalidConfiguration(
                "core.repositoryformatversion is not set".to_string(),
            )),
        }
    }

    /// The worktree root.
    pub fn path(&self) -> &Path {
        &self.work_dir
    }

    /// The `.git` directory.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn object_store(&self) -> LooseObjectStore {
        LooseObjectStore::new(self.git_dir.join("objects"))
    }

    pub fn ref_store(&self) -> RefStore {
        RefStore::new(&self.git_dir)
    }

    /// Reads `.git/config`.
    pub fn config(&self) -> Result<Config> {
        Config::from_file(self.git_dir.join("config"))
    }

    fn index_path(&self) -> PathBuf {
        self.git_dir.join("index")
    }

    /// Reads the index; an absent file is an empty index.
    pub fn read_index(&self) -> Result<Index> {
        Index::load(self.index_path())
    }

    /// Replaces the index file.
    pub fn write_index(&self, index: &Index) -> Result<()> {
        index.save(self.index_path())
    }

    /// Hashes `data` as an object of `kind`, storing it if `write` is set.
    ///
    /// The data must decode as `kind`, so a malformed tree or commit is
    /// rejected before anything is written. The id covers the bytes as given.
    pub fn hash_object(&self, data: &[u8], kind: ObjectKind, write: bool) -> Result<Oid> {
        Object::decode(kind, data)?;

        if write {
            self.object_store().write_raw(kind, data)
        } else {
            Ok(Oid::for_object(kind, data))
        }
    }

    /// The stored payload of the object `name` resolves to.
    ///
    /// With a `kind`, tags and commits are followed towards it.
    pub fn cat_file(&self, name: &str, kind: Option<ObjectKind>) -> Result<Vec<u8>> {
        let oid = self.find(name, kind, true)?;
        Ok(self.object_store().read_raw(&oid)?.payload)
    }

    /// Every object a name could refer to.
    ///
    /// `HEAD` is taken literally. Otherwise the name is tried as an id
    /// prefix, then under `refs/tags/`, `refs/heads/` and `refs/remotes/`.
    /// A hex-looking name is lowercased first. Every hit is reported, so a
    /// tag and a branch naming the same object count as two candidates.
    pub fn resolve_candidates(&self, name: &str) -> Result<Vec<Oid>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(Vec::new());
        }

        let refs = self.ref_store();
        if name == "HEAD" {
            return Ok(refs.resolve("HEAD")?.into_iter().collect());
        }

        let mut candidates = Vec::new();
        let name = if is_hex_prefix(name) {
            let lowered = name.to_ascii_lowercase();
            candidates.extend(self.object_store().find_by_prefix(&lowered)?);
            lowered
        } else {
            name.to_string()
        };
        for prefix in NAME_PREFIXES {
            if let Some(oid) = refs.resolve(&format!("{}{}", prefix, name))? {
                candidates.push(oid);
            }
        }

        Ok(candidates)
    }

    /// Resolves a name to a single object id.
    ///
    /// With `kind` and `follow`, tags are peeled to their target and a
    /// commit becomes its tree when a tree is wanted. Peeling stops at the
    /// first object that cannot be followed further, or that is not in the
    /// store, so the result is not guaranteed to be of `kind`.
    ///
    /// # Errors
    ///
    /// - `Error::NoSuchReference` if nothing matches.
    /// - `Error::AmbiguousReference` if more than one object matches.
    pub fn find(&self, name: &str, kind: Option<ObjectKind>, follow: bool) -> Result<Oid> {
        let candidates = self.resolve_candidates(name)?;
        let mut oid = match candidates.as_slice() {
            [] => return Err(Error::NoSuchReference(name.to_string())),
            [oid] => *oid,
            _ => {
                return Err(Error::AmbiguousReference {
                    name: name.to_string(),
                    candidates: candidates.iter().map(Oid::to_hex).collect(),
                })
            }
        };

        let want = match kind {
            Some(want) if follow => want,
            _ => return Ok(oid),
        };

        let store = self.object_store();
        loop {
            let object = match store.read(&oid) {
                Err(Error::ObjectNotFound(_)) => return Ok(oid),
                other => other?,
            };
            if object.kind() == want {
                return Ok(oid);
            }
            oid = match object {
                Object::Tag(tag) => tag.target()?,
                Object::Commit(commit) if want == ObjectKind::Tree => commit.tree()?,
                _ => return Ok(oid),
            };
        }
    }

    /// Lists the tree `name` resolves to.
    ///
    /// When `recursive`, subtrees are expanded and only their non-tree
    /// leaves are listed, with joined paths.
    pub fn ls_tree(&self, name: &str, recursive: bool) -> Result<Vec<TreeEntry>> {
        let oid = self.find(name, Some(ObjectKind::Tree), true)?;
        let mut entries = Vec::new();
        self.collect_tree(&oid, "", recursive, &mut entries)?;
        Ok(entries)
    }

    fn collect_tree(
        &self,
        oid: &Oid,
        prefix: &str,
        recursive: bool,
        out: &mut Vec<TreeEntry>,
    ) -> Result<()> {
        let tree = self.object_store().read(oid)?.into_tree()?;

        for leaf in tree.leaves() {
            let kind = leaf.mode.object_kind().ok_or_else(|| Error::CorruptObject {
                oid: oid.to_hex(),
                reason: format!("unexpected mode {} for {}", leaf.mode, leaf.name),
            })?;
            let path = if prefix.is_empty() {
                leaf.name.clone()
            } else {
                format!("{}/{}", prefix, leaf.name)
            };

            if recursive && kind == ObjectKind::Tree {
                self.collect_tree(&leaf.oid, &path, recursive, out)?;
            } else {
                out.push(TreeEntry {
                    mode: leaf.mode,
                    kind,
                    oid: leaf.oid,
                    path,
                });
            }
        }

        Ok(())
    }

    /// The ancestry of the commit `name` resolves to.
    ///
    /// Depth-first over every parent, first parent first; each commit
    /// appears once.
    pub fn log(&self, name: &str) -> Result<Vec<LogEntry>> {
        let start = self.find(name, Some(ObjectKind::Commit), true)?;
        let store = self.object_store();

        let mut seen = HashSet::new();
        let mut stack = vec![start];
        let mut entries = Vec::new();

        while let Some(oid) = stack.pop() {
            if !seen.insert(oid) {
                continue;
            }
            let commit = store.read(&oid)?.into_commit()?;
            stack.extend(commit.parents()?.into_iter().rev());
            entries.push(LogEntry { oid, commit });
        }

        Ok(entries)
    }

    /// Every resolvable reference under `.git/refs`.
    pub fn refs(&self) -> Result<RefTree> {
        self.ref_store().list("refs")
    }

    /// Where `HEAD` points.
    pub fn head(&self) -> Result<Head> {
        self.ref_store().head()
    }

    /// Creates `refs/tags/<name>` for the object `target` resolves to.
    ///
    /// With an `annotation`, a tag object carrying that message is written
    /// and the ref points at it; otherwise the ref points at the target.
    pub fn tag(&self, name: &str, target: &str, annotation: Option<&str>) -> Result<Oid> {
        let target = self.find(target, None, true)?;
        let ref_name = format!("refs/tags/{}", name);

        let oid = match annotation {
            None => target,
            Some(message) => {
                let store = self.object_store();
                let target_kind = store.read_raw(&target)?.kind;
                let tagger = Signature::now(
                    self.user_identity()
                        .unwrap_or_else(|| PLACEHOLDER_IDENTITY.to_string()),
                );
                let tag = Tag::new(
                    target,
                    target_kind,
                    name,
                    &tagger,
                    &format!("{}\n", message.trim()),
                );
                store.write(&Object::Tag(tag))?
            }
        };

        self.ref_store().create(&ref_name, &oid)?;
        Ok(oid)
    }

    /// The configured identity: repository config over the global files.
    fn user_identity(&self) -> Option<String> {
        let mut config = Config::global();
        if let Ok(local) = self.config() {
            config.merge(&local);
        }
        config.user_identity()
    }

    /// Converts a user-supplied path to an index name.
    fn repo_path(&self, path: &Path) -> Result<String> {
        Ok(to_repo_path(&relative_to_worktree(&self.work_dir, path)?))
    }

    /// Stages files and directories.
    ///
    /// Directories are walked recursively; ignored files and directories
    /// are skipped. Entries whose content is unchanged are left untouched.
    ///
    /// # Errors
    ///
    /// - `Error::PathOutsideWorktree` if a path escapes the worktree.
    /// - `Error::PathNotFound` if a path does not exist.
    pub fn add<P: AsRef<Path>>(&self, paths: &[P]) -> Result<()> {
        let mut index = self.read_index()?;
        let ignore = self.ignore_rules_for(&index)?;
        let store = self.object_store();

        let mut files = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let name = self.repo_path(path)?;
            if is_metadata_path(&name) {
                debug!(path = %name, "skipping metadata path");
                continue;
            }

            let full_path = self.work_dir.join(&name);
            if fs::symlink_metadata(&full_path).is_err() {
                return Err(Error::PathNotFound(path.to_path_buf()));
            }

            files.extend(walk_files(&self.work_dir, &full_path, |p, _| {
                !matches!(ignore.check(p), Ok(true))
            })?);
        }

        for name in files {
            let full_path = self.work_dir.join(&name);
            let content = fs::read(&full_path)?;
            let oid = store.write_raw(ObjectKind::Blob, &content)?;

            if index.get(&name).is_some_and(|entry| entry.oid == oid) {
                continue;
            }

            let stat = FileStat::from_path(&full_path)?;
            index.add(IndexEntry::from_stat(name, oid, &stat));
        }

        index.sort();
        self.write_index(&index)
    }

    /// Unstages paths, optionally deleting the files too.
    ///
    /// Every path is checked before anything is changed.
    ///
    /// # Errors
    ///
    /// `Error::PathNotInIndex` if any path is not staged.
    pub fn rm<P: AsRef<Path>>(&self, paths: &[P], delete_files: bool) -> Result<()> {
        let mut index = self.read_index()?;

        let names = paths
            .iter()
            .map(|p| self.repo_path(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        if let Some(missing) = names.iter().find(|name| index.get(name).is_none()) {
            return Err(Error::PathNotInIndex(missing.clone()));
        }

        for name in &names {
            index.remove(name);
            if delete_files {
                match fs::remove_file(self.work_dir.join(name)) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(Error::Io(e)),
                }
            }
        }

        self.write_index(&index)
    }

    /// Records the index as a new commit on the current branch.
    ///
    /// `author` is `Name <email>`; without it the configured identity is used.
    ///
    /// # Errors
    ///
    /// - `Error::NothingToCommit` if the index is empty or matches HEAD's tree.
    /// - `Error::MissingIdentity` if no author is available.
    pub fn commit(&self, message: &str, author: Option<&str>) -> Result<Oid> {
        let index = self.read_index()?;
        let store = self.object_store();

        let tree = write_tree(&index, &store)?.ok_or(Error::NothingToCommit)?;

        let refs = self.ref_store();
        let head = refs.head()?;
        let parent = head.oid().copied();
        if let Some(parent) = &parent {
            if store.read(parent)?.into_commit()?.tree()? == tree {
                return Err(Error::NothingToCommit);
            }
        }

        let identity = match author {
            Some(author) => author.to_string(),
            None => self.user_identity().ok_or(Error::MissingIdentity)?,
        };
        let signature = Signature::now(identity);
        let parents: Vec<Oid> = parent.into_iter().collect();
        let commit = Commit::new(
            tree,
            &parents,
            &signature,
            &signature,
            &format!("{}\n", message.trim()),
        );

        let oid = store.write(&Object::Commit(commit))?;
        refs.create(&head.ref_name(), &oid)?;

        info!(oid = %oid, reference = %head.ref_name(), "created commit");
        Ok(oid)
    }

    /// Writes the tree `name` resolves to into `target`.
    ///
    /// A commit is replaced by its tree. `target` must be absent or an
    /// empty directory.
    pub fn checkout<P: AsRef<Path>>(&self, name: &str, target: P) -> Result<()> {
        let target = target.as_ref();
        let oid = self.find(name, Some(ObjectKind::Tree), true)?;
        let store = self.object_store();
        let tree = store.read(&oid)?.into_tree()?;

        if target.exists() {
            if !target.is_dir() {
                return Err(Error::NotADirectory(target.to_path_buf()));
            }
            if fs::read_dir(target)?.next().is_some() {
                return Err(Error::DirectoryNotEmpty(target.to_path_buf()));
            }
        } else {
            fs::create_dir_all(target)?;
        }

        materialize(&store, &oid, &tree, target)?;
        debug!(tree = %oid, target = %target.display(), "checked out tree");
        Ok(())
    }

    /// Ignore rules: `info/exclude`, the global ignore file, then every
    /// `.gitignore` in the index scoped to its directory.
    pub fn ignore_rules(&self) -> Result<IgnoreRules> {
        self.ignore_rules_for(&self.read_index()?)
    }

    fn ignore_rules_for(&self, index: &Index) -> Result<IgnoreRules> {
        let mut rules = IgnoreRules::new();

        if let Some(list) = read_rules_file(self.git_dir.join("info").join("exclude"))? {
            rules.add_absolute(list);
        }
        if let Some(path) = global_ignore_path() {
            if let Some(list) = read_rules_file(&path)? {
                rules.add_absolute(list);
            }
        }

        let store = self.object_store();
        for entry in index.iter() {
            let dir = if entry.name == ".gitignore" {
                ""
            } else if let Some(dir) = entry.name.strip_suffix("/.gitignore") {
                dir
            } else {
                continue;
            };
            let blob = store.read(&entry.oid)?.into_blob()?;
            rules.add_scoped(dir, parse_rules(&String::from_utf8_lossy(blob.content())));
            debug!(path = %entry.name, "loaded ignore rules");
        }

        Ok(rules)
    }

    /// The subset of `paths` that is ignored.
    pub fn check_ignore(&self, paths: &[&str]) -> Result<Vec<String>> {
        let rules = self.ignore_rules()?;
        let mut ignored = Vec::new();
        for path in paths {
            if rules.check(path)? {
                ignored.push(path.to_string());
            }
        }
        Ok(ignored)
    }

    /// HEAD, staged changes and unstaged changes.
    pub fn status(&self) -> Result<Status> {
        let head = self.head()?;
        let index = self.read_index()?;
        let store = self.object_store();

        let mut head_files = BTreeMap::new();
        if let Some(oid) = head.oid() {
            let tree = store.read(oid)?.into_commit()?.tree()?;
            flatten_tree(&store, &tree, "", &mut head_files)?;
        }

        let ignore = self.ignore_rules_for(&index)?;
        Ok(Status {
            staged: head_vs_index(&head_files, &index),
            unstaged: index_vs_worktree(&self.work_dir, &index, &ignore)?,
            head,
        })
    }
}

/// True for `.git` and anything below it.
fn is_metadata_path(name: &str) -> bool {
    name.split('/').next() == Some(GIT_DIR_NAME)
}

/// Writes the leaves of `tree` below `dir`.
fn materialize(store: &LooseObjectStore, oid: &Oid, tree: &Tree, dir: &Path) -> Result<()> {
    for leaf in tree.leaves() {
        let corrupt = |reason: String| Error::CorruptObject {
            oid: oid.to_hex(),
            reason,
        };

        let mut components = Path::new(&leaf.name).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(corrupt(format!("unsafe leaf name {:?}", leaf.name)));
        }

        let dest = dir.join(&leaf.name);
        match leaf.mode.object_kind() {
            Some(ObjectKind::Tree) => {
                fs::create_dir(&dest)?;
                let subtree = store.read(&leaf.oid)?.into_tree()?;
                materialize(store, &leaf.oid, &subtree, &dest)?;
            }
            Some(ObjectKind::Blob) => {
                let blob = store.read(&leaf.oid)?.into_blob()?;
                fs::write(&dest, blob.content())?;
            }
            Some(ObjectKind::Commit) => fs::create_dir(&dest)?,
            _ => return Err(corrupt(format!("unexpected mode {}", leaf.mode))),
        }
    }
    Ok(())
}
