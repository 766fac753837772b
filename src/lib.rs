//! # looseleaf
//!
//! A Git-compatible repository engine in pure Rust: loose object storage,
//! the version 2 staging index, references, ignore rules and working tree
//! status.
//!
//! ## Features
//!
//! - Blob, tree, commit and tag objects, stored zlib-deflated and
//!   addressed by SHA-1
//! - Index reading and writing, and tree building from the index
//! - Symbolic and short-id name resolution
//! - `.gitignore`, `info/exclude` and global ignore rules
//! - Staged and unstaged status
//!
//! Packfiles, network transport and merging are not supported.
//!
//! ## Quick Start
//!
//! ```no_run
//! use looseleaf::{Repository, Result};
//!
//! fn main() -> Result<()> {
//!     let repo = Repository::init("my-project")?;
//!     std::fs::write("my-project/a.txt", "hi")?;
//!
//!     repo.add(&["a.txt"])?;
//!     let oid = repo.commit("first", Some("Jane Doe <jane@example.com>"))?;
//!     println!("committed {}", oid.short());
//!
//!     let status = repo.status()?;
//!     println!("untracked: {:?}", status.unstaged.untracked);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`error`] - Error types and Result alias
//! - [`repository`] - The `Repository` handle and its operations
//! - [`objects`] - Object model and the loose object store
//! - [`index`] - Staging index format and tree building
//! - [`refs`] - References and HEAD
//! - [`ignore`] - Ignore rules
//! - [`status`] - HEAD/index/worktree comparison
//! - [`config`] - Git configuration files

pub mod config;
pub mod error;
pub mod ignore;
pub mod index;
pub mod objects;
pub mod refs;
pub mod repository;
pub mod status;

pub(crate) mod infra;

pub use config::Config;
pub use error::{Error, Result};
pub use repository::{LogEntry, Repository, TreeEntry};

pub use objects::{
    Blob, Commit, FileMode, Object, ObjectKind, Oid, Signature, Tag, Tree, TreeLeaf,
};

pub use refs::{Head, RefNode, RefTree};

pub use ignore::IgnoreRules;
pub use status::{StagedChanges, Status, WorktreeChanges};

pub use index::{Index, IndexEntry, ModeType};
pub use infra::FileStat;
