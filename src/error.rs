//! Error types for looseleaf.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for looseleaf operations.
///
/// No variant is recovered from internally: every failure propagates to the
/// caller, which aborts the current command.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No `.git` directory was found at or above the given path.
    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// The repository configuration file is missing or unreadable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// `core.repositoryformatversion` is not `0`.
    #[error("unsupported repositoryformatversion: {0}")]
    UnsupportedRepositoryFormat(i64),

    /// An object failed validation after decompression.
    #[error("corrupt object {oid}: {reason}")]
    CorruptObject {
        /// The object ID (may be empty while decoding a detached payload).
        oid: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The object header names a kind other than blob/tree/commit/tag.
    #[error("unknown type {kind} for object {oid}")]
    UnknownObjectKind {
        /// The object ID.
        oid: String,
        /// The kind found in the header.
        kind: String,
    },

    /// The requested object was not found.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// The provided string is not a valid object ID.
    #[error("invalid object id: {0}")]
    InvalidOid(String),

    /// Type mismatch when expecting a specific object kind.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected kind.
        expected: &'static str,
        /// The actual kind.
        actual: &'static str,
    },

    /// The index header is malformed (bad signature or truncated).
    #[error("malformed index: {0}")]
    MalformedIndex(String),

    /// The index declares a version other than 2.
    #[error("unsupported index version {0} (only version 2 is supported)")]
    UnsupportedIndexVersion(u32),

    /// An index entry has the extended-flags bit set.
    #[error("index entry {0} uses extended flags, which are not supported")]
    UnsupportedExtendedFlags(usize),

    /// An index entry is malformed.
    #[error("malformed index entry {position}: {reason}")]
    MalformedIndexEntry {
        /// Zero-based entry number.
        position: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A name resolved to no object.
    #[error("no such reference {0}")]
    NoSuchReference(String),

    /// A name resolved to more than one object.
    #[error("ambiguous reference {name}: candidates are:\n - {}", .candidates.join("\n - "))]
    AmbiguousReference {
        /// The name that was looked up.
        name: String,
        /// Every matching object ID.
        candidates: Vec<String>,
    },

    /// Following symbolic references revisited a name.
    #[error("reference cycle while resolving {0}")]
    ReferenceCycle(String),

    /// A path points outside the working tree.
    #[error("path outside worktree: {}", .0.display())]
    PathOutsideWorktree(PathBuf),

    /// An ignore check was given an absolute path.
    #[error("path must be relative to the repository root: {}", .0.display())]
    AbsolutePathNotAllowed(PathBuf),

    /// The target directory must be empty.
    #[error("not empty: {}", .0.display())]
    DirectoryNotEmpty(PathBuf),

    /// The path exists but is not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The specified path was not found.
    #[error("path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    /// The specified path has no index entry.
    #[error("path not in the index: {0}")]
    PathNotInIndex(String),

    /// There are no staged entries, or the staged tree equals HEAD's tree.
    #[error("nothing to commit, working tree clean")]
    NothingToCommit,

    /// No author identity was supplied or configured.
    #[error("no user configured: set user.name and user.email")]
    MissingIdentity,

    /// Invalid UTF-8 sequence encountered.
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,

    /// Zlib decompression failed.
    #[error("zlib decompression failed")]
    DecompressionFailed,
}

/// Result type alias for looseleaf operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
        assert!(error.to_string().contains("I/O error"));
        assert!(StdError::source(&error).is_some());
    }

    #[test]
    fn test_error_display() {
        let error = Error::NotARepository(PathBuf::from("/tmp/not-a-repo"));
        assert_eq!(error.to_string(), "not a git repository: /tmp/not-a-repo");

        let error = Error::UnsupportedIndexVersion(3);
        assert_eq!(
            error.to_string(),
            "unsupported index version 3 (only version 2 is supported)"
        );

        let error = Error::NothingToCommit;
        assert_eq!(error.to_string(), "nothing to commit, working tree clean");
    }

    #[test]
    fn test_ambiguous_reference_lists_candidates() {
        let error = Error::AmbiguousReference {
            name: "abcd".to_string(),
            candidates: vec!["abcd01".to_string(), "abcd02".to_string()],
        };
        let message = error.to_string();
        assert!(message.starts_with("ambiguous reference abcd"));
        assert!(message.contains(" - abcd01"));
        assert!(message.contains(" - abcd02"));
    }

    #[test]
    fn test_non_io_errors_have_no_source() {
        let error = Error::ReferenceCycle("HEAD".to_string());
        assert!(StdError::source(&error).is_none());
    }
}
