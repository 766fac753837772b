//! Object model: blobs, trees, commits and tags, plus the loose object store.

pub mod blob;
pub mod commit;
pub mod kvlm;
pub mod oid;
pub mod store;
pub mod tag;
pub mod tree;

use std::fmt;

pub use blob::Blob;
pub use commit::{Commit, Signature};
pub use kvlm::Kvlm;
pub use oid::{is_hex_prefix, Oid, MIN_PREFIX_LEN, OID_BYTES, OID_HEX_LEN};
pub use store::LooseObjectStore;
pub use tag::Tag;
pub use tree::{FileMode, Tree, TreeLeaf};

use crate::error::{Error, Result};

/// The kind tag carried in every object header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// File content.
    Blob,
    /// Directory listing.
    Tree,
    /// Snapshot with history.
    Commit,
    /// Annotated tag.
    Tag,
}

impl ObjectKind {
    /// Returns the kind name as used in object headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
            ObjectKind::Tag => "tag",
        }
    }

    /// Parses a kind name from an object header.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blob" => Some(ObjectKind::Blob),
            "tree" => Some(ObjectKind::Tree),
            "commit" => Some(ObjectKind::Commit),
            "tag" => Some(ObjectKind::Tag),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any stored object.
///
/// Encoding and decoding dispatch on the variant; there is no other kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    /// A blob.
    Blob(Blob),
    /// A tree.
    Tree(Tree),
    /// A commit.
    Commit(Commit),
    /// An annotated tag.
    Tag(Tag),
}

impl Object {
    /// Returns the kind of this object.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Blob(_) => ObjectKind::Blob,
            Object::Tree(_) => ObjectKind::Tree,
            Object::Commit(_) => ObjectKind::Commit,
            Object::Tag(_) => ObjectKind::Tag,
        }
    }

    /// Serializes the payload (without the `"<kind> <len>\0"` frame).
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Object::Blob(blob) => blob.content().to_vec(),
            Object::Tree(tree) => tree.serialize(),
            Object::Commit(commit) => commit.serialize(),
            Object::Tag(tag) => tag.serialize(),
        }
    }

    /// Parses a payload of the given kind.
    pub fn decode(kind: ObjectKind, payload: &[u8]) -> Result<Self> {
        Ok(match kind {
            ObjectKind::Blob => Object::Blob(Blob::new(payload.to_vec())),
            ObjectKind::Tree => Object::Tree(Tree::parse(payload)?),
            ObjectKind::Commit => Object::Commit(Commit::parse(payload)?),
            ObjectKind::Tag => Object::Tag(Tag::parse(payload)?),
        })
    }

    /// Computes the content id of this object.
    pub fn id(&self) -> Oid {
        Oid::for_object(self.kind(), &self.encode())
    }

    /// Returns the inner tree, or `TypeMismatch`.
    pub fn into_tree(self) -> Result<Tree> {
        match self {
            Object::Tree(tree) => Ok(tree),
            other => Err(mismatch("tree", other.kind())),
        }
    }

    /// Returns the inner commit, or `TypeMismatch`.
    pub fn into_commit(self) -> Result<Commit> {
        match self {
            Object::Commit(commit) => Ok(commit),
            other => Err(mismatch("commit", other.kind())),
        }
    }

    /// Returns the inner blob, or `TypeMismatch`.
    pub fn into_blob(self) -> Result<Blob> {
        match self {
            Object::Blob(blob) => Ok(blob),
            other => Err(mismatch("blob", other.kind())),
        }
    }
}

fn mismatch(expected: &'static str, actual: ObjectKind) -> Error {
    Error::TypeMismatch {
        expected,
        actual: actual.as_str(),
    }
}

impl From<Blob> for Object {
    fn from(blob: Blob) -> Self {
        Object::Blob(blob)
    }
}

impl From<Tree> for Object {
    fn from(tree: Tree) -> Self {
        Object::Tree(tree)
    }
}

impl From<Commit> for Object {
    fn from(commit: Commit) -> Self {
        Object::Commit(commit)
    }
}

impl From<Tag> for Object {
    fn from(tag: Tag) -> Self {
        Object::Tag(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMIT_PAYLOAD: &[u8] = b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
author John Doe <john@example.com> 1234567890 +0000\n\
committer John Doe <john@example.com> 1234567890 +0000\n\
\n\
Test commit\n";

    // O-001: kind names round-trip through parse
    #[test]
    fn test_kind_names() {
        for kind in [
            ObjectKind::Blob,
            ObjectKind::Tree,
            ObjectKind::Commit,
            ObjectKind::Tag,
        ] {
            assert_eq!(ObjectKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ObjectKind::parse("blobs"), None);
        assert_eq!(ObjectKind::Commit.to_string(), "commit");
    }

    // O-002: decode dispatches on kind and encode reverses it
    #[test]
    fn test_decode_encode_each_kind() {
        let tag_payload = b"object 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
type tree\ntag v1\ntagger A <a@b> 0 +0000\n\nmsg\n";
        let cases: [(ObjectKind, &[u8]); 4] = [
            (ObjectKind::Blob, b"hello\n"),
            (ObjectKind::Tree, b""),
            (ObjectKind::Commit, COMMIT_PAYLOAD),
            (ObjectKind::Tag, tag_payload),
        ];

        for (kind, payload) in cases {
            let object = Object::decode(kind, payload).unwrap();
            assert_eq!(object.kind(), kind);
            assert_eq!(object.encode(), payload);
            assert_eq!(Object::decode(kind, &object.encode()).unwrap(), object);
        }
    }

    // O-003: id hashes the framed payload
    #[test]
    fn test_id_of_empty_tree() {
        let object = Object::decode(ObjectKind::Tree, b"").unwrap();
        assert_eq!(
            object.id().to_hex(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
        assert_eq!(object.id(), object.id());
    }

    // O-004: into_* reports the actual kind on mismatch
    #[test]
    fn test_into_mismatch() {
        let object = Object::from(Blob::new(b"x".to_vec()));
        let err = object.into_commit().unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: "commit",
                actual: "blob"
            }
        ));

        let commit = Object::decode(ObjectKind::Commit, COMMIT_PAYLOAD).unwrap();
        assert!(commit.into_commit().is_ok());
    }
}
