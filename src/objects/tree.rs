//! Tree objects: sorted directory listings.
//!
//! Each record is `<mode> <name>\0<20-byte id>`, with no separator between
//! records.

use std::cmp::Ordering;
use std::fmt;

use super::oid::{Oid, OID_BYTES};
use super::ObjectKind;
use crate::error::{Error, Result};

/// A tree leaf mode: a 4-bit type code above 12 permission bits.
///
/// Displayed as six octal digits, e.g. `100644` or `040000`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileMode(u32);

impl FileMode {
    /// Subdirectory.
    pub const DIRECTORY: FileMode = FileMode(0o040000);
    /// Regular, non-executable file.
    pub const REGULAR: FileMode = FileMode(0o100644);
    /// Executable file.
    pub const EXECUTABLE: FileMode = FileMode(0o100755);
    /// Symbolic link.
    pub const SYMLINK: FileMode = FileMode(0o120000);
    /// Submodule commit.
    pub const GITLINK: FileMode = FileMode(0o160000);

    /// Combines a type code and permission bits, as stored in the index.
    pub fn from_parts(kind: u16, perms: u16) -> Self {
        FileMode((u32::from(kind) << 12) | u32::from(perms & 0o7777))
    }

    /// Parses five or six octal digits.
    pub fn parse(digits: &[u8]) -> Option<Self> {
        if !(5..=6).contains(&digits.len()) || !digits.iter().all(|b| (b'0'..=b'7').contains(b)) {
            return None;
        }
        let text = std::str::from_utf8(digits).ok()?;
        u32::from_str_radix(text, 8).ok().map(FileMode)
    }

    /// The 4-bit type code (`0o04` tree, `0o10` file, `0o12` symlink, `0o16` gitlink).
    pub fn kind_code(self) -> u16 {
        (self.0 >> 12) as u16
    }

    /// The 12 permission bits.
    pub fn perms(self) -> u16 {
        (self.0 & 0o7777) as u16
    }

    /// The kind of object a leaf with this mode points at.
    pub fn object_kind(self) -> Option<ObjectKind> {
        match self.kind_code() {
            0o04 => Some(ObjectKind::Tree),
            0o10 | 0o12 => Some(ObjectKind::Blob),
            0o16 => Some(ObjectKind::Commit),
            _ => None,
        }
    }

    /// True for subdirectory leaves.
    pub fn is_tree(self) -> bool {
        self.kind_code() == 0o04
    }

    /// The numeric mode.
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.0)
    }
}

impl fmt::Debug for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileMode({:06o})", self.0)
    }
}

/// One `(mode, name, id)` record of a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLeaf {
    /// Leaf mode.
    pub mode: FileMode,
    /// Single path segment.
    pub name: String,
    /// Id of the blob, subtree or commit.
    pub oid: Oid,
}

impl TreeLeaf {
    /// Creates a leaf.
    pub fn new(mode: FileMode, name: impl Into<String>, oid: Oid) -> Self {
        TreeLeaf {
            mode,
            name: name.into(),
            oid,
        }
    }

    /// Orders leaves as git does: a subtree compares as if its name ended in `/`.
    pub fn sort_cmp(&self, other: &TreeLeaf) -> Ordering {
        self.sort_key().cmp(other.sort_key())
    }

    fn sort_key(&self) -> impl Iterator<Item = u8> + '_ {
        let suffix = if self.mode.is_tree() { Some(b'/') } else { None };
        self.name.bytes().chain(suffix)
    }
}

/// A directory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    leaves: Vec<TreeLeaf>,
}

impl Tree {
    /// Creates a tree from leaves in any order.
    pub fn new(mut leaves: Vec<TreeLeaf>) -> Self {
        leaves.sort_by(TreeLeaf::sort_cmp);
        Tree { leaves }
    }

    /// Parses records until the payload is exhausted.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut leaves = Vec::new();
        let mut pos = 0;

        while pos < payload.len() {
            let rest = &payload[pos..];

            let space = rest
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| corrupt("missing space in tree record"))?;
            let mode = FileMode::parse(&rest[..space])
                .ok_or_else(|| corrupt("invalid mode in tree record"))?;

            let rest = &rest[space + 1..];
            let nul = rest
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| corrupt("missing NUL in tree record"))?;
            let name = std::str::from_utf8(&rest[..nul])
                .map_err(|_| corrupt("leaf name is not UTF-8"))?
                .to_string();

            let oid = Oid::from_slice(&rest[nul + 1..])
                .ok_or_else(|| corrupt("truncated id in tree record"))?;

            leaves.push(TreeLeaf { mode, name, oid });
            pos += space + 1 + nul + 1 + OID_BYTES;
        }

        Ok(Tree { leaves })
    }

    /// Serializes leaves in sorted order.
    ///
    /// The output does not depend on the order leaves were added in.
    pub fn serialize(&self) -> Vec<u8> {
        let mut sorted: Vec<&TreeLeaf> = self.leaves.iter().collect();
        sorted.sort_by(|a, b| a.sort_cmp(b));

        let mut out = Vec::new();
        for leaf in sorted {
            out.extend_from_slice(leaf.mode.to_string().as_bytes());
            out.push(b' ');
            out.extend_from_slice(leaf.name.as_bytes());
            out.push(0);
            out.extend_from_slice(leaf.oid.as_bytes());
        }
        out
    }

    /// Leaves in stored order.
    pub fn leaves(&self) -> &[TreeLeaf] {
        &self.leaves
    }

    /// Finds a leaf by name.
    pub fn get(&self, name: &str) -> Option<&TreeLeaf> {
        self.leaves.iter().find(|leaf| leaf.name == name)
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}

fn corrupt(reason: &str) -> Error {
    Error::CorruptObject {
        oid: String::new(),
        reason: reason.to_string(),
    }
}
