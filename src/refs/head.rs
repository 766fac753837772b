//! HEAD reference representation.

use crate::objects::Oid;

/// Where `HEAD` points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// HEAD names a branch (`ref: refs/heads/<name>`).
    Branch {
        /// The branch name (without `refs/heads/` prefix).
        name: String,
        /// The branch tip, or `None` before the first commit.
        oid: Option<Oid>,
    },
    /// HEAD holds an id directly.
    Detached {
        /// The id HEAD points to.
        oid: Oid,
    },
    /// HEAD names a reference outside `refs/heads/` that does not exist yet.
    Unborn {
        /// The full name of the target reference.
        reference: String,
    },
}

impl Head {
    /// Creates a new Head pointing to a branch.
    pub fn branch(name: impl Into<String>, oid: Option<Oid>) -> Self {
        Head::Branch {
            name: name.into(),
            oid,
        }
    }

    /// Creates a new detached Head.
    pub fn detached(oid: Oid) -> Self {
        Head::Detached { oid }
    }

    /// Creates a Head waiting on a reference that has no id yet.
    pub fn unborn(reference: impl Into<String>) -> Self {
        Head::Unborn {
            reference: reference.into(),
        }
    }

    /// The id HEAD resolves to, if any.
    pub fn oid(&self) -> Option<&Oid> {
        match self {
            Head::Branch { oid, .. } => oid.as_ref(),
            Head::Detached { oid } => Some(oid),
            Head::Unborn { .. } => None,
        }
    }

    /// Returns the branch name if HEAD points to a branch.
    pub fn branch_name(&self) -> Option<&str> {
        match self {
            Head::Branch { name, .. } => Some(name),
            Head::Detached { .. } | Head::Unborn { .. } => None,
        }
    }

    /// Returns `true` if HEAD is in detached state.
    pub fn is_detached(&self) -> bool {
        matches!(self, Head::Detached { .. })
    }

    /// The reference a new commit should update: the branch ref, the
    /// unborn target, or `HEAD`.
    pub fn ref_name(&self) -> String {
        match self {
            Head::Branch { name, .. } => format!("refs/heads/{}", name),
            Head::Detached { .. } => "HEAD".to_string(),
            Head::Unborn { reference } => reference.clone(),
        }
    }
}
