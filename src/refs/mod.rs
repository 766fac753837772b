//! References: `HEAD`, branches, tags and remotes.

pub mod head;
pub mod resolver;

pub use head::Head;
pub use resolver::{RefNode, RefStore, RefTree, RefValue};
