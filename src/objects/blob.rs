//! Blob objects: opaque file content.

use crate::error::{Error, Result};

/// File content with no further structure.
///
/// Names and modes live in the tree that points at the blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    content: Vec<u8>,
}

impl Blob {
    /// Wraps raw bytes.
    pub fn new(content: Vec<u8>) -> Self {
        Blob { content }
    }

    /// Returns the raw content.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Consumes the blob and returns its bytes.
    pub fn into_content(self) -> Vec<u8> {
        self.content
    }

    /// Returns the content as UTF-8 text.
    pub fn content_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.content).map_err(|_| Error::InvalidUtf8)
    }

    /// Size of the content in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // B-001: content accessors
    #[test]
    fn test_content() {
        let blob = Blob::new(b"Hello, World!".to_vec());
        assert_eq!(blob.content(), b"Hello, World!");
        assert_eq!(blob.size(), 13);
        assert_eq!(blob.content_str().unwrap(), "Hello, World!");
        assert_eq!(blob.into_content(), b"Hello, World!".to_vec());
    }

    // B-002: binary content is kept verbatim but is not text
    #[test]
    fn test_binary_content() {
        let blob = Blob::new(vec![0xff, 0x00, 0xfe]);
        assert_eq!(blob.size(), 3);
        assert!(matches!(blob.content_str(), Err(Error::InvalidUtf8)));
    }
}
