//! SHA-1 digests for object ids and the index trailer.

use sha1::{Digest, Sha1};

/// SHA-1 digest size in bytes.
pub const SHA1_SIZE: usize = 20;

/// Computes the SHA-1 digest of `data`.
pub fn sha1(data: &[u8]) -> [u8; SHA1_SIZE] {
    Sha1::digest(data).into()
}

/// Computes the id of an object: SHA-1 over `"<kind> <len>\0<payload>"`.
///
/// The empty blob hashes to `e69de29bb2d1d6434b8b29ae775ad8c2e48c5391`.
pub fn hash_object(kind: &str, payload: &[u8]) -> [u8; SHA1_SIZE] {
    let mut hasher = Sha1::new();
    hasher.update(frame_header(kind, payload.len()));
    hasher.update(payload);
    hasher.finalize().into()
}

/// Builds the `"<kind> <len>\0"` prefix of a framed object record.
pub fn frame_header(kind: &str, len: usize) -> Vec<u8> {
    format!("{} {}\0", kind, len).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn test_sha1_vectors() {
        assert_eq!(to_hex(&sha1(b"")), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(to_hex(&sha1(b"abc")), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_hash_object_empty_blob() {
        assert_eq!(
            to_hex(&hash_object("blob", b"")),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
    }

    #[test]
    fn test_hash_object_matches_git() {
        // `echo hello | git hash-object --stdin`
        assert_eq!(
            to_hex(&hash_object("blob", b"hello\n")),
            "ce013625030ba8dba906f756967f9e9ca394464a"
        );
    }

    #[test]
    fn test_hash_object_equals_hash_of_frame() {
        let mut framed = frame_header("blob", 2);
        framed.extend_from_slice(b"hi");
        assert_eq!(hash_object("blob", b"hi"), sha1(&framed));
    }

    #[test]
    fn test_frame_header() {
        assert_eq!(frame_header("tree", 0), b"tree 0\0");
        assert_eq!(frame_header("commit", 187), b"commit 187\0");
    }
}
