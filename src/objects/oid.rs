//! Object ids: the SHA-1 content hash that names every stored object.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::infra::hash_object;

use super::ObjectKind;

/// The length of an object id in bytes.
pub const OID_BYTES: usize = 20;

/// The length of an object id as a hexadecimal string.
pub const OID_HEX_LEN: usize = 40;

/// Shortest hex prefix accepted when looking objects up by abbreviation.
pub const MIN_PREFIX_LEN: usize = 4;

/// A content-derived object id.
///
/// Ids are computed once from an object's framed bytes and never change.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid {
    bytes: [u8; OID_BYTES],
}

impl Oid {
    /// Hashes a payload of the given kind.
    ///
    /// ```
    /// use looseleaf::objects::{ObjectKind, Oid};
    ///
    /// let oid = Oid::for_object(ObjectKind::Blob, b"");
    /// assert_eq!(oid.to_hex(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    /// ```
    pub fn for_object(kind: ObjectKind, payload: &[u8]) -> Self {
        Oid {
            bytes: hash_object(kind.as_str(), payload),
        }
    }

    /// Parses a full 40-digit hex id (case-insensitive).
    pub fn from_hex(hex: &str) -> Result<Self> {
        if hex.len() != OID_HEX_LEN {
            return Err(Error::InvalidOid(hex.to_string()));
        }

        let mut bytes = [0u8; OID_BYTES];
        for (slot, pair) in bytes.iter_mut().zip(hex.as_bytes().chunks(2)) {
            let high = hex_value(pair[0]).ok_or_else(|| Error::InvalidOid(hex.to_string()))?;
            let low = hex_value(pair[1]).ok_or_else(|| Error::InvalidOid(hex.to_string()))?;
            *slot = (high << 4) | low;
        }

        Ok(Oid { bytes })
    }

    /// Wraps a raw 20-byte digest.
    pub fn from_bytes(bytes: [u8; OID_BYTES]) -> Self {
        Oid { bytes }
    }

    /// Reads a raw digest from the start of `data`.
    ///
    /// Returns `None` if fewer than 20 bytes are available.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        let bytes: [u8; OID_BYTES] = data.get(..OID_BYTES)?.try_into().ok()?;
        Some(Oid { bytes })
    }

    /// Lowercase 40-digit hex form.
    pub fn to_hex(&self) -> String {
        self.bytes
            .iter()
            .flat_map(|b| [HEX_CHARS[(b >> 4) as usize], HEX_CHARS[(b & 0x0f) as usize]])
            .map(char::from)
            .collect()
    }

    /// The first seven hex digits.
    pub fn short(&self) -> String {
        self.to_hex()[..7].to_string()
    }

    /// The raw digest.
    pub fn as_bytes(&self) -> &[u8; OID_BYTES] {
        &self.bytes
    }
}

/// True if `name` looks like a full or abbreviated hex object id.
pub fn is_hex_prefix(name: &str) -> bool {
    (MIN_PREFIX_LEN..=OID_HEX_LEN).contains(&name.len())
        && name.bytes().all(|b| b.is_ascii_hexdigit())
}

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self.short())
    }
}

impl FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Oid::from_hex(s.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA1: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";

    #[test]
    fn test_hex_round_trip_normalizes_case() {
        let oid = Oid::from_hex(&EMPTY_SHA1.to_uppercase()).unwrap();
        assert_eq!(oid.to_hex(), EMPTY_SHA1);
        assert_eq!(oid.to_string(), EMPTY_SHA1);
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(matches!(Oid::from_hex(""), Err(Error::InvalidOid(_))));
        assert!(matches!(
            Oid::from_hex(&EMPTY_SHA1[..39]),
            Err(Error::InvalidOid(_))
        ));
        assert!(matches!(
            Oid::from_hex("ga39a3ee5e6b4b0d3255bfef95601890afd80709"),
            Err(Error::InvalidOid(_))
        ));
    }

    #[test]
    fn test_from_slice() {
        let oid = Oid::from_hex(EMPTY_SHA1).unwrap();
        let mut data = oid.as_bytes().to_vec();
        data.extend_from_slice(b"trailing");

        assert_eq!(Oid::from_slice(&data), Some(oid));
        assert_eq!(Oid::from_slice(&data[..19]), None);
    }

    #[test]
    fn test_for_object_hashes_framed_record() {
        let oid = Oid::for_object(ObjectKind::Blob, b"hello\n");
        assert_eq!(oid.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");
    }

    #[test]
    fn test_short_and_debug() {
        let oid = Oid::from_hex(EMPTY_SHA1).unwrap();
        assert_eq!(oid.short(), "da39a3e");
        assert_eq!(format!("{:?}", oid), "Oid(da39a3e)");
    }

    #[test]
    fn test_from_str_trims_newline() {
        let oid: Oid = format!("{}\n", EMPTY_SHA1).parse().unwrap();
        assert_eq!(oid.to_hex(), EMPTY_SHA1);
    }

    #[test]
    fn test_is_hex_prefix() {
        assert!(is_hex_prefix("abcd"));
        assert!(is_hex_prefix(EMPTY_SHA1));
        assert!(is_hex_prefix("ABCDEF"));
        assert!(!is_hex_prefix("abc"));
        assert!(!is_hex_prefix("master"));
        assert!(!is_hex_prefix(&format!("{}0", EMPTY_SHA1)));
    }
}
