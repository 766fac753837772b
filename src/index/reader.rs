//! Index file parser.

use std::io::{Cursor, Read};

use crate::error::{Error, Result};
use crate::objects::{Oid, OID_BYTES};

use super::{Index, IndexEntry, ModeType, INDEX_VERSION};

/// The magic signature at the start of an index file: "DIRC"
pub(super) const INDEX_SIGNATURE: &[u8; 4] = b"DIRC";

/// Size of the fixed part of an entry, before the name.
pub(super) const ENTRY_FIXED_SIZE: usize = 62;

/// Name length sub-field value meaning "scan for the NUL".
pub(super) const NAME_LEN_MAX: usize = 0xFFF;

const FLAG_ASSUME_VALID: u16 = 0x8000;
const FLAG_EXTENDED: u16 = 0x4000;

/// Parses a version 2 index from raw bytes.
///
/// Bytes after the last declared entry (extensions, the trailing checksum)
/// are ignored.
///
/// # Errors
///
/// - `Error::MalformedIndex` for a bad signature or truncated header
/// - `Error::UnsupportedIndexVersion` for any version other than 2
/// - `Error::UnsupportedExtendedFlags` if an entry sets the extended bit
/// - `Error::MalformedIndexEntry` for truncation, reserved bits, bad names
///   or bad padding
pub fn parse(data: &[u8]) -> Result<Index> {
    let mut cursor = Cursor::new(data);

    let entry_count = parse_header(&mut cursor)?;

    // Each entry needs at least 64 bytes; don't trust the count for allocation.
    let mut entries = Vec::with_capacity((entry_count as usize).min(data.len() / 64));
    for position in 0..entry_count as usize {
        entries.push(parse_entry(&mut cursor, position)?);
    }

    Ok(Index::from_entries(entries))
}

/// Reads signature, version and entry count.
fn parse_header(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    let mut sig = [0u8; 4];
    cursor
        .read_exact(&mut sig)
        .map_err(|_| Error::MalformedIndex("failed to read signature".to_string()))?;

    if &sig != INDEX_SIGNATURE {
        return Err(Error::MalformedIndex(format!(
            "invalid signature: expected DIRC, got {:?}",
            String::from_utf8_lossy(&sig)
        )));
    }

    let version = read_u32_be(cursor)
        .map_err(|_| Error::MalformedIndex("failed to read version".to_string()))?;
    if version != INDEX_VERSION {
        return Err(Error::UnsupportedIndexVersion(version));
    }

    read_u32_be(cursor).map_err(|_| Error::MalformedIndex("failed to read entry count".to_string()))
}

fn parse_entry(cursor: &mut Cursor<&[u8]>, position: usize) -> Result<IndexEntry> {
    let entry_start = cursor.position() as usize;
    let truncated = |field: &str| entry_error(position, format!("truncated at {}", field));

    let ctime_sec = read_u32_be(cursor).map_err(|_| truncated("ctime"))?;
    let ctime_nsec = read_u32_be(cursor).map_err(|_| truncated("ctime"))?;
    let mtime_sec = read_u32_be(cursor).map_err(|_| truncated("mtime"))?;
    let mtime_nsec = read_u32_be(cursor).map_err(|_| truncated("mtime"))?;
    let dev = read_u32_be(cursor).map_err(|_| truncated("dev"))?;
    let ino = read_u32_be(cursor).map_err(|_| truncated("ino"))?;

    let reserved = read_u16_be(cursor).map_err(|_| truncated("mode"))?;
    if reserved != 0 {
        return Err(entry_error(position, "reserved mode bits are not zero".to_string()));
    }

    let mode = read_u16_be(cursor).map_err(|_| truncated("mode"))?;
    let mode_type = ModeType::from_bits(mode >> 12)
        .ok_or_else(|| entry_error(position, format!("invalid mode type {:#06b}", mode >> 12)))?;
    let mode_perms = mode & 0x0FFF;

    let uid = read_u32_be(cursor).map_err(|_| truncated("uid"))?;
    let gid = read_u32_be(cursor).map_err(|_| truncated("gid"))?;
    let size = read_u32_be(cursor).map_err(|_| truncated("size"))?;

    let mut oid_bytes = [0u8; OID_BYTES];
    cursor
        .read_exact(&mut oid_bytes)
        .map_err(|_| truncated("oid"))?;

    let flags = read_u16_be(cursor).map_err(|_| truncated("flags"))?;
    if flags & FLAG_EXTENDED != 0 {
        return Err(Error::UnsupportedExtendedFlags(position));
    }
    let assume_valid = flags & FLAG_ASSUME_VALID != 0;
    let stage = ((flags >> 12) & 0x03) as u8;
    let name_len = (flags & 0x0FFF) as usize;

    // The name ends at the first NUL; a short length must agree with it.
    let data = *cursor.get_ref();
    let name_start = cursor.position() as usize;
    let nul = data
        .get(name_start..)
        .and_then(|rest| rest.iter().position(|&b| b == 0))
        .ok_or_else(|| entry_error(position, "name is not NUL-terminated".to_string()))?;
    if name_len < NAME_LEN_MAX && nul != name_len {
        return Err(entry_error(
            position,
            format!("name length {} does not match terminator at {}", name_len, nul),
        ));
    }
    if name_len == NAME_LEN_MAX && nul < NAME_LEN_MAX {
        return Err(entry_error(position, "long name is shorter than 4095 bytes".to_string()));
    }

    let name = std::str::from_utf8(&data[name_start..name_start + nul])
        .map_err(|_| entry_error(position, "name is not UTF-8".to_string()))?
        .to_string();

    // Pad with 1 to 8 NULs so the entry length is a multiple of 8.
    let entry_end = entry_start + padded_entry_len(nul);
    let padding = data
        .get(name_start + nul..entry_end)
        .ok_or_else(|| truncated("padding"))?;
    if padding.iter().any(|&b| b != 0) {
        return Err(entry_error(position, "padding is not zero".to_string()));
    }
    cursor.set_position(entry_end as u64);

    Ok(IndexEntry {
        ctime: (ctime_sec, ctime_nsec),
        mtime: (mtime_sec, mtime_nsec),
        dev,
        ino,
        mode_type,
        mode_perms,
        uid,
        gid,
        size,
        oid: Oid::from_bytes(oid_bytes),
        assume_valid,
        stage,
        name,
    })
}

/// Length of an entry whose name is `name_len` bytes, including padding.
pub(super) fn padded_entry_len(name_len: usize) -> usize {
    (ENTRY_FIXED_SIZE + name_len + 8) & !7
}

fn read_u32_be(cursor: &mut Cursor<&[u8]>) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    cursor.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u16_be(cursor: &mut Cursor<&[u8]>) -> std::io::Result<u16> {
    let mut buf = [0u8; 2];
    cursor.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

fn entry_error(position: usize, reason: String) -> Error {
    Error::MalformedIndexEntry { position, reason }
}
