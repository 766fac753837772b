//! Index file writer.

use crate::infra::sha1;

use super::reader::{padded_entry_len, INDEX_SIGNATURE, NAME_LEN_MAX};
use super::{Index, IndexEntry, INDEX_VERSION};

/// Serializes the index in version 2 format.
///
/// Entries are written in their current order; call [`Index::sort`] first
/// if they may be out of order. A SHA-1 of everything before it is appended.
pub fn write(index: &Index) -> Vec<u8> {
    let mut buffer = Vec::new();

    buffer.extend_from_slice(INDEX_SIGNATURE);
    buffer.extend_from_slice(&INDEX_VERSION.to_be_bytes());
    buffer.extend_from_slice(&(index.len() as u32).to_be_bytes());

    for entry in index.entries() {
        write_entry(&mut buffer, entry);
    }

    let checksum = sha1(&buffer);
    buffer.extend_from_slice(&checksum);

    buffer
}

fn write_entry(buffer: &mut Vec<u8>, entry: &IndexEntry) {
    let entry_start = buffer.len();

    for value in [
        entry.ctime.0,
        entry.ctime.1,
        entry.mtime.0,
        entry.mtime.1,
        entry.dev,
        entry.ino,
    ] {
        buffer.extend_from_slice(&value.to_be_bytes());
    }

    let mode = (entry.mode_type.bits() << 12) | (entry.mode_perms & 0x0FFF);
    buffer.extend_from_slice(&0u16.to_be_bytes());
    buffer.extend_from_slice(&mode.to_be_bytes());

    for value in [entry.uid, entry.gid, entry.size] {
        buffer.extend_from_slice(&value.to_be_bytes());
    }
    buffer.extend_from_slice(entry.oid.as_bytes());

    // Names of 4095 bytes or more store 0xFFF and rely on the terminator.
    let name = entry.name.as_bytes();
    let mut flags = name.len().min(NAME_LEN_MAX) as u16;
    flags |= u16::from(entry.stage & 0x03) << 12;
    if entry.assume_valid {
        flags |= 0x8000;
    }
    buffer.extend_from_slice(&flags.to_be_bytes());

    buffer.extend_from_slice(name);
    buffer.resize(entry_start + padded_entry_len(name.len()), 0);
}
