//! Loose object store: one zlib-deflated file per object.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::oid::{is_hex_prefix, Oid};
use super::{Object, ObjectKind};
use crate::error::{Error, Result};
use crate::infra::{compress, decompress, frame_header, read_file, write_file_atomic};

/// An object's kind and payload, before kind-specific decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    /// The kind from the header.
    pub kind: ObjectKind,
    /// The payload (without the header).
    pub payload: Vec<u8>,
}

/// A store of loose objects under `.git/objects`.
///
/// The file for an object lives at `<first 2 hex digits>/<remaining 38>`.
/// Files are written once and never modified.
#[derive(Debug)]
pub struct LooseObjectStore {
    /// Path to the objects directory (e.g., `.git/objects`).
    objects_dir: PathBuf,
}

impl LooseObjectStore {
    /// Creates a store rooted at the given objects directory.
    pub fn new<P: AsRef<Path>>(objects_dir: P) -> Self {
        LooseObjectStore {
            objects_dir: objects_dir.as_ref().to_path_buf(),
        }
    }

    /// Converts an Oid to the path of its loose object file.
    ///
    /// For example, `da39a3ee5e6b4b0d3255bfef95601890afd80709` becomes
    /// `objects/da/39a3ee5e6b4b0d3255bfef95601890afd80709`.
    pub fn oid_to_path(&self, oid: &Oid) -> PathBuf {
        let hex = oid.to_hex();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }

    /// Splits a decompressed record into kind and payload.
    ///
    /// Records have the format `<kind> <size>\0<payload>`; the declared size
    /// must equal the actual payload length.
    fn parse_frame(data: &[u8], oid: &Oid) -> Result<RawObject> {
        let corrupt = |reason: String| Error::CorruptObject {
            oid: oid.to_hex(),
            reason,
        };

        let nul = data
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| corrupt("missing NUL after header".to_string()))?;
        let header = std::str::from_utf8(&data[..nul])
            .map_err(|_| corrupt("header is not UTF-8".to_string()))?;

        let (kind_name, size) = header
            .split_once(' ')
            .ok_or_else(|| corrupt(format!("malformed header: {}", header)))?;
        let kind = ObjectKind::parse(kind_name).ok_or_else(|| Error::UnknownObjectKind {
            oid: oid.to_hex(),
            kind: kind_name.to_string(),
        })?;
        let size: usize = size
            .parse()
            .map_err(|_| corrupt(format!("invalid size: {}", size)))?;

        let payload = &data[nul + 1..];
        if payload.len() != size {
            return Err(corrupt(format!(
                "malformed object: bad length (header says {}, payload is {} bytes)",
                size,
                payload.len()
            )));
        }

        Ok(RawObject {
            kind,
            payload: payload.to_vec(),
        })
    }

    /// Reads an object's kind and payload without decoding it.
    pub fn read_raw(&self, oid: &Oid) -> Result<RawObject> {
        let path = self.oid_to_path(oid);
        let compressed = read_file(&path).map_err(|e| match e {
            Error::PathNotFound(_) => Error::ObjectNotFound(oid.to_hex()),
            other => other,
        })?;
        let data = decompress(&compressed)?;
        Self::parse_frame(&data, oid)
    }

    /// Reads and decodes an object.
    ///
    /// # Errors
    ///
    /// - `Error::ObjectNotFound` if no file exists for `oid`
    /// - `Error::CorruptObject` if the length check or decoding fails
    /// - `Error::UnknownObjectKind` if the header names another kind
    pub fn read(&self, oid: &Oid) -> Result<Object> {
        let raw = self.read_raw(oid)?;
        Object::decode(raw.kind, &raw.payload).map_err(|e| match e {
            Error::CorruptObject { reason, .. } => Error::CorruptObject {
                oid: oid.to_hex(),
                reason,
            },
            other => other,
        })
    }

    /// Checks if an object exists in the store.
    pub fn exists(&self, oid: &Oid) -> bool {
        self.oid_to_path(oid).exists()
    }

    /// Finds every stored object whose hex id starts with `prefix`.
    ///
    /// The prefix must be 4 to 40 hex digits; case is ignored.
    pub fn find_by_prefix(&self, prefix: &str) -> Result<Vec<Oid>> {
        if !is_hex_prefix(prefix) {
            return Err(Error::InvalidOid(prefix.to_string()));
        }

        let prefix = prefix.to_ascii_lowercase();
        let (dir_prefix, file_prefix) = prefix.split_at(2);

        let subdir = self.objects_dir.join(dir_prefix);
        if !subdir.is_dir() {
            return Ok(Vec::new());
        }

        let mut matches = Vec::new();
        for entry in fs::read_dir(&subdir)? {
            let file_name = entry?.file_name();
            let name = file_name.to_string_lossy();
            if !name.starts_with(file_prefix) {
                continue;
            }
            if let Ok(oid) = Oid::from_hex(&format!("{}{}", dir_prefix, name)) {
                matches.push(oid);
            }
        }

        matches.sort();
        Ok(matches)
    }

    /// Stores a payload of the given kind and returns its id.
    ///
    /// If the object already exists nothing is written.
    pub fn write_raw(&self, kind: ObjectKind, payload: &[u8]) -> Result<Oid> {
        let oid = Oid::for_object(kind, payload);

        let path = self.oid_to_path(&oid);
        if path.exists() {
            debug!(oid = %oid, kind = %kind, "object already stored");
            return Ok(oid);
        }

        let mut record = frame_header(kind.as_str(), payload.len());
        record.extend_from_slice(payload);
        write_file_atomic(&path, &compress(&record))?;

        debug!(oid = %oid, kind = %kind, size = payload.len(), "wrote object");
        Ok(oid)
    }

    /// Encodes and stores an object.
    pub fn write(&self, object: &Object) -> Result<Oid> {
        self.write_raw(object.kind(), &object.encode())
    }
}
