//! Key-value list with message: the text format shared by commits and tags.
//!
//! ```text
//! tree 29ff16c9c14e2652b22f8b78bb08a5a07930c147
//! parent 206941306e8a8af65b66eaaaea388a7ae24d49a0
//! author Jane <jane@example.com> 1527025023 +0200
//! gpgsig -----BEGIN PGP SIGNATURE-----
//!  continuation lines start with one space
//!
//! Message body
//! ```

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// An ordered header map plus a free-text message.
///
/// Keys keep their first-seen order. A key seen more than once (e.g.
/// `parent` on a merge commit) collects every value in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Kvlm {
    headers: IndexMap<Vec<u8>, Vec<Vec<u8>>>,
    message: Vec<u8>,
}

impl Kvlm {
    /// Creates an empty map with an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses header lines up to the first blank line; the rest is the message.
    ///
    /// A payload that ends without a blank line has an empty message.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut kvlm = Kvlm::new();
        let mut pos = 0;

        while pos < raw.len() {
            let space = find(raw, b' ', pos);
            let newline = find(raw, b'\n', pos);

            // A newline before any space can only be the blank separator line.
            let header_line = match (space, newline) {
                (Some(s), Some(n)) => s < n,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if !header_line {
                if newline != Some(pos) {
                    return Err(corrupt(format!("header line without a value at byte {}", pos)));
                }
                kvlm.message = raw[pos + 1..].to_vec();
                return Ok(kvlm);
            }
            let space = space.unwrap_or(pos);

            // The value runs until a newline not followed by a continuation space.
            let mut end = space;
            let end = loop {
                match find(raw, b'\n', end + 1) {
                    Some(n) if raw.get(n + 1) == Some(&b' ') => end = n,
                    Some(n) => break n,
                    None => break raw.len(),
                }
            };

            let key = raw[pos..space].to_vec();
            let value = unfold(&raw[space + 1..end]);
            kvlm.push(key, value);

            pos = end + 1;
        }

        Ok(kvlm)
    }

    /// Serializes headers in order, then a blank line, then the message.
    ///
    /// Embedded newlines in values are folded into continuation lines.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();

        for (key, values) in &self.headers {
            for value in values {
                out.extend_from_slice(key);
                out.push(b' ');
                for &b in value {
                    out.push(b);
                    if b == b'\n' {
                        out.push(b' ');
                    }
                }
                out.push(b'\n');
            }
        }

        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }

    /// Appends a value to `key`, creating the key at the end if new.
    pub fn push(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.headers.entry(key.into()).or_default().push(value.into());
    }

    /// Replaces every value of `key` with a single value.
    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.headers.insert(key.into(), vec![value.into()]);
    }

    /// First value of `key`.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.headers
            .get(key)
            .and_then(|values| values.first())
            .map(Vec::as_slice)
    }

    /// Every value of `key`, in order.
    pub fn get_all(&self, key: &[u8]) -> &[Vec<u8>] {
        self.headers.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value of `key` as UTF-8 text.
    pub fn get_str(&self, key: &[u8]) -> Option<&str> {
        self.get(key).and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Header keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.headers.keys().map(Vec::as_slice)
    }

    /// The message body.
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// Replaces the message body.
    pub fn set_message(&mut self, message: impl Into<Vec<u8>>) {
        self.message = message.into();
    }
}

fn find(raw: &[u8], byte: u8, from: usize) -> Option<usize> {
    raw.get(from..)?
        .iter()
        .position(|&b| b == byte)
        .map(|i| i + from)
}

/// Drops the single leading space of each continuation line.
fn unfold(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    let mut bytes = value.iter().copied().peekable();
    while let Some(b) = bytes.next() {
        out.push(b);
        if b == b'\n' && bytes.peek() == Some(&b' ') {
            bytes.next();
        }
    }
    out
}

fn corrupt(reason: String) -> Error {
    Error::CorruptObject {
        oid: String::new(),
        reason,
    }
}
