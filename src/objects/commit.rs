//! Commit objects and author/committer signatures.

use std::fmt;

use chrono::{Local, Offset};

use super::kvlm::Kvlm;
use super::oid::Oid;
use crate::error::{Error, Result};

/// An author or committer line: `Name <email> <seconds> <+hhmm>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// `Name <email>`.
    identity: String,
    /// Unix timestamp (seconds since epoch).
    timestamp: i64,
    /// Timezone offset in minutes (e.g., +0900 = 540, -0500 = -300).
    tz_offset: i32,
}

impl Signature {
    /// Creates a signature from an identity string such as `Jane <jane@example.com>`.
    pub fn new(identity: impl Into<String>, timestamp: i64, tz_offset: i32) -> Self {
        Signature {
            identity: identity.into(),
            timestamp,
            tz_offset,
        }
    }

    /// Stamps `identity` with the current local time and UTC offset.
    pub fn now(identity: impl Into<String>) -> Self {
        let now = Local::now();
        let tz_offset = now.offset().fix().local_minus_utc() / 60;
        Signature::new(identity, now.timestamp(), tz_offset)
    }

    /// Parses `Name <email> 1234567890 +0900`.
    pub fn parse(line: &str) -> Result<Self> {
        let invalid = || Error::CorruptObject {
            oid: String::new(),
            reason: format!("malformed signature: {}", line),
        };

        let mut parts = line.rsplitn(3, ' ');
        let tz = parts.next().ok_or_else(invalid)?;
        let timestamp = parts
            .next()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(invalid)?;
        let identity = parts.next().ok_or_else(invalid)?;

        Ok(Signature {
            identity: identity.to_string(),
            timestamp,
            tz_offset: parse_timezone(tz).ok_or_else(invalid)?,
        })
    }

    /// Returns `Name <email>`.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns the name part, without the email.
    pub fn name(&self) -> &str {
        match self.identity.find('<') {
            Some(pos) => self.identity[..pos].trim_end(),
            None => &self.identity,
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn tz_offset(&self) -> i32 {
        self.tz_offset
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.tz_offset < 0 { '-' } else { '+' };
        let minutes = self.tz_offset.abs();
        write!(
            f,
            "{} {} {}{:02}{:02}",
            self.identity,
            self.timestamp,
            sign,
            minutes / 60,
            minutes % 60
        )
    }
}

/// Parses a timezone string like "+0900" or "-0500" into minutes offset.
fn parse_timezone(s: &str) -> Option<i32> {
    if s.len() != 5 || !s.is_ascii() {
        return None;
    }

    let sign = match &s[..1] {
        "+" => 1,
        "-" => -1,
        _ => return None,
    };

    let hours: i32 = s[1..3].parse().ok()?;
    let minutes: i32 = s[3..5].parse().ok()?;

    Some(sign * (hours * 60 + minutes))
}

/// A commit: a KVLM with a required `tree` header.
///
/// Unknown headers (`gpgsig`, `encoding`, ...) are preserved, so a parsed
/// commit re-serializes to the same bytes and keeps its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    kvlm: Kvlm,
}

impl Commit {
    /// Builds a commit with headers in the canonical order.
    pub fn new(
        tree: Oid,
        parents: &[Oid],
        author: &Signature,
        committer: &Signature,
        message: &str,
    ) -> Self {
        let mut kvlm = Kvlm::new();
        kvlm.set("tree", tree.to_hex());
        for parent in parents {
            kvlm.push("parent", parent.to_hex());
        }
        kvlm.set("author", author.to_string());
        kvlm.set("committer", committer.to_string());
        kvlm.set_message(message);
        Commit { kvlm }
    }

    /// Parses a commit payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        Self::from_kvlm(Kvlm::parse(payload)?)
    }

    /// Wraps an already parsed KVLM. The `tree` header must hold a valid id.
    pub fn from_kvlm(kvlm: Kvlm) -> Result<Self> {
        let commit = Commit { kvlm };
        commit.tree()?;
        commit.parents()?;
        Ok(commit)
    }

    /// The root tree id.
    pub fn tree(&self) -> Result<Oid> {
        header_oid(&self.kvlm, b"tree")?.ok_or_else(|| Error::CorruptObject {
            oid: String::new(),
            reason: "commit has no tree".to_string(),
        })
    }

    /// Parent ids in recorded order; empty for a root commit.
    pub fn parents(&self) -> Result<Vec<Oid>> {
        self.kvlm
            .get_all(b"parent")
            .iter()
            .map(|value| parse_oid_value(value))
            .collect()
    }

    /// The author line, if present and well formed.
    pub fn author(&self) -> Option<Signature> {
        self.kvlm
            .get_str(b"author")
            .and_then(|line| Signature::parse(line).ok())
    }

    /// The committer line, if present and well formed.
    pub fn committer(&self) -> Option<Signature> {
        self.kvlm
            .get_str(b"committer")
            .and_then(|line| Signature::parse(line).ok())
    }

    /// The raw message body.
    pub fn message(&self) -> &[u8] {
        self.kvlm.message()
    }

    /// The first line of the message.
    pub fn summary(&self) -> String {
        String::from_utf8_lossy(self.message())
            .lines()
            .next()
            .unwrap_or("")
            .to_string()
    }

    /// The underlying header map.
    pub fn kvlm(&self) -> &Kvlm {
        &self.kvlm
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.kvlm.serialize()
    }
}

/// Reads an optional header holding a hex id.
pub(crate) fn header_oid(kvlm: &Kvlm, key: &[u8]) -> Result<Option<Oid>> {
    kvlm.get(key).map(parse_oid_value).transpose()
}

fn parse_oid_value(value: &[u8]) -> Result<Oid> {
    let text = std::str::from_utf8(value).map_err(|_| Error::InvalidUtf8)?;
    Oid::from_hex(text).map_err(|_| Error::CorruptObject {
        oid: String::new(),
        reason: format!("invalid object id in header: {}", text),
    })
}
