//! Annotated tag objects.

use super::commit::{header_oid, Signature};
use super::kvlm::Kvlm;
use super::oid::Oid;
use super::ObjectKind;
use crate::error::{Error, Result};

/// An annotated tag.
///
/// ```text
/// object <id>
/// type <kind>
/// tag <name>
/// tagger <signature>
///
/// <message>
/// ```
///
/// Lightweight tags are plain refs and have no object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    kvlm: Kvlm,
}

impl Tag {
    /// Builds a tag pointing at `target`.
    pub fn new(
        target: Oid,
        target_kind: ObjectKind,
        name: &str,
        tagger: &Signature,
        message: &str,
    ) -> Self {
        let mut kvlm = Kvlm::new();
        kvlm.set("object", target.to_hex());
        kvlm.set("type", target_kind.as_str());
        kvlm.set("tag", name);
        kvlm.set("tagger", tagger.to_string());
        kvlm.set_message(message);
        Tag { kvlm }
    }

    /// Parses a tag payload. The `object` header must hold a valid id.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let tag = Tag {
            kvlm: Kvlm::parse(payload)?,
        };
        tag.target()?;
        Ok(tag)
    }

    /// The tagged object.
    pub fn target(&self) -> Result<Oid> {
        header_oid(&self.kvlm, b"object")?.ok_or_else(|| Error::CorruptObject {
            oid: String::new(),
            reason: "tag has no object".to_string(),
        })
    }

    /// The declared kind of the tagged object.
    pub fn target_kind(&self) -> Option<ObjectKind> {
        self.kvlm.get_str(b"type").and_then(ObjectKind::parse)
    }

    /// The tag name.
    pub fn name(&self) -> Option<&str> {
        self.kvlm.get_str(b"tag")
    }

    pub fn tagger(&self) -> Option<Signature> {
        self.kvlm
            .get_str(b"tagger")
            .and_then(|line| Signature::parse(line).ok())
    }

    pub fn message(&self) -> &[u8] {
        self.kvlm.message()
    }

    pub fn kvlm(&self) -> &Kvlm {
        &self.kvlm
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.kvlm.serialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "0123456789abcdef0123456789abcdef01234567";

    // G-001: fields of a parsed tag
    #[test]
    fn test_parse_tag() {
        let payload = format!(
            "object {}\ntype commit\ntag v1.0.0\ntagger Jane <jane@example.com> 1700000000 +0000\n\nRelease 1.0\n",
            TARGET
        );
        let tag = Tag::parse(payload.as_bytes()).unwrap();

        assert_eq!(tag.target().unwrap().to_hex(), TARGET);
        assert_eq!(tag.target_kind(), Some(ObjectKind::Commit));
        assert_eq!(tag.name(), Some("v1.0.0"));
        assert_eq!(tag.tagger().unwrap().identity(), "Jane <jane@example.com>");
        assert_eq!(tag.message(), b"Release 1.0\n");
        assert_eq!(tag.serialize(), payload.as_bytes());
    }

    // G-002: new() emits every header before the message
    #[test]
    fn test_new_tag() {
        let tagger = Signature::new("Jane <jane@example.com>", 1700000000, 0);
        let tag = Tag::new(
            Oid::from_hex(TARGET).unwrap(),
            ObjectKind::Tree,
            "snapshot",
            &tagger,
            "msg\n",
        );

        let text = String::from_utf8(tag.serialize()).unwrap();
        assert_eq!(
            text,
            format!(
                "object {}\ntype tree\ntag snapshot\ntagger {}\n\nmsg\n",
                TARGET, tagger
            )
        );
    }

    // G-003: a tag without an object is corrupt
    #[test]
    fn test_missing_object() {
        assert!(matches!(
            Tag::parse(b"type commit\ntag v1\n\n"),
            Err(Error::CorruptObject { .. })
        ));
    }
}
