//! Parser for git's INI-like configuration format.

use super::Config;
use crate::error::{Error, Result};

/// Parses configuration text.
///
/// Recognizes `[section]` and `[section "subsection"]` headers, `key = value`
/// lines, bare `key` lines (meaning `true`), `#`/`;` comments, quoted values
/// and backslash escapes.
pub fn parse(content: &str) -> Result<Config> {
    let mut config = Config::new();
    let mut section: Option<(String, String)> = None;

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        let invalid = |what: &str| {
            Error::InvalidConfiguration(format!("line {}: {}: {}", number + 1, what, line))
        };

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') {
            section = Some(parse_section_header(line).ok_or_else(|| invalid("bad section header"))?);
            continue;
        }

        let (name, subsection) = section
            .as_ref()
            .ok_or_else(|| invalid("key outside of any section"))?;

        let (key, value) = match line.split_once('=') {
            Some((key, raw)) => (key.trim(), parse_value(raw).ok_or_else(|| invalid("bad value"))?),
            None => (line, "true".to_string()),
        };
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(invalid("bad key name"));
        }

        config.set(name, subsection, key, &value);
    }

    Ok(config)
}

/// Parses a section header like `[section]` or `[section "subsection"]`.
fn parse_section_header(line: &str) -> Option<(String, String)> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;

    match inner.find('"') {
        None => {
            let name = inner.trim();
            (!name.is_empty()).then(|| (name.to_string(), String::new()))
        }
        Some(open) => {
            let name = inner[..open].trim();
            let quoted = inner[open + 1..].strip_suffix('"')?;
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), unescape_subsection(quoted)))
        }
    }
}

/// Subsection names only escape `\` and `"`.
fn unescape_subsection(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => result.extend(chars.next()),
            c => result.push(c),
        }
    }

    result
}

/// Parses the right-hand side of `key = value`.
///
/// Unquoted leading and trailing whitespace is dropped, a `#` or `;` outside
/// quotes starts a comment. Returns `None` on an unterminated quote or an
/// unknown escape.
fn parse_value(raw: &str) -> Option<String> {
    let mut value = String::new();
    let mut pending_space = String::new();
    let mut in_quotes = false;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        let literal = match c {
            '"' => {
                in_quotes = !in_quotes;
                continue;
            }
            '\\' => match chars.next()? {
                'n' => '\n',
                't' => '\t',
                'b' => '\u{8}',
                '\\' => '\\',
                '"' => '"',
                _ => return None,
            },
            '#' | ';' if !in_quotes => break,
            c if c.is_whitespace() && !in_quotes => {
                if !value.is_empty() {
                    pending_space.push(c);
                }
                continue;
            }
            c => c,
        };

        value.push_str(&pending_space);
        pending_space.clear();
        value.push(literal);
    }

    (!in_quotes).then_some(value)
}
