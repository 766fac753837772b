//! Git configuration files.
//!
//! Reads the repository's `.git/config` and the user's global files
//! (`$XDG_CONFIG_HOME/git/config`, `~/.gitconfig`).
//!
//! # Example
//!
//! ```no_run
//! use looseleaf::config::Config;
//!
//! let config = Config::from_file(".git/config").unwrap();
//! if let Some(name) = config.get("user", "name") {
//!     println!("User name: {}", name);
//! }
//! ```

mod parser;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::infra::read_file;

/// A parsed configuration file.
///
/// Section and key names are case-insensitive; subsection names are not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Configuration entries stored as section -> subsection -> key -> value.
    /// Subsection is empty string for sections without subsection.
    entries: BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>,
}

impl Config {
    /// Creates a new empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration written by `init`.
    pub fn repository_default() -> Self {
        let mut config = Config::new();
        config.set("core", "", "repositoryformatversion", "0");
        config.set("core", "", "filemode", "false");
        config.set("core", "", "bare", "false");
        config
    }

    /// Parses configuration from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = read_file(path.as_ref())?;
        let text = String::from_utf8(content).map_err(|_| Error::InvalidUtf8)?;
        Self::from_str(&text)
    }

    /// Parses configuration from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        parser::parse(content)
    }

    /// Merges the user's global configuration files.
    ///
    /// `$XDG_CONFIG_HOME/git/config` (default `~/.config/git/config`) is read
    /// first, then `~/.gitconfig`; later files win. Missing or unreadable
    /// files are skipped.
    pub fn global() -> Self {
        let mut config = Config::new();
        let candidates = [
            xdg_config_dir().map(|dir| dir.join("git").join("config")),
            dirs::home_dir().map(|home| home.join(".gitconfig")),
        ];

        for path in candidates.into_iter().flatten() {
            match Config::from_file(&path) {
                Ok(file) => {
                    debug!(path = %path.display(), "loaded global config");
                    config.merge(&file);
                }
                Err(Error::PathNotFound(_)) => {}
                Err(e) => debug!(path = %path.display(), error = %e, "skipped global config"),
            }
        }

        config
    }

    /// `Name <email>` when both `user.name` and `user.email` are set.
    pub fn user_identity(&self) -> Option<String> {
        let name = self.get("user", "name")?;
        let email = self.get("user", "email")?;
        Some(format!("{} <{}>", name, email))
    }

    /// Gets a value from a section without a subsection.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.get_subsection(section, "", key)
    }

    /// Gets a value from `[section "subsection"]`.
    pub fn get_subsection(&self, section: &str, subsection: &str, key: &str) -> Option<&str> {
        self.entries
            .get(&section.to_lowercase())
            .and_then(|subs| subs.get(subsection))
            .and_then(|keys| keys.get(&key.to_lowercase()))
            .map(String::as_str)
    }

    /// Gets a boolean value.
    ///
    /// `true`/`yes`/`on`/`1` and `false`/`no`/`off`/`0` are accepted.
    /// Returns `Ok(None)` if the key is absent.
    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        self.get(section, key).map(parse_bool).transpose()
    }

    /// Gets an integer value, honoring `k`/`m`/`g` suffixes.
    ///
    /// Returns `Ok(None)` if the key is absent.
    pub fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>> {
        self.get(section, key).map(parse_int).transpose()
    }

    /// Returns all section names.
    pub fn sections(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Sets a value, replacing any previous one.
    pub fn set(&mut self, section: &str, subsection: &str, key: &str, value: &str) {
        self.entries
            .entry(section.to_lowercase())
            .or_default()
            .entry(subsection.to_string())
            .or_default()
            .insert(key.to_lowercase(), value.to_string());
    }

    /// Merges another configuration into this one.
    ///
    /// Values from `other` will override values in `self`.
    pub fn merge(&mut self, other: &Config) {
        for (section, subsections) in &other.entries {
            for (subsection, keys) in subsections {
                for (key, value) in keys {
                    self.set(section, subsection, key, value);
                }
            }
        }
    }
}

impl fmt::Display for Config {
    /// Writes the configuration back in git's file format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (section, subsections) in &self.entries {
            for (subsection, keys) in subsections {
                if subsection.is_empty() {
                    writeln!(f, "[{}]", section)?;
                } else {
                    let escaped = subsection.replace('\\', "\\\\").replace('"', "\\\"");
                    writeln!(f, "[{} \"{}\"]", section, escaped)?;
                }
                for (key, value) in keys {
                    writeln!(f, "\t{} = {}", key, quote_value(value))?;
                }
            }
        }
        Ok(())
    }
}

/// Quotes a value if reading it back would otherwise change it.
fn quote_value(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t");
    let needs_quotes = value.trim() != value || value.contains(['#', ';']);
    if needs_quotes {
        format!("\"{}\"", escaped)
    } else {
        escaped
    }
}

/// Parses a string as a Git boolean value.
fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" | "" => Ok(false),
        _ => Err(Error::InvalidConfiguration(format!(
            "invalid boolean value: {}",
            value
        ))),
    }
}

/// Parses a string as a Git integer value with optional suffix.
fn parse_int(value: &str) -> Result<i64> {
    let trimmed = value.trim();
    let invalid = || Error::InvalidConfiguration(format!("invalid integer value: {}", value));

    let (digits, multiplier) = match trimmed.char_indices().last() {
        Some((i, 'k' | 'K')) => (&trimmed[..i], 1024_i64),
        Some((i, 'm' | 'M')) => (&trimmed[..i], 1024 * 1024),
        Some((i, 'g' | 'G')) => (&trimmed[..i], 1024 * 1024 * 1024),
        Some(_) => (trimmed, 1),
        None => return Err(invalid()),
    };

    digits
        .trim()
        .parse::<i64>()
        .map_err(|_| invalid())?
        .checked_mul(multiplier)
        .ok_or_else(invalid)
}

/// `$XDG_CONFIG_HOME`, or `~/.config` when unset.
pub(crate) fn xdg_config_dir() -> Option<PathBuf> {
    match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::home_dir().map(|home| home.join(".config")),
    }
}
