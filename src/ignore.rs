//! Ignore rules from `.gitignore`, `.git/info/exclude` and the global
//! ignore file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::warn;

use crate::error::{Error, Result};
use crate::infra::read_file;

/// One pattern and whether a match ignores (`true`) or re-includes (`false`).
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    pattern: Pattern,
    ignore: bool,
}

impl IgnoreRule {
    /// Compiles a glob pattern.
    pub fn new(pattern: &str, ignore: bool) -> Result<Self> {
        let pattern = Pattern::new(pattern).map_err(|e| {
            Error::InvalidConfiguration(format!("bad ignore pattern {:?}: {}", pattern, e))
        })?;
        Ok(IgnoreRule { pattern, ignore })
    }

    /// The pattern text.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// `false` for negated (`!`) rules.
    pub fn ignores(&self) -> bool {
        self.ignore
    }
}

/// Parses one line of an ignore file.
///
/// Blank lines and `#` comments yield `None`. `!p` re-includes `p`, `\p`
/// ignores `p` literally (for patterns starting with `#` or `!`).
pub fn parse_line(line: &str) -> Option<(&str, bool)> {
    let line = line.trim();

    if line.is_empty() || line.starts_with('#') {
        None
    } else if let Some(pattern) = line.strip_prefix('!') {
        Some((pattern, false))
    } else if let Some(pattern) = line.strip_prefix('\\') {
        Some((pattern, true))
    } else {
        Some((line, true))
    }
}

/// Parses the contents of an ignore file. Invalid patterns are skipped.
pub fn parse_rules(text: &str) -> Vec<IgnoreRule> {
    text.lines()
        .filter_map(parse_line)
        .filter_map(|(pattern, ignore)| match IgnoreRule::new(pattern, ignore) {
            Ok(rule) => Some(rule),
            Err(e) => {
                warn!(error = %e, "skipping ignore rule");
                None
            }
        })
        .collect()
}

/// Reads an ignore file; a missing file is `None`.
pub fn read_rules_file<P: AsRef<Path>>(path: P) -> Result<Option<Vec<IgnoreRule>>> {
    match read_file(path.as_ref()) {
        Ok(bytes) => Ok(Some(parse_rules(&String::from_utf8_lossy(&bytes)))),
        Err(Error::PathNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// `$XDG_CONFIG_HOME/git/ignore` (default `~/.config/git/ignore`).
pub fn global_ignore_path() -> Option<PathBuf> {
    crate::config::xdg_config_dir().map(|dir| dir.join("git").join("ignore"))
}

/// Layered ignore rules.
///
/// Scoped lists come from `.gitignore` files and apply below their
/// directory; the nearest deciding directory wins. Absolute lists apply
/// everywhere and are consulted, in order, only when no scoped list decides.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    absolute: Vec<Vec<IgnoreRule>>,
    scoped: BTreeMap<String, Vec<IgnoreRule>>,
}

impl IgnoreRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a repository-wide rule list.
    pub fn add_absolute(&mut self, rules: Vec<IgnoreRule>) {
        self.absolute.push(rules);
    }

    /// Sets the rule list for a directory (`""` is the worktree root).
    pub fn add_scoped(&mut self, dir: impl Into<String>, rules: Vec<IgnoreRule>) {
        self.scoped.insert(dir.into(), rules);
    }

    /// Decides whether a worktree-relative path is ignored.
    ///
    /// # Errors
    ///
    /// `Error::AbsolutePathNotAllowed` if `path` is absolute.
    pub fn check(&self, path: &str) -> Result<bool> {
        if path.starts_with('/') || Path::new(path).is_absolute() {
            return Err(Error::AbsolutePathNotAllowed(PathBuf::from(path)));
        }

        let mut dir = parent_dir(path);
        loop {
            if let Some(rules) = self.scoped.get(dir) {
                let relative = if dir.is_empty() {
                    path
                } else {
                    &path[dir.len() + 1..]
                };
                if let Some(decision) = last_match(rules, relative) {
                    return Ok(decision);
                }
            }
            if dir.is_empty() {
                break;
            }
            dir = parent_dir(dir);
        }

        Ok(self
            .absolute
            .iter()
            .find_map(|rules| last_match(rules, path))
            .unwrap_or(false))
    }
}

/// The decision of the last rule in `rules` matching `path`.
fn last_match(rules: &[IgnoreRule], path: &str) -> Option<bool> {
    rules
        .iter()
        .rev()
        .find(|rule| rule.pattern.matches(path))
        .map(|rule| rule.ignore)
}

fn parent_dir(path: &str) -> &str {
    path.rfind('/').map_or("", |pos| &path[..pos])
}
