//! Order- and comment-preserving dotenv document.

use std::path::{Path, PathBuf};

use swarmdeploy_shared::{DeployError, DeployResult};

use crate::fsutil::write_atomic;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Entry { key: String, value: String },
    /// Comment, blank line, or anything that is not `KEY=value`.
    Other(String),
}

/// A `.env` file held in memory.
///
/// Lines that are not assignments are kept verbatim so that templates'
/// comments and section headers survive every `set` + `save` cycle.
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    path: Option<PathBuf>,
    lines: Vec<Line>,
}

impl EnvFile {
    /// Parse dotenv text.
    pub fn parse(content: &str) -> Self {
        let lines = content.lines().map(parse_line).collect();
        Self { path: None, lines }
    }

    /// Load an existing file.
    pub fn load(path: &Path) -> DeployResult<Self> {
        if !path.is_file() {
            return Err(DeployError::missing_file(path));
        }
        let content = std::fs::read_to_string(path)?;
        let mut env = Self::parse(&content);
        env.path = Some(path.to_path_buf());
        Ok(env)
    }

    /// Load `path`, or start an empty document bound to it.
    pub fn load_or_empty(path: &Path) -> DeployResult<Self> {
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self {
                path: Some(path.to_path_buf()),
                lines: Vec::new(),
            })
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|l| match l {
            Line::Entry { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Value for `key` if present and not blank.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set `key`, replacing the first occurrence in place.
    ///
    /// Later duplicates are dropped; an absent key is appended.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let mut seen = false;
        self.lines.retain_mut(|line| match line {
            Line::Entry { key: k, value: v } if k == key => {
                if seen {
                    false
                } else {
                    seen = true;
                    *v = value.clone();
                    true
                }
            }
            _ => true,
        });
        if !seen {
            self.lines.push(Line::Entry {
                key: key.to_string(),
                value,
            });
        }
    }

    /// Remove every assignment of `key`. Returns whether anything was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.lines.len();
        self.lines
            .retain(|l| !matches!(l, Line::Entry { key: k, .. } if k == key));
        before != self.lines.len()
    }

    /// Assignments in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|l| match l {
            Line::Entry { key, value } => Some((key.as_str(), value.as_str())),
            Line::Other(_) => None,
        })
    }

    /// Serialize back to dotenv text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Entry { key, value } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(&quote_value(value));
                }
                Line::Other(raw) => out.push_str(raw),
            }
            out.push('\n');
        }
        out
    }

    /// Write to the path this document was loaded from.
    pub fn save(&self) -> DeployResult<()> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| DeployError::Internal("env document has no backing file".into()))?;
        write_atomic(path, &self.render())
    }

    pub fn save_to(&mut self, path: &Path) -> DeployResult<()> {
        write_atomic(path, &self.render())?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }
}

/// Set each `(key, value)` in the file at `path` and save it.
///
/// Creates the file when it does not exist yet.
pub fn update_env_values(path: &Path, values: &[(&str, &str)]) -> DeployResult<()> {
    let mut env = EnvFile::load_or_empty(path)?;
    for (key, value) in values {
        env.set(key, *value);
    }
    env.save()
}

fn parse_line(raw: &str) -> Line {
    let trimmed = raw.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Line::Other(raw.to_string());
    }
    let body = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let Some((key, value)) = body.split_once('=') else {
        return Line::Other(raw.to_string());
    };
    let key = key.trim();
    if !is_valid_key(key) {
        return Line::Other(raw.to_string());
    }
    Line::Entry {
        key: key.to_string(),
        value: unquote(value.trim()),
    }
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        return value[1..value.len() - 1].to_string();
    }
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        let inner = &value[1..value.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some(other) => out.push(other),
                    None => out.push('\\'),
                }
            } else {
                out.push(c);
            }
        }
        return out;
    }
    // unquoted values may carry a trailing ` # comment`
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end().to_string(),
        None => value.to_string(),
    }
}

fn quote_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '{' | '[' | '$' | '\\'));
    if !needs_quotes || value.is_empty() {
        return value.to_string();
    }
    if !value.contains('\'') && !value.contains('\n') {
        return format!("'{}'", value);
    }
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_preserves_comments_and_order() {
        let src = "# Stack\nSTACK_NAME=statechecker\n\nPROXY_TYPE=none # inline\n";
        let env = EnvFile::parse(src);
        assert_eq!(env.get("STACK_NAME"), Some("statechecker"));
        assert_eq!(env.get("PROXY_TYPE"), Some("none"));
        assert_eq!(env.render(), "# Stack\nSTACK_NAME=statechecker\n\nPROXY_TYPE=none\n");
    }

    #[test]
    fn test_set_replaces_in_place_and_drops_duplicates() {
        let mut env = EnvFile::parse("A=1\nB=2\nA=3\n");
        env.set("A", "9");
        assert_eq!(env.render(), "A=9\nB=2\n");
    }

    #[test]
    fn test_update_env_values_twice_leaves_one_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "STACK_NAME=statechecker\n").unwrap();

        update_env_values(&path, &[("WEB_PORT", "8080")]).unwrap();
        update_env_values(&path, &[("WEB_PORT", "9090")]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().filter(|l| l.starts_with("WEB_PORT=")).collect();
        assert_eq!(lines, vec!["WEB_PORT=9090"]);
        assert!(content.starts_with("STACK_NAME=statechecker\n"));
    }

    #[test]
    fn test_update_env_values_fresh_file_appends_one_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        update_env_values(&path, &[("API_REPLICAS", "2")]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "API_REPLICAS=2\n");
    }

    #[test]
    fn test_json_value_round_trips() {
        let json = r#"{"websites":[{"name":"home","url":"https://example.org"}]}"#;
        let mut env = EnvFile::default();
        env.set("STATECHECKER_SERVER_CONFIG", json);
        let rendered = env.render();
        assert!(rendered.starts_with("STATECHECKER_SERVER_CONFIG='{"));
        let reparsed = EnvFile::parse(&rendered);
        assert_eq!(reparsed.get("STATECHECKER_SERVER_CONFIG"), Some(json));
    }

    #[test]
    fn test_value_with_single_quote_uses_double_quotes() {
        let mut env = EnvFile::default();
        env.set("MOTD", "it's \"up\"");
        let reparsed = EnvFile::parse(&env.render());
        assert_eq!(reparsed.get("MOTD"), Some("it's \"up\""));
    }

    #[test]
    fn test_export_prefix_and_invalid_lines() {
        let env = EnvFile::parse("export A=1\nnot a pair\n1BAD=x\n");
        assert_eq!(env.get("A"), Some("1"));
        assert!(!env.contains("1BAD"));
        assert_eq!(env.entries().count(), 1);
    }

    #[test]
    fn test_remove() {
        let mut env = EnvFile::parse("A=1\nB=2\n");
        assert!(env.remove("A"));
        assert!(!env.remove("A"));
        assert_eq!(env.render(), "B=2\n");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = EnvFile::load(&dir.path().join(".env")).unwrap_err();
        assert!(matches!(err, DeployError::MissingFile { .. }));
    }

    #[test]
    fn test_save_without_path_fails() {
        assert!(EnvFile::default().save().is_err());
    }
}
