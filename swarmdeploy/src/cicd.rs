//! GitHub Actions setup guidance.
//!
//! A deploy workflow needs the `.env` settings and the Swarm secret values on
//! the runner. Settings become repository variables, anything credential-like
//! becomes a repository secret. Secret values are never printed; the rendered
//! `gh secret set` commands prompt for them.

use serde::Serialize;
use swarmdeploy_shared::constants::secrets as names;

use crate::env::EnvFile;

const SENSITIVE_MARKERS: [&str; 6] = ["PASSWORD", "PASSWD", "TOKEN", "SECRET", "_KEY", "PRIVATE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Variable,
    Secret,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuidanceEntry {
    pub name: String,
    pub kind: Kind,
    /// Set for variables only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CicdGuidance {
    pub entries: Vec<GuidanceEntry>,
}

pub fn is_sensitive(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    SENSITIVE_MARKERS.iter().any(|m| upper.contains(m))
}

/// Classify every `.env` key and add the Swarm secrets the stack consumes.
pub fn github_actions_guidance(env: &EnvFile) -> CicdGuidance {
    let mut entries: Vec<GuidanceEntry> = env
        .entries()
        .map(|(key, value)| {
            if is_sensitive(key) {
                GuidanceEntry {
                    name: key.to_string(),
                    kind: Kind::Secret,
                    value: None,
                }
            } else {
                GuidanceEntry {
                    name: key.to_string(),
                    kind: Kind::Variable,
                    value: Some(value.to_string()),
                }
            }
        })
        .collect();

    for name in names::REQUIRED.iter().chain(names::OPTIONAL.iter()) {
        if entries.iter().any(|e| e.name == *name) {
            continue;
        }
        entries.push(GuidanceEntry {
            name: name.to_string(),
            kind: Kind::Secret,
            value: None,
        });
    }
    CicdGuidance { entries }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

impl CicdGuidance {
    pub fn variables(&self) -> impl Iterator<Item = &GuidanceEntry> {
        self.entries.iter().filter(|e| e.kind == Kind::Variable)
    }

    pub fn secrets(&self) -> impl Iterator<Item = &GuidanceEntry> {
        self.entries.iter().filter(|e| e.kind == Kind::Secret)
    }

    /// `gh` commands that configure the repository, optionally for `--repo`.
    pub fn render_commands(&self, repo: Option<&str>) -> String {
        let repo_flag = repo
            .map(|r| format!(" --repo {}", shell_quote(r)))
            .unwrap_or_default();
        let mut out = String::from("# Repository variables\n");
        for entry in self.variables() {
            out.push_str(&format!(
                "gh variable set {}{} --body {}\n",
                entry.name,
                repo_flag,
                shell_quote(entry.value.as_deref().unwrap_or_default())
            ));
        }
        out.push_str("\n# Repository secrets (gh prompts for each value)\n");
        for entry in self.secrets() {
            out.push_str(&format!("gh secret set {}{}\n", entry.name, repo_flag));
        }
        out
    }
}
