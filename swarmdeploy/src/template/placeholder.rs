//! `###NAME###` placeholder injection.

use std::sync::LazyLock;

use regex::Regex;
use swarmdeploy_shared::{DeployError, DeployResult};

pub const PROXY_NETWORK: &str = "###PROXY_NETWORK###";
pub const PROXY_LABELS: &str = "###PROXY_LABELS###";
pub const PROXY_PORTS: &str = "###PROXY_PORTS###";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"###[A-Z0-9_]+###").expect("placeholder pattern is valid"));

/// Replace every line holding `token` with `snippet`, or drop the line when
/// there is no snippet.
///
/// The snippet keeps its own indentation; the token line is removed.
pub fn inject(template: &str, token: &str, snippet: Option<&str>) -> String {
    let mut out = String::with_capacity(template.len());
    for line in template.split_inclusive('\n') {
        if line.trim() != token {
            out.push_str(line);
            continue;
        }
        if let Some(snippet) = snippet {
            out.push_str(snippet);
            if !snippet.is_empty() && !snippet.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    out
}

/// First `###NAME###` token left in `document`, if any.
pub fn find_unresolved(document: &str) -> Option<&str> {
    PLACEHOLDER.find(document).map(|m| m.as_str())
}

pub fn ensure_resolved(content: &str, document: &str) -> DeployResult<()> {
    match find_unresolved(content) {
        Some(token) => Err(DeployError::UnresolvedPlaceholder {
            token: token.to_string(),
            document: document.to_string(),
        }),
        None => Ok(()),
    }
}
