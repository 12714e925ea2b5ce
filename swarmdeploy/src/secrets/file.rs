//! Batch secret definitions (`secrets.env`).

use std::path::{Path, PathBuf};

use swarmdeploy_shared::constants::secrets as names;
use swarmdeploy_shared::{DeployError, DeployResult};

/// One secret read from a batch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub name: String,
    pub value: Vec<u8>,
    /// Set when the value was loaded from a file the entry pointed at.
    pub source: Option<PathBuf>,
}

/// Parse a dotenv-style secrets file.
///
/// Blank and comment lines are skipped, as are entries with an empty value.
/// The Google Drive service account entry may hold a path; when it names an
/// existing file (relative paths resolve against the batch file's directory)
/// the secret value is that file's content.
pub fn load_batch(path: &Path) -> DeployResult<Vec<BatchEntry>> {
    if !path.is_file() {
        return Err(DeployError::missing_file(path));
    }
    let base = path.parent().unwrap_or(Path::new("."));
    let iter = dotenvy::from_path_iter(path)
        .map_err(|e| DeployError::Config(format!("{}: {}", path.display(), e)))?;

    let mut entries = Vec::new();
    for item in iter {
        let (name, value) =
            item.map_err(|e| DeployError::Config(format!("{}: {}", path.display(), e)))?;
        if value.trim().is_empty() {
            tracing::warn!(secret = %name, "Empty value in secrets file, skipping");
            continue;
        }
        if name == names::GOOGLE_DRIVE_SERVICE_ACCOUNT_JSON {
            let candidate = base.join(value.trim());
            if candidate.is_file() {
                entries.push(BatchEntry {
                    name,
                    value: std::fs::read(&candidate)?,
                    source: Some(candidate),
                });
                continue;
            }
        }
        entries.push(BatchEntry {
            name,
            value: value.into_bytes(),
            source: None,
        });
    }
    Ok(entries)
}
