//! Tool options for the swarmdeploy CLI.
//!
//! Reads the optional `.swarmdeploy.json` in the project directory.

use std::path::Path;

use swarmdeploy::DeployOptions;
use tracing::warn;

/// Load [`DeployOptions`] from `path`.
///
/// A missing file means defaults. An unreadable or invalid file is reported
/// and also falls back to defaults, so a typo never blocks an operation.
pub fn load_options(path: &Path) -> DeployOptions {
    try_load_json(path).unwrap_or_default()
}

fn try_load_json(path: &Path) -> Option<DeployOptions> {
    if !path.exists() {
        return None;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read options file {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str::<DeployOptions>(&content) {
        Ok(options) => Some(options),
        Err(e) => {
            warn!("Failed to parse options file {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_partial_json_overrides_named_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".swarmdeploy.json");
        fs::write(&path, r#"{"stack_removal_timeout_secs": 30, "docker_binary": "/usr/local/bin/docker"}"#).unwrap();

        let options = load_options(&path);
        assert_eq!(options.stack_removal_timeout_secs, 30);
        assert_eq!(options.docker_binary, Path::new("/usr/local/bin/docker"));
        assert_eq!(options.poll_interval_secs, 2);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let options = load_options(&temp_dir.path().join(".swarmdeploy.json"));
        assert_eq!(options.stack_removal_timeout_secs, 120);
    }

    #[test]
    fn test_invalid_json_warns_and_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".swarmdeploy.json");
        fs::write(&path, r#"{"poll_interval_secs": "#).unwrap();

        let options = load_options(&path);
        assert_eq!(options.poll_interval_secs, 2);
    }
}
