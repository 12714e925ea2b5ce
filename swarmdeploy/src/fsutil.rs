//! Atomic writes and timestamped backups.

use std::io::Write;
use std::path::{Path, PathBuf};

use swarmdeploy_shared::{DeployError, DeployResult};
use tempfile::NamedTempFile;

/// Write `content` to `path` through a temp file in the same directory.
///
/// The destination is replaced only after the whole content is flushed,
/// so a failed write never leaves a truncated file behind.
pub(crate) fn write_atomic(path: &Path, content: &str) -> DeployResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| {
        DeployError::Internal(format!("failed to replace {}: {}", path.display(), e.error))
    })?;
    Ok(())
}

/// Copy `path` into `backup_dir` as `<file name>.<YYYYmmdd-HHMMSS>`.
///
/// Returns `None` when there is nothing to back up.
pub(crate) fn backup_file(path: &Path, backup_dir: &Path) -> DeployResult<Option<PathBuf>> {
    if !path.is_file() {
        return Ok(None);
    }
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DeployError::Internal(format!("bad file name: {}", path.display())))?;

    std::fs::create_dir_all(backup_dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let mut target = backup_dir.join(format!("{}.{}", name, stamp));
    let mut n = 1;
    while target.exists() {
        target = backup_dir.join(format!("{}.{}-{}", name, stamp, n));
        n += 1;
    }
    std::fs::copy(path, &target)?;
    tracing::info!(from = %path.display(), to = %target.display(), "Backed up file");
    Ok(Some(target))
}
