//! Host directories the stack's bind mounts expect.

use std::path::{Path, PathBuf};

use swarmdeploy_shared::constants::files;
use swarmdeploy_shared::{DeployError, DeployResult};
use walkdir::WalkDir;

use crate::env::StackSettings;
use crate::layout::ProjectLayout;

const DATA_DIRS: [&str; 4] = ["mysql", "logs/api", "logs/check", "install/database/migrations"];
const MIGRATION_SCRIPT: &str = "apply-migrations.sh";

/// What [`prepare_data_root`] did.
#[derive(Debug, Clone, Default)]
pub struct PreparedDataRoot {
    pub root: PathBuf,
    pub created: Vec<PathBuf>,
    pub copied: Vec<PathBuf>,
}

/// Create the data directories and copy the schema, migration script and
/// migrations under `DATA_ROOT`.
///
/// Nothing is copied when the data root is the project directory itself.
pub fn prepare_data_root(
    layout: &ProjectLayout,
    settings: &StackSettings,
) -> DeployResult<PreparedDataRoot> {
    let root = settings.data_root.clone();
    let mut report = PreparedDataRoot {
        root: root.clone(),
        ..Default::default()
    };

    for dir in DATA_DIRS {
        let path = root.join(dir);
        if !path.is_dir() {
            std::fs::create_dir_all(&path)?;
            report.created.push(path);
        }
    }

    if same_dir(&root, layout.root())? {
        tracing::debug!(root = %root.display(), "Data root is the project root, nothing to copy");
        return Ok(report);
    }

    let source = layout.database_dir();
    let target = root.join(files::DATABASE_DIR);

    let schema = source.join(files::SCHEMA_FILE);
    if !schema.is_file() {
        return Err(DeployError::missing_file(schema));
    }
    report.copied.push(copy_into(&schema, &target)?);

    let script = source.join(MIGRATION_SCRIPT);
    if script.is_file() {
        report.copied.push(copy_into(&script, &target)?);
    }

    let migrations = layout.migrations_dir();
    if migrations.is_dir() {
        let target = target.join(files::MIGRATIONS_DIR);
        for entry in WalkDir::new(&migrations)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| DeployError::Internal(e.to_string()))?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "sql")
            {
                report.copied.push(copy_into(entry.path(), &target)?);
            }
        }
    }

    tracing::info!(
        root = %root.display(),
        created = report.created.len(),
        copied = report.copied.len(),
        "Prepared data root"
    );
    Ok(report)
}

fn same_dir(a: &Path, b: &Path) -> DeployResult<bool> {
    Ok(std::fs::canonicalize(a)? == std::fs::canonicalize(b)?)
}

fn copy_into(file: &Path, dir: &Path) -> DeployResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let name = file
        .file_name()
        .ok_or_else(|| DeployError::Internal(format!("bad file name: {}", file.display())))?;
    let dest = dir.join(name);
    std::fs::copy(file, &dest)?;
    Ok(dest)
}
