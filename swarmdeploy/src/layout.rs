//! Filesystem layout of a project checkout.

use std::path::{Path, PathBuf};

use swarmdeploy_shared::constants::files;

use crate::template;

/// Paths the toolkit reads and writes, rooted at the project directory.
///
/// The setup directory (templates and snippets) defaults to `<project>/setup`
/// but can point elsewhere so one template set can serve several checkouts.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
    setup_dir: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let setup_dir = root.join(files::SETUP_DIR);
        Self { root, setup_dir }
    }

    pub fn with_setup_dir(mut self, setup_dir: impl Into<PathBuf>) -> Self {
        self.setup_dir = setup_dir.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn setup_dir(&self) -> &Path {
        &self.setup_dir
    }

    pub fn env_file(&self) -> PathBuf {
        self.root.join(files::ENV_FILE)
    }

    pub fn stack_file(&self) -> PathBuf {
        self.root.join(files::STACK_FILE)
    }

    pub fn secrets_file(&self) -> PathBuf {
        self.root.join(files::SECRETS_FILE)
    }

    pub fn setup_marker(&self) -> PathBuf {
        self.root.join(files::SETUP_COMPLETE_MARKER)
    }

    pub fn options_file(&self) -> PathBuf {
        self.root.join(files::OPTIONS_FILE)
    }

    pub fn env_backup_dir(&self) -> PathBuf {
        self.root.join(files::BACKUP_ENV_DIR)
    }

    pub fn stack_backup_dir(&self) -> PathBuf {
        self.root.join(files::BACKUP_STACK_DIR)
    }

    /// `install/database` inside the project checkout.
    pub fn database_dir(&self) -> PathBuf {
        self.root.join(files::DATABASE_DIR)
    }

    pub fn migrations_dir(&self) -> PathBuf {
        self.database_dir().join(files::MIGRATIONS_DIR)
    }

    pub fn compose_modules_dir(&self) -> PathBuf {
        self.setup_dir.join(template::COMPOSE_MODULES_DIR)
    }

    pub fn env_templates_dir(&self) -> PathBuf {
        self.setup_dir.join(template::ENV_TEMPLATES_DIR)
    }

    pub fn is_configured(&self) -> bool {
        self.env_file().is_file()
    }
}
