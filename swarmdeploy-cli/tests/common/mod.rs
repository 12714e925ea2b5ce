//! Shared helpers for the CLI integration tests.
//!
//! Every test gets its own project directory; the setup templates come from
//! the checkout so nothing is copied.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

pub struct TestContext {
    pub cmd: Command,
    pub project: TempDir,
}

impl TestContext {
    pub fn path(&self, name: &str) -> PathBuf {
        self.project.path().join(name)
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).unwrap()
    }

    /// A fresh command against the same project.
    pub fn new_cmd(&self) -> Command {
        command_for(self.project.path())
    }
}

pub fn setup_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../setup")
}

fn command_for(project: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("swarmdeploy"));
    cmd.arg("--project-dir")
        .arg(project)
        .arg("--setup-dir")
        .arg(setup_dir())
        .arg("--non-interactive")
        .env_remove("SWARMDEPLOY_PROJECT_DIR")
        .env_remove("SWARMDEPLOY_SETUP_DIR")
        .env_remove("RUST_LOG");
    cmd
}

pub fn swarmdeploy() -> TestContext {
    let project = TempDir::new().unwrap();
    TestContext {
        cmd: command_for(project.path()),
        project,
    }
}
