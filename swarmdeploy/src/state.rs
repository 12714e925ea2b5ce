//! Where a project checkout stands in its setup lifecycle.

use std::fmt;

use serde::Serialize;
use swarmdeploy_shared::DeployResult;

use crate::docker::DockerEngine;
use crate::env::{EnvFile, StackSettings};
use crate::layout::ProjectLayout;
use crate::options::DeployOptions;
use crate::secrets::SecretManager;

/// Derived on every call from `.env`, the setup marker, the Swarm secrets
/// and the deployed stacks; nothing is cached between menu actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectState {
    /// No `.env` yet.
    NotConfigured,
    /// `.env` exists but setup did not finish or required secrets are missing.
    Configuring,
    /// Configured and ready to deploy.
    Ready,
    /// The configured stack is running.
    Deployed,
}

impl ProjectState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectState::NotConfigured => "not configured",
            ProjectState::Configuring => "configuring",
            ProjectState::Ready => "ready",
            ProjectState::Deployed => "deployed",
        }
    }
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub async fn detect_state(
    engine: &dyn DockerEngine,
    layout: &ProjectLayout,
    options: &DeployOptions,
) -> DeployResult<ProjectState> {
    if !layout.is_configured() {
        return Ok(ProjectState::NotConfigured);
    }
    if !layout.setup_marker().is_file() || !layout.stack_file().is_file() {
        return Ok(ProjectState::Configuring);
    }
    if !SecretManager::new(engine, options)
        .check_required()
        .await?
        .is_complete()
    {
        return Ok(ProjectState::Configuring);
    }

    let env = EnvFile::load(&layout.env_file())?;
    let settings = StackSettings::from_env(&env, layout.root())?;
    let deployed = engine
        .stack_list()
        .await?
        .iter()
        .any(|s| s.name == settings.stack_name);
    Ok(if deployed {
        ProjectState::Deployed
    } else {
        ProjectState::Ready
    })
}
