//! Compose rendering and structural rewrites of the stack document.

mod external;
mod no_proxy;
mod normalize;

use std::path::{Path, PathBuf};

use swarmdeploy_shared::{DeployError, DeployResult};

use crate::docker::{ComposeRenderRequest, DockerCommand};

pub use external::attach_external_network;
pub use no_proxy::{NoProxyPorts, apply_no_proxy, rewrite_no_proxy};
pub use normalize::normalize_for_stack;

/// Which compose front-end is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeKind {
    /// `docker compose` (CLI plugin).
    Plugin,
    /// Legacy `docker-compose` binary.
    Standalone,
}

/// A detected compose front-end and what it supports.
#[derive(Debug, Clone)]
pub struct ComposeTool {
    pub kind: ComposeKind,
    program: PathBuf,
    pub supports_env_file: bool,
}

impl ComposeTool {
    /// Probe for `docker compose`, then for `docker-compose` on PATH.
    pub async fn detect(docker_binary: &Path) -> DeployResult<Self> {
        let plugin = DockerCommand::new(docker_binary)
            .args(["compose", "version"])
            .output()
            .await;
        let (kind, program) = match plugin {
            Ok(out) if out.success() => (ComposeKind::Plugin, docker_binary.to_path_buf()),
            _ => match which::which("docker-compose") {
                Ok(path) => (ComposeKind::Standalone, path),
                Err(_) => {
                    return Err(DeployError::precondition_with_hint(
                        "neither `docker compose` nor `docker-compose` is available",
                        "install the Docker Compose plugin",
                    ));
                }
            },
        };

        let mut tool = Self {
            kind,
            program,
            supports_env_file: false,
        };
        let help = tool.command().arg("--help").output().await?;
        tool.supports_env_file = help.stdout.contains("--env-file");
        tracing::debug!(kind = ?tool.kind, env_file = tool.supports_env_file, "Detected compose");
        Ok(tool)
    }

    fn command(&self) -> DockerCommand {
        let cmd = DockerCommand::new(&self.program);
        match self.kind {
            ComposeKind::Plugin => cmd.arg("compose"),
            ComposeKind::Standalone => cmd,
        }
    }

    /// Run `compose config` and return the rendered document.
    ///
    /// Without `--env-file` support the env file is loaded into the child's
    /// environment instead.
    pub async fn render(&self, request: &ComposeRenderRequest) -> DeployResult<String> {
        if !request.compose_file.is_file() {
            return Err(DeployError::missing_file(&request.compose_file));
        }
        if !request.env_file.is_file() {
            return Err(DeployError::missing_file(&request.env_file));
        }

        let mut cmd = self
            .command()
            .arg("-f")
            .arg(request.compose_file.to_string_lossy())
            .arg("--project-directory")
            .arg(request.project_dir.to_string_lossy())
            .current_dir(&request.project_dir);

        if self.supports_env_file {
            cmd = cmd.arg("--env-file").arg(request.env_file.to_string_lossy());
        } else {
            let vars = dotenvy::from_path_iter(&request.env_file)
                .map_err(|e| DeployError::Config(format!("{}: {}", request.env_file.display(), e)))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| DeployError::Config(format!("{}: {}", request.env_file.display(), e)))?;
            cmd = cmd.envs(vars);
        }

        let out = cmd.arg("config").run().await?;
        Ok(out.stdout)
    }
}

/// Extra edits applied to a rendered document before deploying it.
#[derive(Debug, Clone, Default)]
pub struct Finalize {
    /// Apply the no-proxy rewrite with these ports.
    pub no_proxy: Option<NoProxyPorts>,
    /// External network the db service joins.
    pub backup_network: Option<String>,
}

/// Reshape a rendered document for `docker stack deploy`.
pub fn finalize_rendered(rendered: &str, finalize: &Finalize) -> DeployResult<String> {
    let mut doc: serde_yaml::Value = serde_yaml::from_str(rendered)?;
    normalize_for_stack(&mut doc);
    if let Some(ports) = &finalize.no_proxy {
        apply_no_proxy(&mut doc, ports)?;
    }
    if let Some(network) = &finalize.backup_network {
        attach_external_network(&mut doc, "db", network)?;
    }
    Ok(serde_yaml::to_string(&doc)?)
}
