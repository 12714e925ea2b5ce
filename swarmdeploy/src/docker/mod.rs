//! Docker engine seam.
//!
//! Everything the toolkit asks of Docker goes through [`DockerEngine`].
//! [`DockerCli`] implements it by shelling out to the `docker` binary and
//! decoding `--format '{{json .}}'` output; tests use an in-memory fake.

mod cli;
mod command;
#[cfg(test)]
pub(crate) mod fake;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swarmdeploy_shared::DeployResult;

pub use cli::DockerCli;
pub use command::{DockerCommand, ExecOutput};

/// `docker info` subset: daemon version and Swarm membership.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwarmInfo {
    #[serde(rename = "ServerVersion", default)]
    pub server_version: String,
    #[serde(rename = "NodeID", default)]
    pub node_id: String,
    /// `inactive`, `pending`, `active`, `error` or `locked`.
    #[serde(rename = "LocalNodeState", default)]
    pub local_node_state: String,
    #[serde(rename = "ControlAvailable", default)]
    pub control_available: bool,
    #[serde(rename = "Error", default)]
    pub error: String,
}

impl SwarmInfo {
    pub fn is_active(&self) -> bool {
        self.local_node_state == "active"
    }
}

/// One line of `docker stack ls`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct StackSummary {
    pub name: String,
    /// Service count as printed by docker (a string).
    #[serde(default)]
    pub services: String,
}

impl StackSummary {
    pub fn service_count(&self) -> u32 {
        self.services.trim().parse().unwrap_or(0)
    }
}

/// One line of `docker service ls` / `docker stack services`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceSummary {
    #[serde(rename = "ID", default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mode: String,
    /// `running/desired`, e.g. `1/1`.
    #[serde(default)]
    pub replicas: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub ports: String,
}

impl ServiceSummary {
    /// Parsed `(running, desired)` replica counts.
    pub fn replica_counts(&self) -> Option<(u32, u32)> {
        // global services print e.g. "1/1 (max 1 per node)"
        let head = self.replicas.split_whitespace().next()?;
        let (running, desired) = head.split_once('/')?;
        Some((running.parse().ok()?, desired.parse().ok()?))
    }

    pub fn is_converged(&self) -> bool {
        matches!(self.replica_counts(), Some((r, d)) if r == d)
    }
}

/// One line of `docker stack ps`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct TaskSummary {
    #[serde(rename = "ID", default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub node: String,
    #[serde(default)]
    pub desired_state: String,
    /// e.g. `Running 2 hours ago`, `Failed 3 minutes ago`.
    #[serde(default)]
    pub current_state: String,
    #[serde(default)]
    pub error: String,
}

impl TaskSummary {
    pub fn is_failed(&self) -> bool {
        let state = self.current_state.trim_start();
        state.starts_with("Failed") || state.starts_with("Rejected")
    }
}

/// One line of `docker secret ls`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SecretSummary {
    #[serde(rename = "ID", default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Input for `docker compose config`.
#[derive(Debug, Clone)]
pub struct ComposeRenderRequest {
    pub compose_file: PathBuf,
    pub env_file: PathBuf,
    pub project_dir: PathBuf,
}

impl ComposeRenderRequest {
    pub fn new(compose_file: &Path, env_file: &Path, project_dir: &Path) -> Self {
        Self {
            compose_file: compose_file.to_path_buf(),
            env_file: env_file.to_path_buf(),
            project_dir: project_dir.to_path_buf(),
        }
    }
}

#[async_trait]
pub trait DockerEngine: Send + Sync {
    async fn info(&self) -> DeployResult<SwarmInfo>;

    async fn secret_list(&self) -> DeployResult<Vec<SecretSummary>>;

    async fn secret_exists(&self, name: &str) -> DeployResult<bool> {
        Ok(self.secret_list().await?.iter().any(|s| s.name == name))
    }

    /// Create a secret; the value is passed on stdin, never on the command line.
    async fn secret_create(&self, name: &str, value: &[u8]) -> DeployResult<()>;

    async fn secret_remove(&self, name: &str) -> DeployResult<()>;

    async fn stack_list(&self) -> DeployResult<Vec<StackSummary>>;

    async fn stack_services(&self, stack: &str) -> DeployResult<Vec<ServiceSummary>>;

    async fn stack_tasks(&self, stack: &str) -> DeployResult<Vec<TaskSummary>>;

    async fn stack_deploy(&self, stack: &str, compose_file: &Path) -> DeployResult<()>;

    async fn stack_remove(&self, stack: &str) -> DeployResult<()>;

    async fn network_exists(&self, name: &str) -> DeployResult<bool> {
        Ok(self.network_id(name).await?.is_some())
    }

    /// Full id of the network called `name`.
    async fn network_id(&self, name: &str) -> DeployResult<Option<String>>;

    /// Names of networks labelled with the stack namespace.
    async fn stack_networks(&self, stack: &str) -> DeployResult<Vec<String>>;

    /// Services labelled with the stack namespace.
    async fn service_list(&self, namespace: &str) -> DeployResult<Vec<ServiceSummary>>;

    /// Logs of every task of `service`; `since` is passed through to docker
    /// (e.g. `10m` or an RFC 3339 timestamp).
    async fn service_logs(
        &self,
        service: &str,
        since: Option<&str>,
        tail: Option<u32>,
    ) -> DeployResult<String>;

    async fn service_scale(&self, service: &str, replicas: u32) -> DeployResult<()>;

    async fn service_update_image(&self, service: &str, image: &str) -> DeployResult<()>;

    async fn service_rollback(&self, service: &str) -> DeployResult<()>;

    async fn service_network_add(&self, service: &str, network: &str) -> DeployResult<()>;

    async fn service_network_remove(&self, service: &str, network: &str) -> DeployResult<()>;

    /// Network targets (ids) in the service spec.
    async fn service_network_targets(&self, service: &str) -> DeployResult<Vec<String>>;

    /// Ids of running containers of `service` on this node.
    async fn service_containers(&self, service: &str) -> DeployResult<Vec<String>>;

    /// Run `cmd` inside a container. Non-zero exits are returned, not raised.
    async fn container_exec(
        &self,
        container: &str,
        cmd: &[String],
        stdin: Option<&[u8]>,
    ) -> DeployResult<ExecOutput>;

    /// Variable-substituted compose document for `request`.
    async fn compose_config(&self, request: &ComposeRenderRequest) -> DeployResult<String>;
}
