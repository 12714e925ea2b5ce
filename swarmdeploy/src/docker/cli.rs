//! [`DockerEngine`] over the `docker` command-line client.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use swarmdeploy_shared::constants::labels;
use swarmdeploy_shared::{DeployError, DeployResult};

use super::command::{DockerCommand, ExecOutput};
use super::{
    ComposeRenderRequest, DockerEngine, SecretSummary, ServiceSummary, StackSummary, SwarmInfo,
    TaskSummary,
};
use crate::compose::ComposeTool;

const JSON_FORMAT: &str = "{{json .}}";

/// Talks to the Docker daemon through the `docker` binary.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: PathBuf,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn cmd(&self) -> DockerCommand {
        DockerCommand::new(&self.binary)
    }

    /// `docker stack deploy` without `--detach`, which engines before 26 reject.
    fn stack_deploy_command(&self, stack: &str, compose_file: &Path) -> DockerCommand {
        self.cmd()
            .args(["stack", "deploy", "--with-registry-auth", "-c"])
            .arg(compose_file.to_string_lossy())
            .arg(stack)
    }

    /// Run and decode one JSON document per output line.
    async fn json_lines<T: DeserializeOwned>(&self, cmd: DockerCommand) -> DeployResult<Vec<T>> {
        let out = cmd.run().await?;
        parse_json_lines(&out.stdout)
    }
}

pub(crate) fn parse_json_lines<T: DeserializeOwned>(stdout: &str) -> DeployResult<Vec<T>> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            serde_json::from_str(l).map_err(|e| {
                DeployError::Internal(format!("unexpected docker output '{}': {}", l, e))
            })
        })
        .collect()
}

#[derive(Deserialize)]
struct InfoDoc {
    #[serde(rename = "ServerVersion", default)]
    server_version: String,
    #[serde(rename = "Swarm", default)]
    swarm: SwarmInfo,
}

#[derive(Deserialize)]
struct NetworkLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Deserialize)]
struct NetworkAttachment {
    #[serde(rename = "Target")]
    target: String,
}

#[async_trait]
impl DockerEngine for DockerCli {
    async fn info(&self) -> DeployResult<SwarmInfo> {
        let out = self.cmd().args(["info", "--format", JSON_FORMAT]).run().await?;
        let doc: InfoDoc = serde_json::from_str(out.stdout.trim())?;
        Ok(SwarmInfo {
            server_version: doc.server_version,
            ..doc.swarm
        })
    }

    async fn secret_list(&self) -> DeployResult<Vec<SecretSummary>> {
        self.json_lines(self.cmd().args(["secret", "ls", "--format", JSON_FORMAT]))
            .await
    }

    async fn secret_exists(&self, name: &str) -> DeployResult<bool> {
        let out = self
            .cmd()
            .args(["secret", "inspect", "--format", "{{.Spec.Name}}", name])
            .output()
            .await?;
        Ok(out.success() && out.stdout.trim() == name)
    }

    async fn secret_create(&self, name: &str, value: &[u8]) -> DeployResult<()> {
        self.cmd()
            .args(["secret", "create", name, "-"])
            .stdin(value.to_vec())
            .run()
            .await?;
        tracing::info!(secret = name, "Created secret");
        Ok(())
    }

    async fn secret_remove(&self, name: &str) -> DeployResult<()> {
        self.cmd().args(["secret", "rm", name]).run().await?;
        tracing::info!(secret = name, "Removed secret");
        Ok(())
    }

    async fn stack_list(&self) -> DeployResult<Vec<StackSummary>> {
        self.json_lines(self.cmd().args(["stack", "ls", "--format", JSON_FORMAT]))
            .await
    }

    async fn stack_services(&self, stack: &str) -> DeployResult<Vec<ServiceSummary>> {
        self.json_lines(
            self.cmd()
                .args(["stack", "services", stack, "--format", JSON_FORMAT]),
        )
        .await
    }

    async fn stack_tasks(&self, stack: &str) -> DeployResult<Vec<TaskSummary>> {
        self.json_lines(self.cmd().args([
            "stack",
            "ps",
            stack,
            "--no-trunc",
            "--format",
            JSON_FORMAT,
        ]))
        .await
    }

    async fn stack_deploy(&self, stack: &str, compose_file: &Path) -> DeployResult<()> {
        self.stack_deploy_command(stack, compose_file).run().await?;
        Ok(())
    }

    async fn stack_remove(&self, stack: &str) -> DeployResult<()> {
        self.cmd().args(["stack", "rm", stack]).run().await?;
        Ok(())
    }

    async fn network_id(&self, name: &str) -> DeployResult<Option<String>> {
        let filter = format!("name={}", name);
        let networks: Vec<NetworkLine> = self
            .json_lines(self.cmd().args([
                "network",
                "ls",
                "--no-trunc",
                "--filter",
                &filter,
                "--format",
                JSON_FORMAT,
            ]))
            .await?;
        // the name filter matches substrings
        Ok(networks.into_iter().find(|n| n.name == name).map(|n| n.id))
    }

    async fn stack_networks(&self, stack: &str) -> DeployResult<Vec<String>> {
        let filter = format!("label={}={}", labels::STACK_NAMESPACE, stack);
        let networks: Vec<NetworkLine> = self
            .json_lines(self.cmd().args([
                "network",
                "ls",
                "--filter",
                &filter,
                "--format",
                JSON_FORMAT,
            ]))
            .await?;
        Ok(networks.into_iter().map(|n| n.name).collect())
    }

    async fn service_list(&self, namespace: &str) -> DeployResult<Vec<ServiceSummary>> {
        let filter = format!("label={}={}", labels::STACK_NAMESPACE, namespace);
        self.json_lines(self.cmd().args([
            "service",
            "ls",
            "--filter",
            &filter,
            "--format",
            JSON_FORMAT,
        ]))
        .await
    }

    async fn service_logs(
        &self,
        service: &str,
        since: Option<&str>,
        tail: Option<u32>,
    ) -> DeployResult<String> {
        let mut cmd = self
            .cmd()
            .args(["service", "logs", "--no-task-ids", "--timestamps"]);
        if let Some(since) = since {
            cmd = cmd.arg("--since").arg(since);
        }
        if let Some(n) = tail {
            cmd = cmd.arg("--tail").arg(n.to_string());
        }
        let out = cmd.arg(service).run().await?;
        // task stderr is forwarded on docker's stderr
        let mut logs = out.stdout;
        logs.push_str(&out.stderr);
        Ok(logs)
    }

    async fn service_scale(&self, service: &str, replicas: u32) -> DeployResult<()> {
        self.cmd()
            .args(["service", "scale", "--detach"])
            .arg(format!("{}={}", service, replicas))
            .run()
            .await?;
        Ok(())
    }

    async fn service_update_image(&self, service: &str, image: &str) -> DeployResult<()> {
        self.cmd()
            .args(["service", "update", "--with-registry-auth", "--image", image, service])
            .run()
            .await?;
        Ok(())
    }

    async fn service_rollback(&self, service: &str) -> DeployResult<()> {
        self.cmd().args(["service", "rollback", service]).run().await?;
        Ok(())
    }

    async fn service_network_add(&self, service: &str, network: &str) -> DeployResult<()> {
        self.cmd()
            .args(["service", "update", "--detach", "--network-add", network, service])
            .run()
            .await?;
        Ok(())
    }

    async fn service_network_remove(&self, service: &str, network: &str) -> DeployResult<()> {
        self.cmd()
            .args(["service", "update", "--detach", "--network-rm", network, service])
            .run()
            .await?;
        Ok(())
    }

    async fn service_network_targets(&self, service: &str) -> DeployResult<Vec<String>> {
        let out = self
            .cmd()
            .args([
                "service",
                "inspect",
                "--format",
                "{{json .Spec.TaskTemplate.Networks}}",
                service,
            ])
            .run()
            .await?;
        let attachments: Option<Vec<NetworkAttachment>> = serde_json::from_str(out.stdout.trim())?;
        Ok(attachments
            .unwrap_or_default()
            .into_iter()
            .map(|a| a.target)
            .collect())
    }

    async fn service_containers(&self, service: &str) -> DeployResult<Vec<String>> {
        let filter = format!("label={}={}", labels::SWARM_SERVICE_NAME, service);
        let out = self
            .cmd()
            .args(["ps", "--filter", &filter, "--format", "{{.ID}}"])
            .run()
            .await?;
        Ok(out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn container_exec(
        &self,
        container: &str,
        cmd: &[String],
        stdin: Option<&[u8]>,
    ) -> DeployResult<ExecOutput> {
        let mut exec = self.cmd().args(["exec", "-i", container]).args(cmd);
        if let Some(input) = stdin {
            exec = exec.stdin(input.to_vec());
        }
        exec.output().await
    }

    async fn compose_config(&self, request: &ComposeRenderRequest) -> DeployResult<String> {
        ComposeTool::detect(&self.binary).await?.render(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_lines_skips_blanks() {
        let out = "{\"ID\":\"a1\",\"Name\":\"DB_PW\",\"CreatedAt\":\"x\",\"UpdatedAt\":\"y\"}\n\n";
        let secrets: Vec<SecretSummary> = parse_json_lines(out).unwrap();
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].name, "DB_PW");
    }

    #[test]
    fn test_parse_json_lines_reports_bad_line() {
        let err = parse_json_lines::<StackSummary>("not json\n").unwrap_err();
        assert!(err.to_string().contains("not json"));
    }

    #[test]
    fn test_stack_deploy_works_on_older_engines() {
        let cmd = DockerCli::default()
            .stack_deploy_command("statechecker", Path::new("/srv/sc/.swarm-stack.rendered.yml"));
        assert_eq!(
            cmd.display(),
            "docker stack deploy --with-registry-auth -c /srv/sc/.swarm-stack.rendered.yml statechecker"
        );
        assert!(!cmd.display().contains("--detach"));
    }

    #[test]
    fn test_info_doc_merges_version() {
        let doc: InfoDoc = serde_json::from_str(
            r#"{"ServerVersion":"27.1.1","Swarm":{"NodeID":"n","LocalNodeState":"inactive","ControlAvailable":false,"Error":""}}"#,
        )
        .unwrap();
        let info = SwarmInfo {
            server_version: doc.server_version,
            ..doc.swarm
        };
        assert_eq!(info.server_version, "27.1.1");
        assert!(!info.is_active());
    }
}
