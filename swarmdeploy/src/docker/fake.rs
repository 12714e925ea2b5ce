//! In-memory [`DockerEngine`] for tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use swarmdeploy_shared::{DeployError, DeployResult};

use super::{
    ComposeRenderRequest, DockerEngine, ExecOutput, SecretSummary, ServiceSummary, StackSummary,
    SwarmInfo, TaskSummary,
};
use crate::env::EnvFile;

type ExecHandler = Box<dyn FnMut(&[String], Option<&[u8]>) -> ExecOutput + Send>;

static VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z0-9_]+)(?::-([^}]*))?\}").unwrap());

#[derive(Default)]
pub(crate) struct FakeState {
    pub swarm: SwarmInfo,
    pub secrets: BTreeMap<String, Vec<u8>>,
    /// stack name -> service names (unqualified)
    pub stacks: BTreeMap<String, Vec<String>>,
    pub tasks: BTreeMap<String, Vec<TaskSummary>>,
    /// network name -> id
    pub networks: BTreeMap<String, String>,
    /// stack -> remaining polls before its networks disappear
    pub lingering: BTreeMap<String, u32>,
    pub network_linger_polls: u32,
    /// service -> network targets
    pub service_networks: BTreeMap<String, Vec<String>>,
    pub containers: BTreeMap<String, Vec<String>>,
    pub logs: BTreeMap<String, String>,
    pub scaled: BTreeMap<String, u32>,
    pub images: BTreeMap<String, String>,
    pub rolled_back: Vec<String>,
    /// (stack, compose document) per deploy
    pub deployed: Vec<(String, String)>,
    pub calls: Vec<String>,
    pub failing: BTreeSet<&'static str>,
    pub exec: Option<ExecHandler>,
}

pub(crate) struct FakeEngine {
    pub state: Mutex<FakeState>,
}

impl FakeEngine {
    /// Engine whose node is an active Swarm manager.
    pub fn new() -> Self {
        let state = FakeState {
            swarm: SwarmInfo {
                server_version: "27.0.3".into(),
                node_id: "node-1".into(),
                local_node_state: "active".into(),
                control_available: true,
                error: String::new(),
            },
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn with_secret(self, name: &str, value: &str) -> Self {
        self.state
            .lock()
            .secrets
            .insert(name.into(), value.as_bytes().to_vec());
        self
    }

    pub fn with_stack(self, stack: &str, services: &[&str]) -> Self {
        {
            let mut state = self.state.lock();
            state.stacks.insert(
                stack.into(),
                services.iter().map(|s| s.to_string()).collect(),
            );
        }
        self
    }

    pub fn with_network(self, name: &str) -> Self {
        self.state
            .lock()
            .networks
            .insert(name.into(), format!("net-{}", name));
        self
    }

    pub fn failing(self, op: &'static str) -> Self {
        self.state.lock().failing.insert(op);
        self
    }

    pub fn secret_value(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .secrets
            .get(name)
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, op: &'static str, detail: &str) -> DeployResult<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("{} {}", op, detail).trim_end().to_string());
        if state.failing.contains(op) {
            return Err(DeployError::CommandFailed {
                command: format!("docker {}", op),
                code: Some(1),
                stderr: format!("{} failed", op),
            });
        }
        Ok(())
    }
}

fn substitute(content: &str, env: &EnvFile) -> String {
    VAR.replace_all(content, |caps: &regex::Captures<'_>| {
        let key = &caps[1];
        env.get_non_empty(key)
            .map(str::to_string)
            .or_else(|| caps.get(2).map(|m| m.as_str().to_string()))
            .unwrap_or_default()
    })
    .into_owned()
}

#[async_trait]
impl DockerEngine for FakeEngine {
    async fn info(&self) -> DeployResult<SwarmInfo> {
        self.record("info", "")?;
        Ok(self.state.lock().swarm.clone())
    }

    async fn secret_list(&self) -> DeployResult<Vec<SecretSummary>> {
        self.record("secret_list", "")?;
        Ok(self
            .state
            .lock()
            .secrets
            .keys()
            .map(|name| SecretSummary {
                id: format!("id-{}", name),
                name: name.clone(),
                ..Default::default()
            })
            .collect())
    }

    async fn secret_create(&self, name: &str, value: &[u8]) -> DeployResult<()> {
        self.record("secret_create", name)?;
        let mut state = self.state.lock();
        if state.secrets.contains_key(name) {
            return Err(DeployError::CommandFailed {
                command: format!("docker secret create {} -", name),
                code: Some(1),
                stderr: format!("secret {} already exists", name),
            });
        }
        state.secrets.insert(name.into(), value.to_vec());
        Ok(())
    }

    async fn secret_remove(&self, name: &str) -> DeployResult<()> {
        self.record("secret_remove", name)?;
        self.state.lock().secrets.remove(name);
        Ok(())
    }

    async fn stack_list(&self) -> DeployResult<Vec<StackSummary>> {
        self.record("stack_list", "")?;
        Ok(self
            .state
            .lock()
            .stacks
            .iter()
            .map(|(name, services)| StackSummary {
                name: name.clone(),
                services: services.len().to_string(),
            })
            .collect())
    }

    async fn stack_services(&self, stack: &str) -> DeployResult<Vec<ServiceSummary>> {
        self.record("stack_services", stack)?;
        self.service_list(stack).await
    }

    async fn stack_tasks(&self, stack: &str) -> DeployResult<Vec<TaskSummary>> {
        self.record("stack_tasks", stack)?;
        Ok(self.state.lock().tasks.get(stack).cloned().unwrap_or_default())
    }

    async fn stack_deploy(&self, stack: &str, compose_file: &Path) -> DeployResult<()> {
        self.record("stack_deploy", stack)?;
        let content = std::fs::read_to_string(compose_file)?;
        let doc: serde_yaml::Value = serde_yaml::from_str(&content)?;
        let services = doc
            .get("services")
            .and_then(|s| s.as_mapping())
            .map(|m| {
                m.keys()
                    .filter_map(|k| k.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let mut state = self.state.lock();
        state.stacks.insert(stack.into(), services);
        state.lingering.remove(stack);
        state.deployed.push((stack.into(), content));
        Ok(())
    }

    async fn stack_remove(&self, stack: &str) -> DeployResult<()> {
        self.record("stack_remove", stack)?;
        let mut state = self.state.lock();
        state.stacks.remove(stack);
        let polls = state.network_linger_polls;
        state.lingering.insert(stack.into(), polls);
        Ok(())
    }

    async fn network_id(&self, name: &str) -> DeployResult<Option<String>> {
        self.record("network_id", name)?;
        Ok(self.state.lock().networks.get(name).cloned())
    }

    async fn stack_networks(&self, stack: &str) -> DeployResult<Vec<String>> {
        self.record("stack_networks", stack)?;
        let mut state = self.state.lock();
        if state.stacks.contains_key(stack) {
            return Ok(vec![format!("{}_backend", stack)]);
        }
        match state.lingering.get_mut(stack) {
            Some(0) | None => Ok(Vec::new()),
            Some(left) => {
                *left -= 1;
                Ok(vec![format!("{}_backend", stack)])
            }
        }
    }

    async fn service_list(&self, namespace: &str) -> DeployResult<Vec<ServiceSummary>> {
        let state = self.state.lock();
        Ok(state
            .stacks
            .get(namespace)
            .map(|services| {
                services
                    .iter()
                    .map(|svc| {
                        let name = format!("{}_{}", namespace, svc);
                        let replicas = state.scaled.get(&name).copied().unwrap_or(1);
                        ServiceSummary {
                            id: format!("svc-{}", name),
                            image: state.images.get(&name).cloned().unwrap_or_default(),
                            replicas: format!("{}/{}", replicas, replicas),
                            mode: "replicated".into(),
                            name,
                            ..Default::default()
                        }
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn service_logs(
        &self,
        service: &str,
        _since: Option<&str>,
        _tail: Option<u32>,
    ) -> DeployResult<String> {
        self.record("service_logs", service)?;
        Ok(self.state.lock().logs.get(service).cloned().unwrap_or_default())
    }

    async fn service_scale(&self, service: &str, replicas: u32) -> DeployResult<()> {
        self.record("service_scale", &format!("{}={}", service, replicas))?;
        self.state.lock().scaled.insert(service.into(), replicas);
        Ok(())
    }

    async fn service_update_image(&self, service: &str, image: &str) -> DeployResult<()> {
        self.record("service_update_image", &format!("{} {}", service, image))?;
        self.state.lock().images.insert(service.into(), image.into());
        Ok(())
    }

    async fn service_rollback(&self, service: &str) -> DeployResult<()> {
        self.record("service_rollback", service)?;
        self.state.lock().rolled_back.push(service.into());
        Ok(())
    }

    async fn service_network_add(&self, service: &str, network: &str) -> DeployResult<()> {
        self.record("service_network_add", &format!("{} {}", service, network))?;
        let mut state = self.state.lock();
        let target = state
            .networks
            .get(network)
            .cloned()
            .unwrap_or_else(|| network.to_string());
        state
            .service_networks
            .entry(service.into())
            .or_default()
            .push(target);
        Ok(())
    }

    async fn service_network_remove(&self, service: &str, network: &str) -> DeployResult<()> {
        self.record("service_network_remove", &format!("{} {}", service, network))?;
        let mut state = self.state.lock();
        let id = state.networks.get(network).cloned();
        if let Some(targets) = state.service_networks.get_mut(service) {
            targets.retain(|t| t != network && Some(t) != id.as_ref());
        }
        Ok(())
    }

    async fn service_network_targets(&self, service: &str) -> DeployResult<Vec<String>> {
        self.record("service_network_targets", service)?;
        Ok(self
            .state
            .lock()
            .service_networks
            .get(service)
            .cloned()
            .unwrap_or_default())
    }

    async fn service_containers(&self, service: &str) -> DeployResult<Vec<String>> {
        self.record("service_containers", service)?;
        Ok(self
            .state
            .lock()
            .containers
            .get(service)
            .cloned()
            .unwrap_or_default())
    }

    async fn container_exec(
        &self,
        container: &str,
        cmd: &[String],
        stdin: Option<&[u8]>,
    ) -> DeployResult<ExecOutput> {
        self.record("container_exec", container)?;
        let mut state = self.state.lock();
        match state.exec.as_mut() {
            Some(handler) => Ok(handler(cmd, stdin)),
            None => Ok(ExecOutput {
                code: Some(0),
                ..Default::default()
            }),
        }
    }

    async fn compose_config(&self, request: &ComposeRenderRequest) -> DeployResult<String> {
        self.record("compose_config", &request.compose_file.display().to_string())?;
        let content = std::fs::read_to_string(&request.compose_file)?;
        let env = EnvFile::load(&request.env_file)?;
        let mut doc: serde_yaml::Value = serde_yaml::from_str(&substitute(&content, &env))?;
        // compose config adds the project name
        if let Some(root) = doc.as_mapping_mut() {
            root.insert("name".into(), "statechecker".into());
        }
        Ok(serde_yaml::to_string(&doc)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_defaults() {
        let env = EnvFile::parse("A=1\nEMPTY=\n");
        assert_eq!(
            substitute("${A} ${EMPTY:-x} ${MISSING:-8787} ${MISSING}", &env),
            "1 x 8787 "
        );
    }

    #[tokio::test]
    async fn test_networks_linger_after_remove() {
        let engine = FakeEngine::new().with_stack("sc", &["api"]);
        engine.state.lock().network_linger_polls = 2;
        engine.stack_remove("sc").await.unwrap();
        assert_eq!(engine.stack_networks("sc").await.unwrap().len(), 1);
        assert_eq!(engine.stack_networks("sc").await.unwrap().len(), 1);
        assert!(engine.stack_networks("sc").await.unwrap().is_empty());
    }
}
