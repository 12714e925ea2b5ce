//! Observational health report for a deployed stack.

use std::time::Duration;

use serde::Serialize;
use swarmdeploy_shared::{DeployError, DeployResult};

use crate::docker::{DockerEngine, ServiceSummary, TaskSummary};
use crate::env::{Component, ProxyType, StackSettings};

#[derive(Debug, Clone)]
pub struct HealthRequest {
    pub stack: String,
    /// Pause before looking, to let a fresh deploy settle.
    pub wait: Duration,
    pub logs_since: Option<String>,
    pub logs_tail: Option<u32>,
    pub include_logs: bool,
}

impl HealthRequest {
    pub fn new(stack: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            wait: Duration::ZERO,
            logs_since: None,
            logs_tail: Some(50),
            include_logs: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Endpoint {
    pub service: &'static str,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceLogs {
    pub service: String,
    pub logs: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub stack: String,
    pub services: Vec<ServiceSummary>,
    pub tasks: Vec<TaskSummary>,
    pub failed_tasks: usize,
    pub endpoints: Vec<Endpoint>,
    pub logs: Vec<ServiceLogs>,
}

impl HealthReport {
    /// Failed tasks or services below their desired replica count.
    pub fn is_degraded(&self) -> bool {
        self.failed_tasks > 0 || self.services.iter().any(|s| !s.is_converged())
    }
}

/// Collect services, tasks, endpoints and logs for a stack.
///
/// Only a missing stack is an error; a degraded one is reported.
pub async fn run_health_check(
    engine: &dyn DockerEngine,
    request: &HealthRequest,
    settings: &StackSettings,
) -> DeployResult<HealthReport> {
    if !request.wait.is_zero() {
        tracing::info!(seconds = request.wait.as_secs(), "Waiting before health check");
        tokio::time::sleep(request.wait).await;
    }

    let stacks = engine.stack_list().await?;
    if !stacks.iter().any(|s| s.name == request.stack) {
        return Err(DeployError::StackNotFound(request.stack.clone()));
    }

    let services = engine.stack_services(&request.stack).await?;
    let tasks = engine.stack_tasks(&request.stack).await?;
    let failed_tasks = tasks.iter().filter(|t| t.is_failed()).count();
    if failed_tasks > 0 {
        tracing::warn!(stack = %request.stack, failed_tasks, "Stack has failed or rejected tasks");
    }

    let mut logs = Vec::new();
    if request.include_logs {
        for service in engine.service_list(&request.stack).await? {
            let text = engine
                .service_logs(
                    &service.name,
                    request.logs_since.as_deref(),
                    request.logs_tail,
                )
                .await?;
            logs.push(ServiceLogs {
                service: service.name,
                logs: text,
            });
        }
    }

    Ok(HealthReport {
        stack: request.stack.clone(),
        services,
        tasks,
        failed_tasks,
        endpoints: endpoints(settings),
        logs,
    })
}

/// Public URLs of the HTTP services that are enabled and scaled above zero.
pub fn endpoints(settings: &StackSettings) -> Vec<Endpoint> {
    let candidates = [
        (Component::Api, settings.api_port, settings.api_url.as_deref()),
        (Component::Web, settings.web_port, settings.web_url.as_deref()),
        (
            Component::Phpmyadmin,
            settings.phpmyadmin_port,
            settings.phpmyadmin_url.as_deref(),
        ),
    ];

    candidates
        .into_iter()
        .filter(|(component, _, _)| {
            settings.is_included(*component) && settings.replicas(*component) > 0
        })
        .filter_map(|(component, port, url)| {
            let url = match settings.proxy_type {
                ProxyType::None => format!("http://localhost:{}", port),
                ProxyType::Traefik => format!("https://{}", url?),
            };
            Some(Endpoint {
                service: component.service_name(),
                url,
            })
        })
        .collect()
}
