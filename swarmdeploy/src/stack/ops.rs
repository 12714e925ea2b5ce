//! Day-2 operations on a deployed stack.

use swarmdeploy_shared::constants::env_keys as keys;
use swarmdeploy_shared::{DeployError, DeployResult};

use crate::docker::DockerEngine;
use crate::env::{Component, EnvFile, StackSettings};

#[derive(Debug, Clone, Default)]
pub struct RollbackReport {
    pub rolled_back: Vec<String>,
    /// `(service, error)` for services Swarm refused to roll back.
    pub failed: Vec<(String, String)>,
}

/// Roll every service of `stack` back to its previous spec.
///
/// Services without a previous spec (never updated) are reported, not fatal.
pub async fn rollback(engine: &dyn DockerEngine, stack: &str) -> DeployResult<RollbackReport> {
    let services = engine.service_list(stack).await?;
    if services.is_empty() {
        return Err(DeployError::StackNotFound(stack.to_string()));
    }

    let mut report = RollbackReport::default();
    for service in services {
        match engine.service_rollback(&service.name).await {
            Ok(()) => {
                tracing::info!(service = %service.name, "Rolled back");
                report.rolled_back.push(service.name);
            }
            Err(e) => {
                tracing::warn!(service = %service.name, error = %e, "Rollback failed");
                report.failed.push((service.name, e.to_string()));
            }
        }
    }
    Ok(report)
}

/// Scale one component and persist the replica count to `.env`.
pub async fn scale(
    engine: &dyn DockerEngine,
    env: &mut EnvFile,
    settings: &StackSettings,
    component: Component,
    replicas: u32,
) -> DeployResult<()> {
    if !settings.is_included(component) {
        return Err(DeployError::InvalidInput(format!(
            "{} is not enabled in this deployment",
            component.service_name()
        )));
    }
    engine
        .service_scale(&settings.service(component.service_name()), replicas)
        .await?;
    env.set(component.replicas_key(), replicas.to_string());
    env.save()?;
    tracing::info!(component = component.service_name(), replicas, "Scaled");
    Ok(())
}

/// Persist `IMAGE_VERSION` and roll the api and check services onto it.
pub async fn update_image(
    engine: &dyn DockerEngine,
    env: &mut EnvFile,
    settings: &StackSettings,
    version: &str,
) -> DeployResult<String> {
    let version = version.trim();
    if version.is_empty() || version.contains(char::is_whitespace) || version.contains(':') {
        return Err(DeployError::InvalidInput(format!(
            "'{}' is not a valid image tag",
            version
        )));
    }

    env.set(keys::IMAGE_VERSION, version);
    env.save()?;

    let image = format!("{}:{}", settings.image_name, version);
    for component in [Component::Api, Component::Check] {
        let service = settings.service(component.service_name());
        tracing::info!(service = %service, image = %image, "Updating image");
        engine.service_update_image(&service, &image).await?;
    }
    Ok(image)
}
