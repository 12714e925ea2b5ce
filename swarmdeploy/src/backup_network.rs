//! Attach the db service to an external backup network (and back).
//!
//! A backup stack running elsewhere in the swarm reaches MySQL over that
//! network. `docker service update` returns before the new spec is visible,
//! so both directions poll the service spec until the change shows up.

use swarmdeploy_shared::constants::env_keys as keys;
use swarmdeploy_shared::{DeployError, DeployResult};

use crate::docker::DockerEngine;
use crate::env::StackSettings;
use crate::options::PollSchedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Attached,
    AlreadyAttached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachOutcome {
    Detached,
    NotAttached,
}

struct Target {
    service: String,
    network: String,
    network_id: String,
}

async fn resolve(engine: &dyn DockerEngine, settings: &StackSettings) -> DeployResult<Target> {
    let network = settings.backup_network.clone();
    let network_id = engine.network_id(&network).await?.ok_or_else(|| {
        DeployError::precondition_with_hint(
            format!("backup network '{}' does not exist", network),
            format!(
                "create it with `docker network create --driver overlay --attachable {}` or set {}",
                network,
                keys::BACKUP_NETWORK_NAME
            ),
        )
    })?;
    Ok(Target {
        service: settings.service("db"),
        network,
        network_id,
    })
}

async fn is_attached(engine: &dyn DockerEngine, target: &Target) -> DeployResult<bool> {
    Ok(engine
        .service_network_targets(&target.service)
        .await?
        .iter()
        .any(|t| *t == target.network_id || *t == target.network))
}

async fn wait_for(
    engine: &dyn DockerEngine,
    target: &Target,
    attached: bool,
    schedule: PollSchedule,
) -> DeployResult<()> {
    for attempt in 1..=schedule.attempts {
        if is_attached(engine, target).await? == attached {
            return Ok(());
        }
        if attempt < schedule.attempts {
            tokio::time::sleep(schedule.interval).await;
        }
    }
    Err(DeployError::Timeout(format!(
        "{} did not {} network {} in time; check `docker service ps {}`",
        target.service,
        if attached { "join" } else { "leave" },
        target.network,
        target.service
    )))
}

/// Add the backup network to the db service and wait until the spec shows it.
pub async fn attach(
    engine: &dyn DockerEngine,
    settings: &StackSettings,
    schedule: PollSchedule,
) -> DeployResult<AttachOutcome> {
    if !settings.backup_network_enabled {
        return Err(DeployError::precondition_with_hint(
            "backup network integration is disabled",
            format!("set {}=true in .env", keys::ENABLE_BACKUP_NETWORK),
        ));
    }
    let target = resolve(engine, settings).await?;
    if is_attached(engine, &target).await? {
        tracing::info!(service = %target.service, network = %target.network, "Already attached");
        return Ok(AttachOutcome::AlreadyAttached);
    }

    engine
        .service_network_add(&target.service, &target.network)
        .await?;
    wait_for(engine, &target, true, schedule).await?;
    tracing::info!(service = %target.service, network = %target.network, "Attached backup network");
    Ok(AttachOutcome::Attached)
}

/// Remove the backup network from the db service.
pub async fn detach(
    engine: &dyn DockerEngine,
    settings: &StackSettings,
    schedule: PollSchedule,
) -> DeployResult<DetachOutcome> {
    let target = resolve(engine, settings).await?;
    if !is_attached(engine, &target).await? {
        return Ok(DetachOutcome::NotAttached);
    }

    engine
        .service_network_remove(&target.service, &target.network)
        .await?;
    wait_for(engine, &target, false, schedule).await?;
    tracing::info!(service = %target.service, network = %target.network, "Detached backup network");
    Ok(DetachOutcome::Detached)
}
