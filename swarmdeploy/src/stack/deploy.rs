//! Render and deploy the stack.

use std::io::Write;

use swarmdeploy_shared::constants::env_keys as keys;
use swarmdeploy_shared::{DeployError, DeployResult};

use super::data_root::prepare_data_root;
use crate::compose::{self, Finalize, NoProxyPorts};
use crate::docker::{ComposeRenderRequest, DockerEngine};
use crate::env::{EnvFile, ProxyType, StackSettings};
use crate::layout::ProjectLayout;
use crate::options::DeployOptions;
use crate::secrets::SecretManager;

#[derive(Debug, Clone)]
pub struct DeployReport {
    pub stack: String,
    pub proxy_type: ProxyType,
    /// Placeholder secrets created for disabled integrations.
    pub placeholders: Vec<String>,
}

/// Deploy the project's stack.
///
/// Pipeline: load `.env`, prepare the data root, verify required secrets,
/// create disabled placeholders, check the Traefik network (traefik mode) and
/// the backup network (when enabled), render through `compose config`, apply
/// the no-proxy rewrite (none mode), attach the db service to the backup
/// network, then `docker stack deploy` from a temp file next to the stack file.
/// Any failure before the last step leaves the running deployment alone.
pub async fn deploy(
    engine: &dyn DockerEngine,
    layout: &ProjectLayout,
    options: &DeployOptions,
) -> DeployResult<DeployReport> {
    let env_path = layout.env_file();
    let env = EnvFile::load(&env_path)?;
    let settings = StackSettings::from_env(&env, layout.root())?;

    let stack_file = layout.stack_file();
    if !stack_file.is_file() {
        return Err(DeployError::missing_file(stack_file));
    }

    prepare_data_root(layout, &settings)?;

    let secrets = SecretManager::new(engine, options);
    let check = secrets.check_required().await?;
    if !check.is_complete() {
        return Err(DeployError::precondition_with_hint(
            format!("missing required secrets: {}", check.missing.join(", ")),
            "create them with `swarmdeploy secrets create` or `swarmdeploy secrets from-file`",
        ));
    }
    let placeholders = secrets.ensure_disabled_placeholders(&settings).await?;

    if settings.proxy_type == ProxyType::Traefik
        && !engine.network_exists(&settings.traefik_network).await?
    {
        return Err(DeployError::precondition_with_hint(
            format!("Traefik network '{}' does not exist", settings.traefik_network),
            format!(
                "deploy Traefik first or create it: docker network create --driver overlay --attachable {}",
                settings.traefik_network
            ),
        ));
    }

    if settings.backup_network_enabled
        && !engine.network_exists(&settings.backup_network).await?
    {
        return Err(DeployError::precondition_with_hint(
            format!("backup network '{}' does not exist", settings.backup_network),
            format!(
                "create it with `docker network create --driver overlay --attachable {}` or set {}=false",
                settings.backup_network,
                keys::ENABLE_BACKUP_NETWORK
            ),
        ));
    }

    let rendered = engine
        .compose_config(&ComposeRenderRequest::new(&stack_file, &env_path, layout.root()))
        .await?;
    let finalize = Finalize {
        no_proxy: match settings.proxy_type {
            ProxyType::None => Some(NoProxyPorts::from_settings(&settings)),
            ProxyType::Traefik => None,
        },
        backup_network: settings
            .backup_network_enabled
            .then(|| settings.backup_network.clone()),
    };
    let document = compose::finalize_rendered(&rendered, &finalize)?;

    // dropped (and deleted) on every path out of this function
    let mut tmp = tempfile::Builder::new()
        .prefix(".swarm-stack.")
        .suffix(".rendered.yml")
        .tempfile_in(layout.root())?;
    tmp.write_all(document.as_bytes())?;
    tmp.flush()?;

    tracing::info!(stack = %settings.stack_name, proxy = %settings.proxy_type, "Deploying stack");
    engine.stack_deploy(&settings.stack_name, tmp.path()).await?;

    Ok(DeployReport {
        stack: settings.stack_name,
        proxy_type: settings.proxy_type,
        placeholders,
    })
}
