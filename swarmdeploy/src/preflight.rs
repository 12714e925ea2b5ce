//! Checks run before anything touches the Swarm.

use swarmdeploy_shared::{DeployError, DeployResult};

use crate::docker::{DockerEngine, SwarmInfo};

/// Docker must answer and this node must be an active Swarm member.
pub async fn check_engine(engine: &dyn DockerEngine) -> DeployResult<SwarmInfo> {
    let info = engine.info().await.map_err(|e| match e {
        DeployError::CommandFailed { stderr, .. } => DeployError::precondition_with_hint(
            format!("Docker is not reachable: {}", stderr),
            "start the Docker daemon and check that your user may access it",
        ),
        other => other,
    })?;

    if info.error.to_ascii_lowercase().contains("tls") {
        return Err(DeployError::precondition_with_hint(
            format!("Swarm reports a TLS error: {}", info.error),
            "the node certificates are out of sync; run `docker swarm leave --force` \
             and `docker swarm init` (or rejoin the cluster), then retry",
        ));
    }

    if !info.is_active() {
        let state = if info.local_node_state.is_empty() {
            "unknown"
        } else {
            info.local_node_state.as_str()
        };
        return Err(DeployError::precondition_with_hint(
            format!("Docker is not in Swarm mode (node state: {})", state),
            "run `docker swarm init` on this host or join an existing swarm",
        ));
    }

    if !info.control_available {
        tracing::warn!("This node is not a Swarm manager; stack commands will fail");
    }
    tracing::debug!(version = %info.server_version, node = %info.node_id, "Swarm is active");
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::fake::FakeEngine;

    #[tokio::test]
    async fn test_active_swarm_passes() {
        let engine = FakeEngine::new();
        let info = check_engine(&engine).await.unwrap();
        assert!(info.is_active());
    }

    #[tokio::test]
    async fn test_inactive_swarm_is_precondition() {
        let engine = FakeEngine::new();
        engine.state.lock().swarm.local_node_state = "inactive".into();
        let err = check_engine(&engine).await.unwrap_err();
        assert!(matches!(err, DeployError::Precondition { .. }));
        assert!(err.hint().unwrap().contains("docker swarm init"));
    }

    #[tokio::test]
    async fn test_tls_error_reported_first() {
        let engine = FakeEngine::new();
        {
            let mut state = engine.state.lock();
            state.swarm.local_node_state = "error".into();
            state.swarm.error = "x509: certificate has expired (TLS handshake)".into();
        }
        let err = check_engine(&engine).await.unwrap_err();
        assert!(err.to_string().contains("TLS"));
    }

    #[tokio::test]
    async fn test_unreachable_daemon() {
        let engine = FakeEngine::new().failing("info");
        let err = check_engine(&engine).await.unwrap_err();
        assert!(err.to_string().contains("not reachable"));
    }
}
