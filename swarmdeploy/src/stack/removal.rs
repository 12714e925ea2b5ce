//! `docker stack rm` followed by a bounded wait.

use swarmdeploy_shared::{DeployError, DeployResult};

use crate::docker::DockerEngine;
use crate::options::PollSchedule;

/// Remove `stack` and wait until none of its networks are left.
///
/// Swarm tears services down asynchronously; the stack's networks are the
/// last thing to go, so their absence means the secrets are free again.
pub async fn remove_and_wait(
    engine: &dyn DockerEngine,
    stack: &str,
    schedule: PollSchedule,
) -> DeployResult<()> {
    tracing::info!(stack, "Removing stack");
    engine.stack_remove(stack).await?;
    wait_until_gone(engine, stack, schedule).await
}

pub async fn wait_until_gone(
    engine: &dyn DockerEngine,
    stack: &str,
    schedule: PollSchedule,
) -> DeployResult<()> {
    for attempt in 1..=schedule.attempts {
        let remaining = engine.stack_networks(stack).await?;
        if remaining.is_empty() {
            tracing::info!(stack, "Stack removed");
            return Ok(());
        }
        tracing::debug!(stack, attempt, ?remaining, "Waiting for stack networks to go away");
        tokio::time::sleep(schedule.interval).await;
    }

    let waited = schedule.interval * schedule.attempts;
    Err(DeployError::Timeout(format!(
        "stack {} still has networks after {}s; check `docker network ls --filter label=com.docker.stack.namespace={}` and retry",
        stack,
        waited.as_secs(),
        stack
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::fake::FakeEngine;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_lingering_networks() {
        let engine = FakeEngine::new().with_stack("statechecker", &["api", "db"]);
        engine.state.lock().network_linger_polls = 3;
        let schedule = PollSchedule {
            attempts: 10,
            interval: Duration::from_secs(2),
        };

        remove_and_wait(&engine, "statechecker", schedule).await.unwrap();
        assert_eq!(engine.count_calls("stack_networks"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let engine = FakeEngine::new().with_stack("statechecker", &["api"]);
        engine.state.lock().network_linger_polls = 100;
        let schedule = PollSchedule::for_timeout(Duration::from_secs(10), Duration::from_secs(2));

        let err = remove_and_wait(&engine, "statechecker", schedule)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Timeout(_)));
        assert_eq!(engine.count_calls("stack_networks"), 5);
    }
}
