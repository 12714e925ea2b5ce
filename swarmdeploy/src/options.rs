//! Tool options: timeouts, poll intervals and the docker binary.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options that tune how swarmdeploy talks to Docker and how long it waits.
///
/// Every field has a serde default, so a partial `.swarmdeploy.json`
/// overrides only the keys it names.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeployOptions {
    /// Docker binary to invoke.
    ///
    /// Default: `docker` resolved on PATH.
    #[serde(default = "default_docker_binary")]
    pub docker_binary: PathBuf,

    /// Upper bound for waiting until a removed stack's networks are gone.
    #[serde(default = "default_stack_removal_timeout_secs")]
    pub stack_removal_timeout_secs: u64,

    /// Interval between polls in every bounded wait loop.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Upper bound for the backup network to show up on the db service.
    #[serde(default = "default_backup_network_timeout_secs")]
    pub backup_network_timeout_secs: u64,

    /// MySQL readiness probes before the migration runner gives up.
    #[serde(default = "default_mysql_ready_attempts")]
    pub mysql_ready_attempts: u32,

    /// Keycloak bootstrap attempts when the admin login reports `invalid_grant`.
    #[serde(default = "default_keycloak_attempts")]
    pub keycloak_attempts: u32,
}

fn default_docker_binary() -> PathBuf {
    PathBuf::from("docker")
}

fn default_stack_removal_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_backup_network_timeout_secs() -> u64 {
    60
}

fn default_mysql_ready_attempts() -> u32 {
    60
}

fn default_keycloak_attempts() -> u32 {
    3
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            docker_binary: default_docker_binary(),
            stack_removal_timeout_secs: default_stack_removal_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            backup_network_timeout_secs: default_backup_network_timeout_secs(),
            mysql_ready_attempts: default_mysql_ready_attempts(),
            keycloak_attempts: default_keycloak_attempts(),
        }
    }
}

impl DeployOptions {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn stack_removal_timeout(&self) -> Duration {
        Duration::from_secs(self.stack_removal_timeout_secs)
    }

    pub fn backup_network_timeout(&self) -> Duration {
        Duration::from_secs(self.backup_network_timeout_secs)
    }
}

/// Bounded polling schedule: `attempts` probes spaced `interval` apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSchedule {
    pub attempts: u32,
    pub interval: Duration,
}

impl PollSchedule {
    /// Schedule covering `timeout` with probes every `interval` (at least one probe).
    pub fn for_timeout(timeout: Duration, interval: Duration) -> Self {
        let attempts = if interval.is_zero() {
            1
        } else {
            (timeout.as_millis() / interval.as_millis()).max(1) as u32
        };
        Self { attempts, interval }
    }
}
