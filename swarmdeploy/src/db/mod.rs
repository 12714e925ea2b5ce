//! Forward-only schema migrations for the stack's MySQL service.

mod migrations;
mod mysql;

pub use migrations::{Migration, MigrationReport, MigrationRunner, discover_migrations};
pub use mysql::{ContainerMysql, SqlExecutor};

use swarmdeploy_shared::DeployResult;

use crate::docker::DockerEngine;
use crate::env::StackSettings;
use crate::layout::ProjectLayout;
use crate::options::{DeployOptions, PollSchedule};

/// Apply the project's pending migrations to the running db service.
pub async fn migrate(
    engine: &dyn DockerEngine,
    layout: &ProjectLayout,
    settings: &StackSettings,
    options: &DeployOptions,
) -> DeployResult<MigrationReport> {
    let migrations = discover_migrations(&layout.migrations_dir())?;
    let mysql = ContainerMysql::locate(engine, settings).await?;
    let readiness = PollSchedule {
        attempts: options.mysql_ready_attempts,
        interval: options.poll_interval(),
    };
    MigrationRunner::new(&mysql, readiness).run(&migrations).await
}
