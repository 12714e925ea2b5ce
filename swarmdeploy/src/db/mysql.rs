use async_trait::async_trait;
use swarmdeploy_shared::constants::secrets;
use swarmdeploy_shared::{DeployError, DeployResult};

use crate::docker::{DockerEngine, ExecOutput};
use crate::env::StackSettings;

/// Minimal SQL surface the migration runner needs.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Whether the server accepts connections.
    async fn ping(&self) -> DeployResult<bool>;

    async fn execute(&self, sql: &str) -> DeployResult<()>;

    /// First column of the first row, if any.
    async fn query_scalar(&self, sql: &str) -> DeployResult<Option<String>>;
}

/// `mysql` client inside the stack's db container, authenticated as root
/// with the password from the mounted secret.
///
/// SQL goes in on stdin and the password through `MYSQL_PWD`, so neither
/// shows up in a process listing.
pub struct ContainerMysql<'a> {
    engine: &'a dyn DockerEngine,
    container: String,
    database: String,
}

impl<'a> ContainerMysql<'a> {
    pub fn new(
        engine: &'a dyn DockerEngine,
        container: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            container: container.into(),
            database: database.into(),
        }
    }

    /// Find a running container of the stack's db service on this node.
    pub async fn locate(engine: &'a dyn DockerEngine, settings: &StackSettings) -> DeployResult<Self> {
        let service = settings.service("db");
        let containers = engine.service_containers(&service).await?;
        let container = containers.into_iter().next().ok_or_else(|| {
            DeployError::precondition_with_hint(
                format!("no running container for {} on this node", service),
                "deploy the stack and run this on the manager that hosts the db task",
            )
        })?;
        tracing::debug!(container = %container, "Using db container");
        Ok(Self::new(engine, container, settings.db_name.clone()))
    }

    fn shell(&self, program: &str) -> Vec<String> {
        let script = format!(
            r#"MYSQL_PWD="$(cat {}/{})" exec {} "$@""#,
            secrets::MOUNT_DIR,
            secrets::DB_ROOT_USER_PW,
            program
        );
        vec!["sh".into(), "-c".into(), script, program.into()]
    }

    async fn mysql(&self, sql: &str) -> DeployResult<ExecOutput> {
        let mut cmd = self.shell("mysql");
        cmd.extend(
            ["-uroot", "--batch", "--skip-column-names", self.database.as_str()].map(str::to_string),
        );
        let out = self
            .engine
            .container_exec(&self.container, &cmd, Some(sql.as_bytes()))
            .await?;
        if !out.success() {
            return Err(DeployError::CommandFailed {
                command: "mysql".into(),
                code: out.code,
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl SqlExecutor for ContainerMysql<'_> {
    async fn ping(&self) -> DeployResult<bool> {
        let mut cmd = self.shell("mysqladmin");
        cmd.extend(["-uroot", "ping", "--silent"].map(str::to_string));
        let out = self.engine.container_exec(&self.container, &cmd, None).await?;
        Ok(out.success())
    }

    async fn execute(&self, sql: &str) -> DeployResult<()> {
        self.mysql(sql).await.map(|_| ())
    }

    async fn query_scalar(&self, sql: &str) -> DeployResult<Option<String>> {
        let out = self.mysql(sql).await?;
        Ok(out
            .stdout
            .lines()
            .next()
            .map(|l| l.split('\t').next().unwrap_or_default().trim().to_string())
            .filter(|v| !v.is_empty()))
    }
}
