use std::path::{Path, PathBuf};

use serde::Serialize;
use swarmdeploy_shared::{DeployError, DeployResult};
use walkdir::WalkDir;

use super::mysql::SqlExecutor;
use crate::options::PollSchedule;

const LEDGER_DDL: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (\
version VARCHAR(255) NOT NULL PRIMARY KEY, \
applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)";

/// One `*.sql` file; its version is the file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

/// `*.sql` files directly under `dir`, in lexical file-name order.
///
/// A missing directory means no migrations.
pub fn discover_migrations(dir: &Path) -> DeployResult<Vec<Migration>> {
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "No migrations directory");
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| DeployError::Internal(e.to_string()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "sql") {
            continue;
        }
        let Some(version) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        found.push(Migration {
            version: version.to_string(),
            path: path.to_path_buf(),
        });
    }
    Ok(found)
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

pub struct MigrationRunner<'a> {
    db: &'a dyn SqlExecutor,
    readiness: PollSchedule,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(db: &'a dyn SqlExecutor, readiness: PollSchedule) -> Self {
        Self { db, readiness }
    }

    /// Apply every migration not yet recorded in `schema_migrations`.
    ///
    /// Stops at the first failing file; files after it are left for the next run.
    pub async fn run(&self, migrations: &[Migration]) -> DeployResult<MigrationReport> {
        self.wait_ready().await?;
        self.db.execute(LEDGER_DDL).await?;

        let mut report = MigrationReport::default();
        for migration in migrations {
            let version = quote(&migration.version);
            let applied = self
                .db
                .query_scalar(&format!(
                    "SELECT COUNT(*) FROM schema_migrations WHERE version = {}",
                    version
                ))
                .await?;
            if applied.as_deref().is_some_and(|n| n != "0") {
                tracing::debug!(version = %migration.version, "Already applied");
                report.skipped.push(migration.version.clone());
                continue;
            }

            tracing::info!(version = %migration.version, "Applying migration");
            let sql = std::fs::read_to_string(&migration.path)
                .map_err(|_| DeployError::missing_file(&migration.path))?;
            self.db
                .execute(&sql)
                .await
                .map_err(|e| DeployError::Migration {
                    version: migration.version.clone(),
                    message: e.to_string(),
                })?;
            self.db
                .execute(&format!(
                    "INSERT INTO schema_migrations (version) SELECT {v} FROM DUAL \
                     WHERE NOT EXISTS (SELECT 1 FROM schema_migrations WHERE version = {v})",
                    v = version
                ))
                .await?;
            report.applied.push(migration.version.clone());
        }
        Ok(report)
    }

    async fn wait_ready(&self) -> DeployResult<()> {
        for attempt in 1..=self.readiness.attempts {
            if self.db.ping().await? {
                return Ok(());
            }
            tracing::debug!(attempt, "MySQL not ready yet");
            if attempt < self.readiness.attempts {
                tokio::time::sleep(self.readiness.interval).await;
            }
        }
        Err(DeployError::Timeout(format!(
            "MySQL did not accept connections after {} attempts; check `docker service logs` for the db service",
            self.readiness.attempts
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use regex::Regex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Keeps the migration ledger in memory and honours the
    /// `WHERE NOT EXISTS` guard the way MySQL would.
    #[derive(Default)]
    struct LedgerDb {
        ledger: Mutex<Vec<String>>,
        executed: Mutex<Vec<String>>,
        pings_until_ready: Mutex<u32>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl SqlExecutor for LedgerDb {
        async fn ping(&self) -> DeployResult<bool> {
            let mut left = self.pings_until_ready.lock();
            if *left == 0 {
                return Ok(true);
            }
            *left -= 1;
            Ok(false)
        }

        async fn execute(&self, sql: &str) -> DeployResult<()> {
            if let Some(marker) = self.fail_on
                && sql.contains(marker)
            {
                return Err(DeployError::CommandFailed {
                    command: "mysql".into(),
                    code: Some(1),
                    stderr: "ERROR 1050: table exists".into(),
                });
            }
            self.executed.lock().push(sql.to_string());
            let insert = Regex::new(r"^INSERT INTO schema_migrations \(version\) SELECT '([^']+)'").unwrap();
            if let Some(caps) = insert.captures(sql) {
                assert!(sql.contains("WHERE NOT EXISTS"));
                let version = caps[1].to_string();
                let mut ledger = self.ledger.lock();
                if !ledger.contains(&version) {
                    ledger.push(version);
                }
            }
            Ok(())
        }

        async fn query_scalar(&self, sql: &str) -> DeployResult<Option<String>> {
            let ledger = self.ledger.lock();
            let count = ledger.iter().filter(|v| sql.contains(&format!("'{}'", v))).count();
            Ok(Some(count.to_string()))
        }
    }

    fn schedule() -> PollSchedule {
        PollSchedule {
            attempts: 5,
            interval: Duration::from_secs(2),
        }
    }

    fn migrations_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, sql) in files {
            std::fs::write(dir.path().join(name), sql).unwrap();
        }
        dir
    }

    #[test]
    fn test_discover_lexical_order() {
        let dir = migrations_dir(&[
            ("V3__c.sql", "SELECT 3;"),
            ("V2__add_website_states.sql", "SELECT 2;"),
            ("README.md", "notes"),
        ]);
        std::fs::create_dir(dir.path().join("nested.sql")).unwrap();
        let found = discover_migrations(dir.path()).unwrap();
        let versions: Vec<_> = found.iter().map(|m| m.version.as_str()).collect();
        assert_eq!(versions, vec!["V2__add_website_states", "V3__c"]);
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(discover_migrations(&dir.path().join("none")).unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_applies_once_and_records_version() {
        let dir = migrations_dir(&[(
            "V2__add_website_states.sql",
            "CREATE TABLE website_states (id INT);",
        )]);
        let migrations = discover_migrations(dir.path()).unwrap();
        let db = LedgerDb {
            pings_until_ready: Mutex::new(2),
            ..Default::default()
        };
        let runner = MigrationRunner::new(&db, schedule());

        let first = runner.run(&migrations).await.unwrap();
        assert_eq!(first.applied, vec!["V2__add_website_states"]);

        let second = runner.run(&migrations).await.unwrap();
        assert!(second.applied.is_empty());
        assert_eq!(second.skipped, vec!["V2__add_website_states"]);

        assert_eq!(*db.ledger.lock(), vec!["V2__add_website_states".to_string()]);
        let creates = db
            .executed
            .lock()
            .iter()
            .filter(|s| s.contains("website_states (id INT)"))
            .count();
        assert_eq!(creates, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborts_on_first_failure() {
        let dir = migrations_dir(&[
            ("V2__ok.sql", "CREATE TABLE a (id INT);"),
            ("V3__broken.sql", "CREATE TABLE tools (id INT);"),
            ("V4__later.sql", "CREATE TABLE b (id INT);"),
        ]);
        let db = LedgerDb {
            fail_on: Some("TABLE tools"),
            ..Default::default()
        };
        let err = MigrationRunner::new(&db, schedule())
            .run(&discover_migrations(dir.path()).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::Migration { ref version, .. } if version == "V3__broken"));
        assert_eq!(*db.ledger.lock(), vec!["V2__ok".to_string()]);
        assert!(!db.executed.lock().iter().any(|s| s.contains("TABLE b")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_readiness_timeout() {
        let db = LedgerDb {
            pings_until_ready: Mutex::new(100),
            ..Default::default()
        };
        let err = MigrationRunner::new(&db, schedule()).run(&[]).await.unwrap_err();
        assert!(matches!(err, DeployError::Timeout(_)));
        assert!(db.executed.lock().is_empty());
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("V2__it's"), "'V2__it''s'");
    }
}
