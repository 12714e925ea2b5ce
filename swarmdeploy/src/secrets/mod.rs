//! Swarm secret management.
//!
//! Secrets are immutable in Swarm, so "updating" one means removing and
//! creating it again. That is only possible while no deployed service
//! references it, which is why recreation may require removing stacks first.

mod catalog;
mod file;

use std::path::Path;

use rand::RngCore;
use swarmdeploy_shared::constants::secrets as names;
use swarmdeploy_shared::{DeployError, DeployResult};

use crate::docker::DockerEngine;
use crate::env::StackSettings;
use crate::options::{DeployOptions, PollSchedule};
use crate::prompt::Prompter;
use crate::stack;

pub use catalog::{CATALOG, Integration, SecretSpec, lookup, optional, required};
pub use file::{BatchEntry, load_batch};

/// What to do when the secret already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecreatePolicy {
    /// Leave the existing secret untouched.
    #[default]
    Keep,
    /// Ask the operator before recreating.
    Ask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretOutcome {
    Created,
    Recreated,
    Kept,
}

/// Result of checking a list of secrets against the Swarm.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretCheck {
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

impl SecretCheck {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

enum Plan {
    Create,
    Recreate,
    Keep,
}

pub struct SecretManager<'a> {
    engine: &'a dyn DockerEngine,
    removal: PollSchedule,
}

impl<'a> SecretManager<'a> {
    pub fn new(engine: &'a dyn DockerEngine, options: &DeployOptions) -> Self {
        Self {
            engine,
            removal: PollSchedule::for_timeout(
                options.stack_removal_timeout(),
                options.poll_interval(),
            ),
        }
    }

    pub async fn exists(&self, name: &str) -> DeployResult<bool> {
        self.engine.secret_exists(name).await
    }

    /// Create `name` with `value`, or recreate it per `policy`.
    pub async fn create(
        &self,
        name: &str,
        value: &[u8],
        policy: RecreatePolicy,
        prompter: &mut dyn Prompter,
    ) -> DeployResult<SecretOutcome> {
        let plan = self.plan(name, policy, prompter).await?;
        self.apply(name, value, plan, prompter).await
    }

    /// Prompt for the value of `name` (hidden, confirmed) and create it.
    ///
    /// Empty answers are re-asked, except for the API token which is then
    /// generated.
    pub async fn create_interactive(
        &self,
        name: &str,
        policy: RecreatePolicy,
        prompter: &mut dyn Prompter,
    ) -> DeployResult<SecretOutcome> {
        let plan = self.plan(name, policy, prompter).await?;
        if matches!(plan, Plan::Keep) {
            return Ok(SecretOutcome::Kept);
        }
        if matches!(plan, Plan::Recreate) {
            self.free_from_stacks(name, prompter).await?;
        }

        let label = match lookup(name) {
            Some(spec) => format!("{} ({})", name, spec.description),
            None => name.to_string(),
        };
        let value = loop {
            let value = prompter.password(&label, true)?;
            if !value.is_empty() {
                break value;
            }
            if name == names::AUTHENTICATION_TOKEN {
                prompter.message("Generated a random authentication token.");
                break generate_token();
            }
            prompter.message("The value must not be empty.");
        };

        self.write(name, value.as_bytes(), matches!(plan, Plan::Recreate))
            .await
    }

    /// Every required secret that is present or missing.
    pub async fn check_required(&self) -> DeployResult<SecretCheck> {
        self.check(required().map(|s| s.name)).await
    }

    /// Same as [`Self::check_required`] for the optional secrets; never blocks a deploy.
    pub async fn check_optional(&self) -> DeployResult<SecretCheck> {
        self.check(optional().map(|s| s.name)).await
    }

    async fn check(&self, wanted: impl Iterator<Item = &'static str>) -> DeployResult<SecretCheck> {
        let existing = self.engine.secret_list().await?;
        let mut check = SecretCheck::default();
        for name in wanted {
            if existing.iter().any(|s| s.name == name) {
                check.present.push(name.to_string());
            } else {
                check.missing.push(name.to_string());
            }
        }
        Ok(check)
    }

    /// Create `disabled` placeholders for optional secrets whose integration
    /// is off, so the stack file's external secret references resolve.
    pub async fn ensure_disabled_placeholders(
        &self,
        settings: &StackSettings,
    ) -> DeployResult<Vec<String>> {
        let existing = self.engine.secret_list().await?;
        let mut created = Vec::new();
        for spec in optional() {
            if existing.iter().any(|s| s.name == spec.name) {
                continue;
            }
            let enabled = spec
                .integration
                .is_some_and(|integration| integration.is_enabled(settings));
            if enabled {
                tracing::warn!(
                    secret = spec.name,
                    "Integration is enabled but its secret is missing"
                );
                continue;
            }
            self.engine
                .secret_create(spec.name, names::DISABLED_VALUE.as_bytes())
                .await?;
            tracing::info!(secret = spec.name, "Created disabled placeholder secret");
            created.push(spec.name.to_string());
        }
        Ok(created)
    }

    /// Create every secret listed in a `secrets.env` batch file.
    pub async fn create_from_file(
        &self,
        path: &Path,
        policy: RecreatePolicy,
        prompter: &mut dyn Prompter,
    ) -> DeployResult<Vec<(String, SecretOutcome)>> {
        let entries = load_batch(path)?;
        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in entries {
            if lookup(&entry.name).is_none() {
                tracing::warn!(secret = %entry.name, "Not a statechecker secret, creating anyway");
            }
            let outcome = self
                .create(&entry.name, &entry.value, policy, prompter)
                .await?;
            outcomes.push((entry.name, outcome));
        }
        Ok(outcomes)
    }

    async fn plan(
        &self,
        name: &str,
        policy: RecreatePolicy,
        prompter: &mut dyn Prompter,
    ) -> DeployResult<Plan> {
        if !self.exists(name).await? {
            return Ok(Plan::Create);
        }
        let recreate = match policy {
            RecreatePolicy::Keep => false,
            RecreatePolicy::Ask => {
                prompter.confirm(&format!("Secret {} already exists. Recreate it?", name), false)?
            }
        };
        if recreate {
            Ok(Plan::Recreate)
        } else {
            tracing::info!(secret = name, "Secret exists, keeping it");
            Ok(Plan::Keep)
        }
    }

    async fn apply(
        &self,
        name: &str,
        value: &[u8],
        plan: Plan,
        prompter: &mut dyn Prompter,
    ) -> DeployResult<SecretOutcome> {
        match plan {
            Plan::Keep => Ok(SecretOutcome::Kept),
            Plan::Create => self.write(name, value, false).await,
            Plan::Recreate => {
                self.free_from_stacks(name, prompter).await?;
                self.write(name, value, true).await
            }
        }
    }

    /// Remove every deployed stack after the operator agrees; refuse otherwise.
    async fn free_from_stacks(&self, name: &str, prompter: &mut dyn Prompter) -> DeployResult<()> {
        let stacks: Vec<String> = self
            .engine
            .stack_list()
            .await?
            .into_iter()
            .map(|s| s.name)
            .collect();
        if stacks.is_empty() {
            return Ok(());
        }

        let question = format!(
            "Secret {} may be in use by deployed stack(s) {}. Remove them now?",
            name,
            stacks.join(", ")
        );
        if !prompter.confirm(&question, false)? {
            return Err(DeployError::SecretInUse {
                secret: name.to_string(),
                stacks,
            });
        }
        for stack in &stacks {
            stack::remove_and_wait(self.engine, stack, self.removal).await?;
        }
        Ok(())
    }

    async fn write(&self, name: &str, value: &[u8], replace: bool) -> DeployResult<SecretOutcome> {
        if value.is_empty() {
            return Err(DeployError::InvalidInput(format!(
                "secret {} needs a non-empty value",
                name
            )));
        }
        if replace {
            self.engine.secret_remove(name).await?;
            self.engine
                .secret_create(name, value)
                .await
                .map_err(|e| DeployError::SecretLost {
                    secret: name.to_string(),
                    reason: e.to_string(),
                })?;
            Ok(SecretOutcome::Recreated)
        } else {
            self.engine.secret_create(name, value).await?;
            Ok(SecretOutcome::Created)
        }
    }
}

/// 32 random bytes, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
