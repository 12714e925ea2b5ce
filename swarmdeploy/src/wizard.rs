//! First-run setup: choices, `.env`, stack file, data root and secrets.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use swarmdeploy_shared::constants::env_keys as keys;
use swarmdeploy_shared::{DeployError, DeployResult};

use crate::docker::DockerEngine;
use crate::env::{EnvFile, ProxyType, SslMode, StackSettings};
use crate::fsutil;
use crate::layout::ProjectLayout;
use crate::options::DeployOptions;
use crate::preflight;
use crate::prompt::Prompter;
use crate::secrets::{RecreatePolicy, SecretManager, SecretOutcome};
use crate::stack::{PreparedDataRoot, prepare_data_root};
use crate::template::{self, AssemblyOptions};

/// Invalid answers are re-asked this many times before giving up.
const MAX_ATTEMPTS: usize = 5;

static DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$")
        .expect("domain pattern is valid")
});

static STACK_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("stack name pattern is valid")
});

pub fn is_valid_domain(value: &str) -> bool {
    value.len() <= 253 && DOMAIN.is_match(value)
}

fn validate_domain(value: &str) -> Result<(), String> {
    if is_valid_domain(value) {
        Ok(())
    } else {
        Err(format!("'{}' is not a valid domain name (e.g. api.example.com)", value))
    }
}

fn validate_port(value: &str) -> Result<(), String> {
    match value.parse::<u16>() {
        Ok(p) if p > 0 => Ok(()),
        _ => Err(format!("'{}' is not a valid port (1-65535)", value)),
    }
}

fn validate_stack_name(value: &str) -> Result<(), String> {
    if STACK_NAME.is_match(value) {
        Ok(())
    } else {
        Err(format!(
            "'{}' is not a valid stack name (letters, digits, '-' and '_')",
            value
        ))
    }
}

fn validate_non_empty(value: &str) -> Result<(), String> {
    if value.is_empty() {
        Err("a value is required".into())
    } else {
        Ok(())
    }
}

/// Operator's answers to the structural questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardChoices {
    pub proxy_type: ProxyType,
    pub ssl_mode: SslMode,
    pub include_web: bool,
    pub include_phpmyadmin: bool,
}

impl From<WizardChoices> for AssemblyOptions {
    fn from(c: WizardChoices) -> Self {
        AssemblyOptions {
            proxy_type: c.proxy_type,
            ssl_mode: c.ssl_mode,
            include_phpmyadmin: c.include_phpmyadmin,
            include_web: c.include_web,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WizardReport {
    pub choices: WizardChoices,
    pub env_file: PathBuf,
    pub stack_file: PathBuf,
    pub data_root: PreparedDataRoot,
    pub secrets: Vec<(String, SecretOutcome)>,
}

pub struct SetupWizard<'a> {
    engine: &'a dyn DockerEngine,
    layout: &'a ProjectLayout,
    options: &'a DeployOptions,
}

impl<'a> SetupWizard<'a> {
    pub fn new(
        engine: &'a dyn DockerEngine,
        layout: &'a ProjectLayout,
        options: &'a DeployOptions,
    ) -> Self {
        Self {
            engine,
            layout,
            options,
        }
    }

    pub async fn run(&self, prompter: &mut dyn Prompter) -> DeployResult<WizardReport> {
        preflight::check_engine(self.engine).await?;

        if self.layout.is_configured()
            && !prompter.confirm(
                "A configuration already exists. Replace .env and swarm-stack.yml (backups are kept)?",
                false,
            )?
        {
            return Err(DeployError::Aborted("existing configuration kept".into()));
        }

        let choices = ask_choices(prompter)?;
        let env = self.write_env(&choices, prompter)?;
        let settings = StackSettings::from_env(&env, self.layout.root())?;

        let stack_file = template::generate_stack_file(self.layout, &choices.into())?;
        prompter.message(&format!("Wrote {}", stack_file.display()));

        let data_root = prepare_data_root(self.layout, &settings)?;
        let secrets = self.create_required_secrets(prompter).await?;

        fsutil::write_atomic(
            &self.layout.setup_marker(),
            &format!("{}\n", chrono::Utc::now().to_rfc3339()),
        )?;
        tracing::info!(root = %self.layout.root().display(), "Setup complete");

        Ok(WizardReport {
            choices,
            env_file: self.layout.env_file(),
            stack_file,
            data_root,
            secrets,
        })
    }

    fn write_env(&self, choices: &WizardChoices, prompter: &mut dyn Prompter) -> DeployResult<EnvFile> {
        let mut env = EnvFile::parse(&template::assemble_env(
            self.layout.setup_dir(),
            choices.proxy_type,
        )?);

        env.set(keys::WEB_ENABLED, choices.include_web.to_string());
        env.set(keys::PHPMYADMIN_ENABLED, choices.include_phpmyadmin.to_string());

        ask_into(&mut env, prompter, keys::STACK_NAME, "Stack name", validate_stack_name)?;
        ask_into(&mut env, prompter, keys::DATA_ROOT, "Data root directory", validate_non_empty)?;
        ask_into(&mut env, prompter, keys::IMAGE_VERSION, "Image version", validate_non_empty)?;

        match choices.proxy_type {
            ProxyType::Traefik => {
                env.set(keys::SSL_MODE, choices.ssl_mode.as_str());
                ask_into(
                    &mut env,
                    prompter,
                    keys::TRAEFIK_NETWORK_NAME,
                    "Traefik network",
                    validate_non_empty,
                )?;
                ask_into(&mut env, prompter, keys::API_URL, "API domain", validate_domain)?;
                if choices.include_web {
                    ask_into(&mut env, prompter, keys::WEB_URL, "Web domain", validate_domain)?;
                }
                if choices.include_phpmyadmin {
                    ask_into(
                        &mut env,
                        prompter,
                        keys::PHPMYADMIN_URL,
                        "phpMyAdmin domain",
                        validate_domain,
                    )?;
                }
            }
            ProxyType::None => {
                ask_into(&mut env, prompter, keys::API_PORT, "API port", validate_port)?;
                if choices.include_web {
                    ask_into(&mut env, prompter, keys::WEB_PORT, "Web port", validate_port)?;
                }
                if choices.include_phpmyadmin {
                    ask_into(
                        &mut env,
                        prompter,
                        keys::PHPMYADMIN_PORT,
                        "phpMyAdmin port",
                        validate_port,
                    )?;
                }
            }
        }

        let path = self.layout.env_file();
        template::write_generated(&path, &env.render(), &self.layout.env_backup_dir())?;
        prompter.message(&format!("Wrote {}", path.display()));
        EnvFile::load(&path)
    }

    async fn create_required_secrets(
        &self,
        prompter: &mut dyn Prompter,
    ) -> DeployResult<Vec<(String, SecretOutcome)>> {
        let manager = SecretManager::new(self.engine, self.options);
        let mut outcomes = Vec::new();

        let secrets_file = self.layout.secrets_file();
        if secrets_file.is_file()
            && prompter.confirm(
                &format!("Create secrets from {}?", secrets_file.display()),
                true,
            )?
        {
            outcomes.extend(
                manager
                    .create_from_file(&secrets_file, RecreatePolicy::Keep, prompter)
                    .await?,
            );
        }

        for name in manager.check_required().await?.missing {
            let outcome = manager
                .create_interactive(&name, RecreatePolicy::Keep, prompter)
                .await?;
            outcomes.push((name, outcome));
        }
        Ok(outcomes)
    }
}

fn ask_choices(prompter: &mut dyn Prompter) -> DeployResult<WizardChoices> {
    let proxy_type = match prompter.select(
        "How should the services be exposed?",
        &[
            "traefik: behind the Traefik reverse proxy",
            "none: published directly on host ports",
        ],
        1,
    )? {
        0 => ProxyType::Traefik,
        _ => ProxyType::None,
    };

    let ssl_mode = if proxy_type == ProxyType::Traefik {
        match prompter.select(
            "Where is TLS terminated?",
            &[
                "direct: Traefik obtains certificates itself",
                "proxy: an upstream proxy terminates TLS",
            ],
            0,
        )? {
            0 => SslMode::Direct,
            _ => SslMode::Proxy,
        }
    } else {
        SslMode::default()
    };

    Ok(WizardChoices {
        proxy_type,
        ssl_mode,
        include_web: prompter.confirm("Include the web frontend?", false)?,
        include_phpmyadmin: prompter.confirm("Include phpMyAdmin?", false)?,
    })
}

/// Ask for `key` with the template value as default and store the answer.
fn ask_into(
    env: &mut EnvFile,
    prompter: &mut dyn Prompter,
    key: &str,
    label: &str,
    validate: fn(&str) -> Result<(), String>,
) -> DeployResult<()> {
    let default = env.get_non_empty(key).map(str::to_string);
    for _ in 0..MAX_ATTEMPTS {
        let answer = prompter.input(label, default.as_deref())?;
        let answer = answer.trim();
        match validate(answer) {
            Ok(()) => {
                env.set(key, answer);
                return Ok(());
            }
            Err(why) => prompter.message(&why),
        }
    }
    Err(DeployError::InvalidInput(format!(
        "no valid value for {} after {} attempts",
        key, MAX_ATTEMPTS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::fake::FakeEngine;
    use crate::prompt::scripted::{Answer, ScriptedPrompter};
    use rstest::rstest;
    use std::path::Path;
    use swarmdeploy_shared::constants::secrets as names;
    use tempfile::TempDir;

    fn layout(dir: &TempDir) -> ProjectLayout {
        ProjectLayout::new(dir.path())
            .with_setup_dir(Path::new(env!("CARGO_MANIFEST_DIR")).join("../setup"))
    }

    fn text(s: &str) -> Answer {
        Answer::Text(s.into())
    }

    #[rstest]
    #[case("api.example.com", true)]
    #[case("statechecker.example.co.uk", true)]
    #[case("localhost", false)]
    #[case("-bad.example.com", false)]
    #[case("has space.example.com", false)]
    #[case("", false)]
    fn test_domain_validation(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(is_valid_domain(value), valid);
    }

    #[tokio::test]
    async fn test_defaults_without_proxy() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        let engine = FakeEngine::new();
        let options = DeployOptions::default();
        let mut prompter = ScriptedPrompter::new([
            Answer::Choice(1),
            Answer::No,
            Answer::No,
            text(""),
            text(""),
            text(""),
            text(""),
            // token left empty is generated
            text(""),
            text("root-pw"),
            text("user-pw"),
        ]);

        let report = SetupWizard::new(&engine, &layout, &options)
            .run(&mut prompter)
            .await
            .unwrap();

        assert_eq!(prompter.remaining(), 0);
        let env = EnvFile::load(&layout.env_file()).unwrap();
        assert_eq!(env.get("PROXY_TYPE"), Some("none"));
        assert_eq!(env.get("WEB_PORT"), Some("8080"));
        assert_eq!(env.get("PHPMYADMIN_PORT"), Some("8081"));
        assert_eq!(env.get("WEB_ENABLED"), Some("false"));

        let stack = std::fs::read_to_string(&report.stack_file).unwrap();
        assert!(!stack.contains("traefik"));
        assert!(stack.contains("${API_PORT:-8787}:8787"));

        for name in names::REQUIRED {
            assert!(prompter.prompts.iter().any(|p| p.contains(name)), "{name} not prompted");
            assert!(engine.secret_value(name).is_some());
        }
        assert_eq!(
            engine.secret_value(names::AUTHENTICATION_TOKEN).unwrap().len(),
            64
        );
        assert!(layout.setup_marker().is_file());
        assert!(dir.path().join("logs/api").is_dir());
    }

    #[tokio::test]
    async fn test_traefik_reprompts_bad_domain() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        let engine = names::REQUIRED
            .iter()
            .fold(FakeEngine::new(), |e, n| e.with_secret(n, "x"));
        let options = DeployOptions::default();
        let mut prompter = ScriptedPrompter::new([
            Answer::Choice(0),
            Answer::Choice(1),
            Answer::No,
            Answer::Yes,
            text("sc"),
            text(""),
            text("2.0.0"),
            text(""),
            text("not a domain"),
            text("api.example.com"),
            text(""),
        ]);

        SetupWizard::new(&engine, &layout, &options)
            .run(&mut prompter)
            .await
            .unwrap();

        assert_eq!(prompter.remaining(), 0);
        assert!(prompter.messages.iter().any(|m| m.contains("not a domain")));
        let env = EnvFile::load(&layout.env_file()).unwrap();
        assert_eq!(env.get("PROXY_TYPE"), Some("traefik"));
        assert_eq!(env.get("SSL_MODE"), Some("proxy"));
        assert_eq!(env.get("STACK_NAME"), Some("sc"));
        assert_eq!(env.get("API_URL"), Some("api.example.com"));
        assert_eq!(env.get("PHPMYADMIN_URL"), Some("pma.statechecker.example.com"));

        let stack = std::fs::read_to_string(layout.stack_file()).unwrap();
        assert!(stack.contains("traefik.http.routers"));
        assert!(stack.contains("phpmyadmin:"));
        assert!(!stack.contains("websecure"));
    }

    #[tokio::test]
    async fn test_secrets_from_file() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        std::fs::write(
            layout.secrets_file(),
            format!(
                "{}=tok\n{}=root\n{}=user\n",
                names::AUTHENTICATION_TOKEN,
                names::DB_ROOT_USER_PW,
                names::DB_USER_PW
            ),
        )
        .unwrap();
        let engine = FakeEngine::new();
        let options = DeployOptions::default();
        let mut prompter = ScriptedPrompter::new([
            Answer::Choice(1),
            Answer::No,
            Answer::No,
            text(""),
            text(""),
            text(""),
            text(""),
            Answer::Yes,
        ]);

        let report = SetupWizard::new(&engine, &layout, &options)
            .run(&mut prompter)
            .await
            .unwrap();

        assert_eq!(report.secrets.len(), 3);
        assert_eq!(engine.secret_value(names::DB_ROOT_USER_PW).as_deref(), Some("root"));
        assert_eq!(prompter.remaining(), 0);
    }

    #[tokio::test]
    async fn test_existing_configuration_kept_on_decline() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        std::fs::write(layout.env_file(), "STACK_NAME=mine\n").unwrap();
        let engine = FakeEngine::new();
        let options = DeployOptions::default();
        let mut prompter = ScriptedPrompter::new([Answer::No]);

        let err = SetupWizard::new(&engine, &layout, &options)
            .run(&mut prompter)
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::Aborted(_)));
        assert_eq!(
            std::fs::read_to_string(layout.env_file()).unwrap(),
            "STACK_NAME=mine\n"
        );
    }

    #[test]
    fn test_ask_into_gives_up() {
        let mut env = EnvFile::parse("API_PORT=8787\n");
        let mut prompter = ScriptedPrompter::new((0..MAX_ATTEMPTS).map(|_| text("http")));
        let err = ask_into(&mut env, &mut prompter, "API_PORT", "API port", validate_port).unwrap_err();
        assert!(matches!(err, DeployError::InvalidInput(_)));
        assert_eq!(env.get("API_PORT"), Some("8787"));
    }
}
