//! CLI definition and argument parsing for swarmdeploy.
//! Holds the top-level `Cli`, the subcommand enum and the global flags.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use swarmdeploy::options::PollSchedule;
use swarmdeploy::prompt::{NonInteractive, Prompter};
use swarmdeploy::{DeployOptions, DockerCli, EnvFile, ProjectLayout, StackSettings};

use crate::terminal::TerminalPrompter;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "swarmdeploy",
    author,
    version,
    about = "Deploy and operate the statechecker stack on Docker Swarm"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
#[non_exhaustive]
pub enum Commands {
    /// Run the first-time setup wizard
    Setup(crate::commands::setup::SetupArgs),

    /// Interactive menu for day-to-day operations
    Menu(crate::commands::menu::MenuArgs),

    /// Assemble .env and swarm-stack.yml from the setup templates
    Assemble(crate::commands::assemble::AssembleArgs),

    /// Read or change values in .env
    Env(crate::commands::env::EnvArgs),

    /// Check and create the Swarm secrets the stack consumes
    Secrets(crate::commands::secrets::SecretsArgs),

    /// Render and deploy the stack
    Deploy(crate::commands::deploy::DeployArgs),

    /// Remove the stack and wait until it is gone
    #[command(visible_alias = "rm")]
    Remove(crate::commands::deploy::RemoveArgs),

    /// Roll every service back to its previous spec
    Rollback(crate::commands::deploy::RollbackArgs),

    /// Health check: services, tasks, endpoints and logs
    #[command(visible_alias = "health")]
    Status(crate::commands::status::StatusArgs),

    /// Show service logs
    Logs(crate::commands::status::LogsArgs),

    /// Scale a service and persist the replica count
    Scale(crate::commands::scale::ScaleArgs),

    /// Roll the api and check services onto a new image tag
    UpdateImage(crate::commands::scale::UpdateImageArgs),

    /// Apply pending database migrations
    Migrate(crate::commands::migrate::MigrateArgs),

    /// Attach or detach the backup network on the db service
    BackupNetwork(crate::commands::backup_network::BackupNetworkArgs),

    /// Keycloak realm and client setup
    Keycloak(crate::commands::keycloak::KeycloakArgs),

    /// GitHub Actions variables and secrets for this deployment
    Cicd(crate::commands::cicd::CicdArgs),

    /// Rewrite a rendered Traefik stack file into a direct-port one
    NoProxy(crate::commands::no_proxy::NoProxyArgs),

    /// Generate shell completion scripts
    #[command(hide = true)]
    Completion(crate::commands::completion::CompletionArgs),
}

// ============================================================================
// GLOBAL FLAGS
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct GlobalFlags {
    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Project checkout holding .env and swarm-stack.yml
    #[arg(
        long,
        global = true,
        env = "SWARMDEPLOY_PROJECT_DIR",
        default_value = "."
    )]
    pub project_dir: PathBuf,

    /// Directory with compose-modules/ and env-templates/ (default: <project>/setup)
    #[arg(long, global = true, env = "SWARMDEPLOY_SETUP_DIR")]
    pub setup_dir: Option<PathBuf>,

    /// Never prompt; questions take their defaults
    #[arg(long, global = true)]
    pub non_interactive: bool,

    /// Answer yes to every confirmation (implies --non-interactive)
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,
}

impl GlobalFlags {
    pub fn layout(&self) -> ProjectLayout {
        let layout = ProjectLayout::new(&self.project_dir);
        match &self.setup_dir {
            Some(dir) => layout.with_setup_dir(dir),
            None => layout,
        }
    }

    pub fn options(&self) -> DeployOptions {
        crate::config::load_options(&self.layout().options_file())
    }

    pub fn engine(&self, options: &DeployOptions) -> DockerCli {
        DockerCli::new(&options.docker_binary)
    }

    /// Terminal prompts when attached to a TTY, defaults otherwise.
    pub fn prompter(&self) -> Box<dyn Prompter> {
        if self.yes || self.non_interactive || !std::io::stdin().is_terminal() {
            Box::new(NonInteractive {
                assume_yes: self.yes,
            })
        } else {
            Box::new(TerminalPrompter::new())
        }
    }

    /// `.env` plus its typed view; fails when the project is not set up.
    pub fn load_settings(&self) -> anyhow::Result<(EnvFile, StackSettings)> {
        let layout = self.layout();
        let env = EnvFile::load(&layout.env_file())?;
        let settings = StackSettings::from_env(&env, layout.root())?;
        Ok((env, settings))
    }
}

/// Polling every bounded wait shares.
pub fn schedule(options: &DeployOptions, timeout: std::time::Duration) -> PollSchedule {
    PollSchedule::for_timeout(timeout, options.poll_interval())
}

// ============================================================================
// OUTPUT FLAGS
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct OutputFlags {
    /// Output format: table, json, yaml, or a Go template (e.g. '{{.stack}}')
    #[arg(short, long, default_value = "table")]
    pub format: String,
}
