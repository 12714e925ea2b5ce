//! `swarmdeploy keycloak bootstrap`: realm, roles, clients and users.

use std::io::Write;
use std::time::Duration;

use clap::{Args, Subcommand};
use swarmdeploy::EnvFile;
use swarmdeploy::keycloak::{
    self, BootstrapConfig, DEFAULT_API_ROOT_URL, DEFAULT_FRONTEND_ROOT_URL, HttpAdmin, UserSpec,
};
use swarmdeploy::secrets::SecretOutcome;
use swarmdeploy_shared::constants::env_keys as keys;

use crate::cli::{GlobalFlags, OutputFlags};
use crate::formatter::{self, OutputFormat};

const RETRY_PAUSE: Duration = Duration::from_secs(5);

#[derive(Args, Debug)]
pub struct KeycloakArgs {
    #[command(subcommand)]
    pub command: KeycloakCommand,
}

#[derive(Subcommand, Debug)]
pub enum KeycloakCommand {
    /// Create (or update) the realm, roles, clients and users
    Bootstrap(BootstrapArgs),
}

#[derive(Args, Debug)]
pub struct BootstrapArgs {
    /// Keycloak base URL (default: KEYCLOAK_URL from .env, else http://localhost:9090)
    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long, env = "KEYCLOAK_ADMIN", default_value = "admin")]
    pub admin_user: String,

    #[arg(long, env = "KEYCLOAK_ADMIN_PASSWORD", default_value = "admin", hide_env_values = true)]
    pub admin_password: String,

    /// Realm (default: KEYCLOAK_REALM from .env, else statechecker)
    #[arg(long)]
    pub realm: Option<String>,

    #[arg(long)]
    pub frontend_client_id: Option<String>,

    #[arg(long)]
    pub backend_client_id: Option<String>,

    #[arg(long, default_value = DEFAULT_FRONTEND_ROOT_URL)]
    pub frontend_root_url: String,

    #[arg(long, default_value = DEFAULT_API_ROOT_URL)]
    pub api_root_url: String,

    /// Extra realm role to create (repeatable)
    #[arg(long = "role", value_name = "ROLE")]
    pub roles: Vec<String>,

    /// User as username:password:role1,role2 (repeatable)
    #[arg(long = "user", value_name = "SPEC")]
    pub users: Vec<UserSpec>,

    /// Do not store the backend secret in Swarm or the settings in .env
    #[arg(long)]
    pub no_store: bool,

    #[command(flatten)]
    pub output: OutputFlags,
}

pub async fn execute(args: KeycloakArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    match args.command {
        KeycloakCommand::Bootstrap(args) => bootstrap(args, global).await,
    }
}

async fn bootstrap(args: BootstrapArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let format = OutputFormat::parse(&args.output.format)?;
    let layout = global.layout();
    let options = global.options();
    let mut prompter = global.prompter();
    let env = EnvFile::load_or_empty(&layout.env_file())?;
    let from_env = |key: &str| env.get_non_empty(key).map(str::to_string);

    let defaults = BootstrapConfig::default();
    let mut users = args.users;
    if users.is_empty() {
        let spec = prompter.input("Initial user (username:password:role1,role2)", None)?;
        users.push(spec.parse()?);
    }
    let config = BootstrapConfig {
        base_url: args
            .base_url
            .or_else(|| from_env(keys::KEYCLOAK_URL))
            .unwrap_or(defaults.base_url),
        admin_user: args.admin_user,
        admin_password: args.admin_password,
        realm: args
            .realm
            .or_else(|| from_env(keys::KEYCLOAK_REALM))
            .unwrap_or(defaults.realm),
        frontend_client_id: args
            .frontend_client_id
            .or_else(|| from_env(keys::KEYCLOAK_FRONTEND_CLIENT_ID))
            .unwrap_or(defaults.frontend_client_id),
        backend_client_id: args
            .backend_client_id
            .or_else(|| from_env(keys::KEYCLOAK_BACKEND_CLIENT_ID))
            .unwrap_or(defaults.backend_client_id),
        frontend_root_url: args.frontend_root_url,
        api_root_url: args.api_root_url,
        extra_roles: args.roles,
        users,
        service_account_role: defaults.service_account_role,
    };

    let api = HttpAdmin::new(&config.base_url)?;
    let summary =
        keycloak::bootstrap_with_retry(&api, &config, options.keycloak_attempts, RETRY_PAUSE)
            .await?;

    formatter::print_output(&mut std::io::stdout(), &summary, &format, |w, summary| {
        writeln!(w, "Realm:            {}", summary.realm)?;
        writeln!(w, "Frontend client:  {}", summary.frontend_client_id)?;
        writeln!(w, "Backend client:   {}", summary.backend_client_id)?;
        writeln!(w, "Roles:            {}", summary.roles.join(", "))?;
        for user in &summary.users {
            writeln!(w, "User {}: {}", user.username, user.roles.join(", "))?;
        }
        Ok(())
    })?;

    if args.no_store {
        return Ok(());
    }
    if !layout.is_configured() {
        tracing::warn!("No .env yet; the backend client secret was not stored");
        return Ok(());
    }

    let engine = global.engine(&options);
    let mut env = EnvFile::load(&layout.env_file())?;
    let outcome = keycloak::store_bootstrap_result(
        &engine,
        &mut env,
        &config,
        &summary,
        &options,
        prompter.as_mut(),
    )
    .await?;
    if outcome != SecretOutcome::Kept {
        eprintln!("Stored the backend client secret; redeploy to pick it up");
    }
    Ok(())
}
