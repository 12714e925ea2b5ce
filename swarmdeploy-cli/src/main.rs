mod cli;
mod commands;
mod config;
mod formatter;
mod menu;
mod terminal;

use std::process;

use clap::Parser;
use cli::Cli;
use swarmdeploy::DeployError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start the async runtime: {}", e);
            process::exit(1);
        }
    };

    let code = rt.block_on(run_cli());
    process::exit(code);
}

async fn run_cli() -> i32 {
    let cli = Cli::parse();

    // Initialize tracing based on --debug flag
    let level = if cli.global.debug { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        cli::Commands::Setup(args) => commands::setup::execute(args, &cli.global).await,
        cli::Commands::Menu(args) => commands::menu::execute(args, &cli.global).await,
        cli::Commands::Assemble(args) => commands::assemble::execute(args, &cli.global).await,
        cli::Commands::Env(args) => commands::env::execute(args, &cli.global).await,
        cli::Commands::Secrets(args) => commands::secrets::execute(args, &cli.global).await,
        cli::Commands::Deploy(args) => commands::deploy::execute(args, &cli.global).await,
        cli::Commands::Remove(args) => commands::deploy::remove(args, &cli.global).await,
        cli::Commands::Rollback(args) => commands::deploy::rollback(args, &cli.global).await,
        cli::Commands::Status(args) => commands::status::execute(args, &cli.global).await,
        cli::Commands::Logs(args) => commands::status::logs(args, &cli.global).await,
        cli::Commands::Scale(args) => commands::scale::execute(args, &cli.global).await,
        cli::Commands::UpdateImage(args) => {
            commands::scale::update_image(args, &cli.global).await
        }
        cli::Commands::Migrate(args) => commands::migrate::execute(args, &cli.global).await,
        cli::Commands::BackupNetwork(args) => {
            commands::backup_network::execute(args, &cli.global).await
        }
        cli::Commands::Keycloak(args) => commands::keycloak::execute(args, &cli.global).await,
        cli::Commands::Cicd(args) => commands::cicd::execute(args, &cli.global).await,
        cli::Commands::NoProxy(args) => commands::no_proxy::execute(args, &cli.global).await,
        cli::Commands::Completion(args) => commands::completion::execute(args),
    };

    match result {
        Ok(()) => 0,
        Err(error) => report(&error),
    }
}

/// Print `error` (and its hint) to stderr and pick the exit code.
fn report(error: &anyhow::Error) -> i32 {
    eprintln!("Error: {}", error);
    match error.downcast_ref::<DeployError>() {
        Some(deploy) => {
            if let Some(hint) = deploy.hint() {
                eprintln!("Hint: {}", hint);
            }
            deploy.exit_code()
        }
        None => 1,
    }
}
