//! `swarmdeploy backup-network attach | detach`.

use clap::{Args, Subcommand};
use swarmdeploy::backup_network::{self, AttachOutcome, DetachOutcome};

use crate::cli::{self, GlobalFlags};

#[derive(Args, Debug)]
pub struct BackupNetworkArgs {
    #[command(subcommand)]
    pub command: BackupNetworkCommand,
}

#[derive(Subcommand, Debug)]
pub enum BackupNetworkCommand {
    /// Add BACKUP_NETWORK_NAME to the db service and wait until it shows up
    Attach,
    /// Remove the backup network from the db service
    Detach,
}

pub async fn execute(args: BackupNetworkArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let options = global.options();
    let engine = global.engine(&options);
    let (_, settings) = global.load_settings()?;
    let schedule = cli::schedule(&options, options.backup_network_timeout());
    let service = settings.service("db");

    match args.command {
        BackupNetworkCommand::Attach => {
            match backup_network::attach(&engine, &settings, schedule).await? {
                AttachOutcome::Attached => {
                    println!("Attached {} to {}", settings.backup_network, service)
                }
                AttachOutcome::AlreadyAttached => {
                    println!("{} is already on {}", service, settings.backup_network)
                }
            }
        }
        BackupNetworkCommand::Detach => {
            match backup_network::detach(&engine, &settings, schedule).await? {
                DetachOutcome::Detached => {
                    println!("Detached {} from {}", settings.backup_network, service)
                }
                DetachOutcome::NotAttached => {
                    println!("{} is not on {}", service, settings.backup_network)
                }
            }
        }
    }
    Ok(())
}
