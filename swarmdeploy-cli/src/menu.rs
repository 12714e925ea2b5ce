//! Interactive day-2 menu.
//!
//! Every pass re-detects the project state from disk and Swarm, offers the
//! actions that make sense in that state and runs the chosen one. Actions
//! share nothing in memory; a failed action is reported and the menu returns.

use std::io::IsTerminal;

use anyhow::bail;
use console::style;
use swarmdeploy::env::Component;
use swarmdeploy::prompt::Prompter;
use swarmdeploy::state::{ProjectState, detect_state};

use crate::cli::{GlobalFlags, OutputFlags};
use crate::commands;
use crate::terminal::TerminalPrompter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuAction {
    Setup,
    Secrets,
    Deploy,
    Status,
    Logs,
    Scale,
    UpdateImage,
    Rollback,
    Migrate,
    AttachBackupNetwork,
    DetachBackupNetwork,
    KeycloakBootstrap,
    Cicd,
    Remove,
    Exit,
}

impl MenuAction {
    pub fn label(&self) -> &'static str {
        match self {
            MenuAction::Setup => "Run the setup wizard",
            MenuAction::Secrets => "Create missing required secrets",
            MenuAction::Deploy => "Deploy the stack",
            MenuAction::Status => "Health check",
            MenuAction::Logs => "Show service logs",
            MenuAction::Scale => "Scale a service",
            MenuAction::UpdateImage => "Update the image version",
            MenuAction::Rollback => "Roll back the services",
            MenuAction::Migrate => "Apply database migrations",
            MenuAction::AttachBackupNetwork => "Attach the backup network",
            MenuAction::DetachBackupNetwork => "Detach the backup network",
            MenuAction::KeycloakBootstrap => "Bootstrap Keycloak",
            MenuAction::Cicd => "GitHub Actions setup guidance",
            MenuAction::Remove => "Remove the stack",
            MenuAction::Exit => "Exit",
        }
    }
}

/// Actions offered in `state`, in display order; always ends with `Exit`.
pub fn actions_for(state: ProjectState) -> Vec<MenuAction> {
    use MenuAction::*;
    match state {
        ProjectState::NotConfigured => vec![Setup, Exit],
        ProjectState::Configuring => vec![Setup, Secrets, Exit],
        ProjectState::Ready => vec![Deploy, Secrets, Cicd, KeycloakBootstrap, Setup, Exit],
        ProjectState::Deployed => vec![
            Status,
            Logs,
            Deploy,
            Scale,
            UpdateImage,
            Rollback,
            Migrate,
            AttachBackupNetwork,
            DetachBackupNetwork,
            KeycloakBootstrap,
            Cicd,
            Secrets,
            Remove,
            Exit,
        ],
    }
}

pub async fn run(global: &GlobalFlags) -> anyhow::Result<()> {
    if global.non_interactive || global.yes || !std::io::stdin().is_terminal() {
        bail!("the menu needs an interactive terminal; use the subcommands instead");
    }
    let layout = global.layout();
    let mut prompter = TerminalPrompter::new();

    loop {
        let options = global.options();
        let engine = global.engine(&options);
        let state = detect_state(&engine, &layout, &options).await?;
        println!(
            "\n{} {}  [{}]",
            style("statechecker").bold(),
            layout.root().display(),
            style(state).cyan()
        );

        let actions = actions_for(state);
        let labels: Vec<&str> = actions.iter().map(MenuAction::label).collect();
        let choice = prompter.select("What do you want to do?", &labels, 0)?;
        let action = actions[choice];
        if action == MenuAction::Exit {
            return Ok(());
        }

        if let Err(error) = dispatch(action, global, &mut prompter).await {
            eprintln!("{} {}", style("Error:").red().bold(), error);
        }
    }
}

async fn dispatch(
    action: MenuAction,
    global: &GlobalFlags,
    prompter: &mut TerminalPrompter,
) -> anyhow::Result<()> {
    let table = || OutputFlags {
        format: "table".into(),
    };
    match action {
        MenuAction::Setup => commands::setup::execute(commands::setup::SetupArgs {}, global).await,
        MenuAction::Secrets => {
            commands::secrets::execute(
                commands::secrets::SecretsArgs {
                    command: commands::secrets::SecretsCommand::Create {
                        name: None,
                        stdin: false,
                        recreate: false,
                    },
                },
                global,
            )
            .await
        }
        MenuAction::Deploy => {
            commands::deploy::execute(commands::deploy::DeployArgs {}, global).await
        }
        MenuAction::Status => {
            let no_logs = !prompter.confirm("Include logs?", true)?;
            commands::status::execute(
                commands::status::StatusArgs {
                    wait: 0,
                    no_logs,
                    since: None,
                    tail: 50,
                    output: table(),
                },
                global,
            )
            .await
        }
        MenuAction::Logs => {
            let service = prompter.input("Service (empty for all)", Some(""))?;
            let service = service.trim();
            commands::status::logs(
                commands::status::LogsArgs {
                    service: (!service.is_empty()).then(|| service.to_string()),
                    since: None,
                    tail: 100,
                },
                global,
            )
            .await
        }
        MenuAction::Scale => {
            let names: Vec<&str> = Component::ALL.iter().map(Component::service_name).collect();
            let component = Component::ALL[prompter.select("Service", &names, 0)?];
            let replicas = prompter.input("Replicas", Some("1"))?.trim().parse()?;
            commands::scale::execute(commands::scale::ScaleArgs { component, replicas }, global)
                .await
        }
        MenuAction::UpdateImage => {
            let version = prompter.input("Image version", None)?;
            commands::scale::update_image(commands::scale::UpdateImageArgs { version }, global)
                .await
        }
        MenuAction::Rollback => {
            if !prompter.confirm("Roll every service back to its previous version?", false)? {
                return Ok(());
            }
            commands::deploy::rollback(commands::deploy::RollbackArgs {}, global).await
        }
        MenuAction::Migrate => {
            commands::migrate::execute(
                commands::migrate::MigrateArgs {
                    list: false,
                    output: table(),
                },
                global,
            )
            .await
        }
        MenuAction::AttachBackupNetwork | MenuAction::DetachBackupNetwork => {
            let command = if action == MenuAction::AttachBackupNetwork {
                commands::backup_network::BackupNetworkCommand::Attach
            } else {
                commands::backup_network::BackupNetworkCommand::Detach
            };
            commands::backup_network::execute(
                commands::backup_network::BackupNetworkArgs { command },
                global,
            )
            .await
        }
        MenuAction::KeycloakBootstrap => {
            let admin_user = prompter.input("Keycloak admin user", Some("admin"))?;
            let admin_password = prompter.password("Keycloak admin password", false)?;
            let user = prompter.input("Initial user (username:password:role1,role2)", None)?;
            commands::keycloak::execute(
                commands::keycloak::KeycloakArgs {
                    command: commands::keycloak::KeycloakCommand::Bootstrap(
                        commands::keycloak::BootstrapArgs {
                            base_url: None,
                            admin_user,
                            admin_password,
                            realm: None,
                            frontend_client_id: None,
                            backend_client_id: None,
                            frontend_root_url: swarmdeploy::keycloak::DEFAULT_FRONTEND_ROOT_URL
                                .into(),
                            api_root_url: swarmdeploy::keycloak::DEFAULT_API_ROOT_URL.into(),
                            roles: Vec::new(),
                            users: vec![user.parse()?],
                            no_store: false,
                            output: table(),
                        },
                    ),
                },
                global,
            )
            .await
        }
        MenuAction::Cicd => {
            commands::cicd::execute(
                commands::cicd::CicdArgs {
                    commands: true,
                    repo: None,
                    output: table(),
                },
                global,
            )
            .await
        }
        MenuAction::Remove => {
            commands::deploy::remove(commands::deploy::RemoveArgs { no_wait: false }, global).await
        }
        MenuAction::Exit => Ok(()),
    }
}
