//! `swarmdeploy secrets`: check and create the stack's Swarm secrets.

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::bail;
use clap::{Args, Subcommand};
use serde::Serialize;
use swarmdeploy::secrets::{self, RecreatePolicy, SecretManager, SecretOutcome};
use swarmdeploy::{DeployError, DockerEngine};
use tabled::Tabled;

use crate::cli::{GlobalFlags, OutputFlags};
use crate::formatter::{self, OutputFormat};

#[derive(Args, Debug)]
pub struct SecretsArgs {
    #[command(subcommand)]
    pub command: SecretsCommand,
}

#[derive(Subcommand, Debug)]
pub enum SecretsCommand {
    /// Report required (and optionally optional) secrets; fails when a required one is missing
    Check {
        /// Also report the optional integration secrets
        #[arg(long)]
        optional: bool,

        #[command(flatten)]
        output: OutputFlags,
    },
    /// Create one secret, or every missing required secret when NAME is omitted
    Create {
        name: Option<String>,

        /// Read the value from stdin instead of prompting
        #[arg(long, requires = "name")]
        stdin: bool,

        /// Offer to recreate secrets that already exist
        #[arg(long)]
        recreate: bool,
    },
    /// Create every secret listed in a secrets.env file
    FromFile {
        /// Batch file (default: <project>/secrets.env)
        path: Option<PathBuf>,

        /// Offer to recreate secrets that already exist
        #[arg(long)]
        recreate: bool,
    },
    /// List the Swarm secrets
    #[command(visible_alias = "ls")]
    List {
        #[command(flatten)]
        output: OutputFlags,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct CheckRow {
    #[tabled(rename = "SECRET")]
    name: String,
    #[tabled(rename = "KIND")]
    kind: &'static str,
    #[tabled(rename = "PRESENT")]
    present: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct SecretRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "CREATED")]
    created_at: String,
    #[tabled(rename = "KNOWN")]
    known: bool,
}

fn policy(recreate: bool) -> RecreatePolicy {
    if recreate {
        RecreatePolicy::Ask
    } else {
        RecreatePolicy::Keep
    }
}

fn print_outcome(name: &str, outcome: SecretOutcome) {
    match outcome {
        SecretOutcome::Created => println!("Created {}", name),
        SecretOutcome::Recreated => println!("Recreated {}", name),
        SecretOutcome::Kept => println!("Kept existing {}", name),
    }
}

pub async fn execute(args: SecretsArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let options = global.options();
    let engine = global.engine(&options);
    let manager = SecretManager::new(&engine, &options);

    match args.command {
        SecretsCommand::Check { optional, output } => {
            let format = OutputFormat::parse(&output.format)?;
            let required = manager.check_required().await?;
            let mut rows: Vec<CheckRow> = Vec::new();
            push_rows(&mut rows, "required", &required.present, &required.missing);
            if optional {
                let optional = manager.check_optional().await?;
                push_rows(&mut rows, "optional", &optional.present, &optional.missing);
            }
            formatter::print_output(&mut std::io::stdout(), &rows, &format, |w, rows| {
                writeln!(w, "{}", formatter::create_table(rows))?;
                Ok(())
            })?;
            if !required.is_complete() {
                return Err(DeployError::precondition_with_hint(
                    format!("missing required secrets: {}", required.missing.join(", ")),
                    "run `swarmdeploy secrets create` or `swarmdeploy secrets from-file`",
                )
                .into());
            }
        }
        SecretsCommand::Create {
            name,
            stdin,
            recreate,
        } => {
            let mut prompter = global.prompter();
            match name {
                Some(name) if stdin => {
                    let mut value = Vec::new();
                    std::io::stdin().read_to_end(&mut value)?;
                    while value.last().is_some_and(|b| *b == b'\n' || *b == b'\r') {
                        value.pop();
                    }
                    if value.is_empty() {
                        bail!("no value on stdin for {}", name);
                    }
                    let outcome = manager
                        .create(&name, &value, policy(recreate), prompter.as_mut())
                        .await?;
                    print_outcome(&name, outcome);
                }
                Some(name) => {
                    let outcome = manager
                        .create_interactive(&name, policy(recreate), prompter.as_mut())
                        .await?;
                    print_outcome(&name, outcome);
                }
                None => {
                    let missing = manager.check_required().await?.missing;
                    if missing.is_empty() {
                        println!("All required secrets exist");
                    }
                    for name in missing {
                        let outcome = manager
                            .create_interactive(&name, policy(recreate), prompter.as_mut())
                            .await?;
                        print_outcome(&name, outcome);
                    }
                }
            }
        }
        SecretsCommand::FromFile { path, recreate } => {
            let path = path.unwrap_or_else(|| global.layout().secrets_file());
            let mut prompter = global.prompter();
            let outcomes = manager
                .create_from_file(&path, policy(recreate), prompter.as_mut())
                .await?;
            for (name, outcome) in outcomes {
                print_outcome(&name, outcome);
            }
        }
        SecretsCommand::List { output } => {
            let format = OutputFormat::parse(&output.format)?;
            let rows: Vec<SecretRow> = engine
                .secret_list()
                .await?
                .into_iter()
                .map(|s| SecretRow {
                    known: secrets::lookup(&s.name).is_some(),
                    name: s.name,
                    created_at: s.created_at,
                })
                .collect();
            formatter::print_output(&mut std::io::stdout(), &rows, &format, |w, rows| {
                writeln!(w, "{}", formatter::create_table(rows))?;
                Ok(())
            })?;
        }
    }
    Ok(())
}

fn push_rows(rows: &mut Vec<CheckRow>, kind: &'static str, present: &[String], missing: &[String]) {
    rows.extend(present.iter().map(|name| CheckRow {
        name: name.clone(),
        kind,
        present: true,
    }));
    rows.extend(missing.iter().map(|name| CheckRow {
        name: name.clone(),
        kind,
        present: false,
    }));
}
