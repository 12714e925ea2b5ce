//! `swarmdeploy env`: read and change `.env` values.

use std::io::Write;

use anyhow::{anyhow, bail};
use clap::{Args, Subcommand};
use serde::Serialize;
use swarmdeploy::cicd::is_sensitive;
use swarmdeploy::env::update_env_values;
use swarmdeploy::EnvFile;
use tabled::Tabled;

use crate::cli::{GlobalFlags, OutputFlags};
use crate::formatter::{self, OutputFormat};

const MASK: &str = "********";

#[derive(Args, Debug)]
pub struct EnvArgs {
    #[command(subcommand)]
    pub command: EnvCommand,
}

#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    /// Print one value
    Get {
        key: String,
    },
    /// Set one or more KEY=VALUE pairs (added when absent)
    Set {
        #[arg(value_name = "KEY=VALUE", required = true)]
        pairs: Vec<String>,
    },
    /// List every key
    #[command(visible_alias = "ls")]
    List {
        /// Print credential-like values instead of masking them
        #[arg(long)]
        show_secrets: bool,

        #[command(flatten)]
        output: OutputFlags,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct EnvRow {
    #[tabled(rename = "KEY")]
    key: String,
    #[tabled(rename = "VALUE")]
    value: String,
}

pub async fn execute(args: EnvArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let path = global.layout().env_file();
    match args.command {
        EnvCommand::Get { key } => {
            let env = EnvFile::load(&path)?;
            let value = env
                .get(&key)
                .ok_or_else(|| anyhow!("{} is not set in {}", key, path.display()))?;
            println!("{}", value);
        }
        EnvCommand::Set { pairs } => {
            let parsed = parse_pairs(&pairs)?;
            let refs: Vec<(&str, &str)> =
                parsed.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            update_env_values(&path, &refs)?;
            for (key, _) in &parsed {
                println!("Set {}", key);
            }
        }
        EnvCommand::List {
            show_secrets,
            output,
        } => {
            let format = OutputFormat::parse(&output.format)?;
            let env = EnvFile::load(&path)?;
            let rows: Vec<EnvRow> = env
                .entries()
                .map(|(key, value)| EnvRow {
                    key: key.to_string(),
                    value: if !show_secrets && is_sensitive(key) {
                        MASK.to_string()
                    } else {
                        value.to_string()
                    },
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

fn parse_pairs(pairs: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| {
            let Some((key, value)) = pair.split_once('=') else {
                bail!("'{}' is not KEY=VALUE", pair);
            };
            let key = key.trim();
            if key.is_empty() || key.contains(char::is_whitespace) {
                bail!("'{}' is not a valid key", key);
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}
