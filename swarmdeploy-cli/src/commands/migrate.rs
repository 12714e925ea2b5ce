//! `swarmdeploy migrate`: apply pending SQL migrations.

use std::io::Write;

use clap::Args;
use swarmdeploy::db;

use crate::cli::{GlobalFlags, OutputFlags};
use crate::formatter::{self, OutputFormat};

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Only list the migration files that would be considered
    #[arg(long)]
    pub list: bool,

    #[command(flatten)]
    pub output: OutputFlags,
}

pub async fn execute(args: MigrateArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let layout = global.layout();

    if args.list {
        for migration in db::discover_migrations(&layout.migrations_dir())? {
            println!("{}  {}", migration.version, migration.path.display());
        }
        return Ok(());
    }

    let format = OutputFormat::parse(&args.output.format)?;
    let options = global.options();
    let engine = global.engine(&options);
    let (_, settings) = global.load_settings()?;

    let report = db::migrate(&engine, &layout, &settings, &options).await?;
    formatter::print_output(&mut std::io::stdout(), &report, &format, |w, report| {
        for version in &report.applied {
            writeln!(w, "Applied {}", version)?;
        }
        for version in &report.skipped {
            writeln!(w, "Already applied {}", version)?;
        }
        if report.applied.is_empty() {
            writeln!(w, "Database is up to date")?;
        }
        Ok(())
    })?;
    Ok(())
}
