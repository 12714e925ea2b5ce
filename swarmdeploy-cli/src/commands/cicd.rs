//! `swarmdeploy cicd`: GitHub Actions variables and secrets for this checkout.

use std::io::Write;

use clap::Args;
use swarmdeploy::EnvFile;
use swarmdeploy::cicd::{Kind, github_actions_guidance};
use tabled::Tabled;

use crate::cli::{GlobalFlags, OutputFlags};
use crate::formatter::{self, OutputFormat};

#[derive(Args, Debug)]
pub struct CicdArgs {
    /// Print ready-to-run `gh` commands instead of a listing
    #[arg(long)]
    pub commands: bool,

    /// Repository passed to `gh --repo` (owner/name)
    #[arg(long, requires = "commands")]
    pub repo: Option<String>,

    #[command(flatten)]
    pub output: OutputFlags,
}

#[derive(Tabled)]
struct GuidanceRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "KIND")]
    kind: &'static str,
    #[tabled(rename = "VALUE")]
    value: String,
}

pub async fn execute(args: CicdArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let env = EnvFile::load(&global.layout().env_file())?;
    let guidance = github_actions_guidance(&env);

    if args.commands {
        print!("{}", guidance.render_commands(args.repo.as_deref()));
        return Ok(());
    }

    let format = OutputFormat::parse(&args.output.format)?;
    formatter::print_output(&mut std::io::stdout(), &guidance, &format, |w, guidance| {
        let rows = guidance.entries.iter().map(|e| GuidanceRow {
            name: e.name.clone(),
            kind: match e.kind {
                Kind::Variable => "variable",
                Kind::Secret => "secret",
            },
            value: e.value.clone().unwrap_or_else(|| "(set in GitHub)".into()),
        });
        writeln!(w, "{}", formatter::create_table(rows))?;
        Ok(())
    })?;
    Ok(())
}
