//! `swarmdeploy deploy | remove | rollback`.

use clap::Args;
use swarmdeploy::{DeployError, DockerEngine, preflight, stack};

use crate::cli::{self, GlobalFlags};

#[derive(Args, Debug)]
pub struct DeployArgs {}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Return right after `docker stack rm` instead of waiting for the networks to go
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Args, Debug)]
pub struct RollbackArgs {}

pub async fn execute(_args: DeployArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let layout = global.layout();
    let options = global.options();
    let engine = global.engine(&options);

    preflight::check_engine(&engine).await?;
    let report = stack::deploy(&engine, &layout, &options).await?;

    for name in &report.placeholders {
        println!("Created disabled placeholder secret {}", name);
    }
    println!(
        "Deployed stack {} ({} mode). Check it with: swarmdeploy status",
        report.stack, report.proxy_type
    );
    Ok(())
}

pub async fn remove(args: RemoveArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let options = global.options();
    let engine = global.engine(&options);
    let (_, settings) = global.load_settings()?;
    let stack_name = settings.stack_name;

    if !engine.stack_list().await?.iter().any(|s| s.name == stack_name) {
        return Err(DeployError::StackNotFound(stack_name).into());
    }

    let mut prompter = global.prompter();
    if !prompter.confirm(&format!("Remove stack {}?", stack_name), false)? {
        return Err(DeployError::Aborted(format!("stack {} left running", stack_name)).into());
    }

    if args.no_wait {
        engine.stack_remove(&stack_name).await?;
        println!("Removal of {} requested", stack_name);
    } else {
        stack::remove_and_wait(
            &engine,
            &stack_name,
            cli::schedule(&options, options.stack_removal_timeout()),
        )
        .await?;
        println!("Removed stack {}", stack_name);
    }
    Ok(())
}

pub async fn rollback(_args: RollbackArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let options = global.options();
    let engine = global.engine(&options);
    let (_, settings) = global.load_settings()?;

    let report = stack::rollback(&engine, &settings.stack_name).await?;
    for service in &report.rolled_back {
        println!("Rolled back {}", service);
    }
    for (service, error) in &report.failed {
        eprintln!("Could not roll back {}: {}", service, error);
    }
    if report.rolled_back.is_empty() && !report.failed.is_empty() {
        anyhow::bail!("no service of {} could be rolled back", settings.stack_name);
    }
    Ok(())
}
