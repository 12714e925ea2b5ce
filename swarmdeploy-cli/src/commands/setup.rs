//! `swarmdeploy setup`: first-run wizard.

use clap::Args;
use swarmdeploy::secrets::SecretOutcome;
use swarmdeploy::wizard::SetupWizard;

use crate::cli::GlobalFlags;

#[derive(Args, Debug)]
pub struct SetupArgs {}

pub async fn execute(_args: SetupArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let layout = global.layout();
    let options = global.options();
    let engine = global.engine(&options);
    let mut prompter = global.prompter();

    let report = SetupWizard::new(&engine, &layout, &options)
        .run(prompter.as_mut())
        .await?;

    println!("Proxy:       {}", report.choices.proxy_type);
    println!("Env file:    {}", report.env_file.display());
    println!("Stack file:  {}", report.stack_file.display());
    println!("Data root:   {}", report.data_root.root.display());
    for (name, outcome) in &report.secrets {
        let verb = match outcome {
            SecretOutcome::Created => "created",
            SecretOutcome::Recreated => "recreated",
            SecretOutcome::Kept => "kept",
        };
        println!("Secret {}: {}", name, verb);
    }
    println!();
    println!("Setup complete. Next: swarmdeploy deploy");
    Ok(())
}
