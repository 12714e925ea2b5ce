//! `swarmdeploy scale` and `swarmdeploy update-image`.

use clap::Args;
use swarmdeploy::env::Component;
use swarmdeploy::stack;

use crate::cli::GlobalFlags;

#[derive(Args, Debug)]
pub struct ScaleArgs {
    /// api, check, web or phpmyadmin
    pub component: Component,

    /// Desired replica count (0 stops the service)
    pub replicas: u32,
}

#[derive(Args, Debug)]
pub struct UpdateImageArgs {
    /// Image tag for the api and check services, e.g. 1.4.2
    pub version: String,
}

pub async fn execute(args: ScaleArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let options = global.options();
    let engine = global.engine(&options);
    let (mut env, settings) = global.load_settings()?;

    stack::scale(&engine, &mut env, &settings, args.component, args.replicas).await?;
    println!(
        "Scaled {} to {} (saved {})",
        settings.service(args.component.service_name()),
        args.replicas,
        args.component.replicas_key()
    );
    Ok(())
}

pub async fn update_image(args: UpdateImageArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let options = global.options();
    let engine = global.engine(&options);
    let (mut env, settings) = global.load_settings()?;

    let image = stack::update_image(&engine, &mut env, &settings, &args.version).await?;
    println!("Services now run {}", image);
    Ok(())
}
