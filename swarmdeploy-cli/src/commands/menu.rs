//! `swarmdeploy menu`: state-aware interactive loop.

use clap::Args;

use crate::cli::GlobalFlags;

#[derive(Args, Debug)]
pub struct MenuArgs {}

pub async fn execute(_args: MenuArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    crate::menu::run(global).await
}
