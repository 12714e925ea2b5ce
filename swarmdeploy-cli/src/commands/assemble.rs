//! `swarmdeploy assemble`: build `.env` and `swarm-stack.yml` from templates.

use clap::Args;
use swarmdeploy::template::{self, AssemblyOptions};
use swarmdeploy::{EnvFile, ProxyType, SslMode, StackSettings};
use swarmdeploy_shared::constants::env_keys as keys;

use crate::cli::GlobalFlags;

#[derive(Args, Debug)]
pub struct AssembleArgs {
    /// Proxy mode (default: PROXY_TYPE from .env, else none)
    #[arg(long, value_name = "traefik|none")]
    pub proxy: Option<ProxyType>,

    /// Where TLS terminates in traefik mode (default: SSL_MODE from .env, else direct)
    #[arg(long, value_name = "direct|proxy")]
    pub ssl_mode: Option<SslMode>,

    /// Include the web frontend
    #[arg(long)]
    pub with_web: bool,

    /// Include phpMyAdmin
    #[arg(long)]
    pub with_phpmyadmin: bool,

    /// Also regenerate .env from the env templates (the old file is backed up)
    #[arg(long)]
    pub write_env: bool,

    /// Print the stack document instead of writing swarm-stack.yml
    #[arg(long, conflicts_with = "write_env")]
    pub stdout: bool,
}

pub async fn execute(args: AssembleArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let layout = global.layout();

    let mut opts = if layout.is_configured() {
        let env = EnvFile::load(&layout.env_file())?;
        AssemblyOptions::from_settings(&StackSettings::from_env(&env, layout.root())?)
    } else {
        AssemblyOptions {
            proxy_type: ProxyType::None,
            ssl_mode: SslMode::default(),
            include_phpmyadmin: false,
            include_web: false,
        }
    };
    if let Some(proxy) = args.proxy {
        opts.proxy_type = proxy;
    }
    if let Some(ssl) = args.ssl_mode {
        opts.ssl_mode = ssl;
    }
    opts.include_web |= args.with_web;
    opts.include_phpmyadmin |= args.with_phpmyadmin;

    if args.stdout {
        print!("{}", template::assemble_stack(layout.setup_dir(), &opts)?);
        return Ok(());
    }

    if args.write_env {
        let mut env = EnvFile::parse(&template::assemble_env(layout.setup_dir(), opts.proxy_type)?);
        env.set(keys::SSL_MODE, opts.ssl_mode.as_str());
        env.set(keys::WEB_ENABLED, opts.include_web.to_string());
        env.set(keys::PHPMYADMIN_ENABLED, opts.include_phpmyadmin.to_string());
        let path = layout.env_file();
        if let Some(backup) =
            template::write_generated(&path, &env.render(), &layout.env_backup_dir())?
        {
            println!("Backed up {}", backup.display());
        }
        println!("Wrote {}", path.display());
    }

    let path = template::generate_stack_file(&layout, &opts)?;
    println!(
        "Wrote {} ({}, web: {}, phpmyadmin: {})",
        path.display(),
        opts.proxy_type,
        opts.include_web,
        opts.include_phpmyadmin
    );
    Ok(())
}
