//! `swarmdeploy no-proxy`: rewrite a rendered Traefik stack into a direct-port one.

use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use swarmdeploy::compose::{NoProxyPorts, rewrite_no_proxy};
use swarmdeploy::{EnvFile, StackSettings};

use crate::cli::GlobalFlags;

#[derive(Args, Debug)]
pub struct NoProxyArgs {
    /// Rendered stack file (`-` for stdin)
    pub input: PathBuf,

    /// Write here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Published API port (default: API_PORT from .env, else 8787)
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Published web port (default: WEB_PORT from .env, else 8080)
    #[arg(long)]
    pub web_port: Option<u16>,

    /// Published phpMyAdmin port (default: PHPMYADMIN_PORT from .env, else 8081)
    #[arg(long)]
    pub phpmyadmin_port: Option<u16>,
}

pub async fn execute(args: NoProxyArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let layout = global.layout();
    let mut ports = if layout.is_configured() {
        let env = EnvFile::load(&layout.env_file())?;
        NoProxyPorts::from_settings(&StackSettings::from_env(&env, layout.root())?)
    } else {
        NoProxyPorts::default()
    };
    ports.api = args.api_port.unwrap_or(ports.api);
    ports.web = args.web_port.unwrap_or(ports.web);
    ports.phpmyadmin = args.phpmyadmin_port.unwrap_or(ports.phpmyadmin);

    let content = if args.input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.input)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", args.input.display(), e))?
    };

    let rewritten = rewrite_no_proxy(&content, &ports)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, rewritten)?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{}", rewritten),
    }
    Ok(())
}
