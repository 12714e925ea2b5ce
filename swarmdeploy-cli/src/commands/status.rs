//! `swarmdeploy status` (health check) and `swarmdeploy logs`.

use std::io::Write;
use std::time::Duration;

use clap::Args;
use swarmdeploy::health::{HealthReport, HealthRequest, run_health_check};
use swarmdeploy::{DeployError, DockerEngine};
use tabled::Tabled;

use crate::cli::{GlobalFlags, OutputFlags};
use crate::formatter::{self, OutputFormat};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Seconds to wait before looking (lets a fresh deploy settle)
    #[arg(long, default_value_t = 0)]
    pub wait: u64,

    /// Leave service logs out of the report
    #[arg(long)]
    pub no_logs: bool,

    /// Only logs newer than this (e.g. 10m, 2024-01-01T00:00:00)
    #[arg(long, conflicts_with = "no_logs")]
    pub since: Option<String>,

    /// Log lines per service
    #[arg(long, default_value_t = 50)]
    pub tail: u32,

    #[command(flatten)]
    pub output: OutputFlags,
}

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Service inside the stack (api, check, db, ...); all services when omitted
    pub service: Option<String>,

    /// Only logs newer than this (e.g. 10m)
    #[arg(long)]
    pub since: Option<String>,

    /// Lines per service
    #[arg(long, default_value_t = 100)]
    pub tail: u32,
}

#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "SERVICE")]
    name: String,
    #[tabled(rename = "REPLICAS")]
    replicas: String,
    #[tabled(rename = "IMAGE")]
    image: String,
    #[tabled(rename = "PORTS")]
    ports: String,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "TASK")]
    name: String,
    #[tabled(rename = "NODE")]
    node: String,
    #[tabled(rename = "DESIRED")]
    desired: String,
    #[tabled(rename = "CURRENT")]
    current: String,
    #[tabled(rename = "ERROR")]
    error: String,
}

pub async fn execute(args: StatusArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let format = OutputFormat::parse(&args.output.format)?;
    let options = global.options();
    let engine = global.engine(&options);
    let (_, settings) = global.load_settings()?;

    let request = HealthRequest {
        wait: Duration::from_secs(args.wait),
        logs_since: args.since,
        logs_tail: Some(args.tail),
        include_logs: !args.no_logs,
        ..HealthRequest::new(&settings.stack_name)
    };
    let report = run_health_check(&engine, &request, &settings).await?;

    formatter::print_output(&mut std::io::stdout(), &report, &format, print_report)?;
    Ok(())
}

fn print_report<W: Write>(w: &mut W, report: &HealthReport) -> anyhow::Result<()> {
    writeln!(w, "Stack {}", report.stack)?;
    writeln!(
        w,
        "{}",
        formatter::create_table(report.services.iter().map(|s| ServiceRow {
            name: s.name.clone(),
            replicas: s.replicas.clone(),
            image: s.image.clone(),
            ports: s.ports.clone(),
        }))
    )?;
    writeln!(
        w,
        "{}",
        formatter::create_table(report.tasks.iter().map(|t| TaskRow {
            name: t.name.clone(),
            node: t.node.clone(),
            desired: t.desired_state.clone(),
            current: t.current_state.clone(),
            error: t.error.clone(),
        }))
    )?;

    if report.failed_tasks > 0 {
        writeln!(w, "WARNING: {} failed or rejected task(s)", report.failed_tasks)?;
    }
    if report.is_degraded() {
        writeln!(w, "Stack is degraded")?;
    }

    if !report.endpoints.is_empty() {
        writeln!(w, "\nEndpoints:")?;
        for endpoint in &report.endpoints {
            writeln!(w, "  {:<12} {}", endpoint.service, endpoint.url)?;
        }
    }
    for logs in &report.logs {
        writeln!(w, "\n==> {} <==", logs.service)?;
        write!(w, "{}", logs.logs)?;
    }
    Ok(())
}

pub async fn logs(args: LogsArgs, global: &GlobalFlags) -> anyhow::Result<()> {
    let options = global.options();
    let engine = global.engine(&options);
    let (_, settings) = global.load_settings()?;

    let services: Vec<String> = match &args.service {
        Some(service) => vec![settings.service(service)],
        None => engine
            .service_list(&settings.stack_name)
            .await?
            .into_iter()
            .map(|s| s.name)
            .collect(),
    };
    if services.is_empty() {
        return Err(DeployError::StackNotFound(settings.stack_name).into());
    }

    let multiple = services.len() > 1;
    let mut out = std::io::stdout();
    for service in services {
        let text = engine
            .service_logs(&service, args.since.as_deref(), Some(args.tail))
            .await?;
        if multiple {
            writeln!(out, "==> {} <==", service)?;
        }
        write!(out, "{}", text)?;
    }
    Ok(())
}
