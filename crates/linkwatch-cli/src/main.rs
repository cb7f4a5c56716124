use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use linkwatch_core::{
    ClientConfig, ConnectionStatus, ConnectivityMonitor, Environment, HttpServiceClient,
    MonitorConfig, MonitorPhase, ProbeStats,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod report;
mod viewer;

#[derive(Debug, Parser)]
#[command(name = "linkwatch")]
#[command(about = "Backend reachability monitor")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, env = "LINKWATCH_ENV", default_value = "development")]
    env: Environment,

    #[arg(long, env = "LINKWATCH_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, default_value_t = 30)]
    interval_secs: u64,

    #[arg(long)]
    request_timeout_ms: Option<u64>,

    #[arg(long, default_value_t = 64 * 1024)]
    max_body_bytes: usize,
}

#[derive(Debug, Subcommand)]
enum Command {
    Check {
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    Watch {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    View,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum OutputFormat {
    Human,
    Json,
    Ndjson,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let client_config = ClientConfig {
        request_timeout: cli.request_timeout_ms.map(Duration::from_millis),
        max_body_bytes: cli.max_body_bytes,
        ..ClientConfig::for_environment(cli.env, cli.base_url.clone())?
    };
    let monitor_config = MonitorConfig {
        probe_interval: Duration::from_secs(cli.interval_secs),
    };

    info!(env = %cli.env, base_url = %client_config.base_url, "resolved backend");
    let client = HttpServiceClient::new(client_config)?;
    let monitor = ConnectivityMonitor::new(client, monitor_config);

    match cli.command {
        Command::Check { format } => {
            let status = monitor.check_connection().await;
            print_status(&status, monitor.phase(), &monitor.stats(), format)?;
            if !status.is_connected {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Watch { format } => {
            watch_loop(&monitor, format).await?;
        }
        Command::View => {
            viewer::run_viewer(Arc::new(monitor)).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn watch_loop(monitor: &ConnectivityMonitor<HttpServiceClient>, format: OutputFormat) -> Result<()> {
    let mut updates = monitor.subscribe();
    monitor.start();
    info!(interval_secs = monitor.config().probe_interval.as_secs(), "watching backend");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("received ctrl-c, stopping");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = updates.borrow_and_update().clone();
                if status.is_loading {
                    continue;
                }
                print_status(&status, monitor.phase(), &monitor.stats(), format)?;
                info!(connected = %status.is_connected, "probe completed");
            }
        }
    }

    monitor.stop();
    Ok(())
}

fn print_status(
    status: &ConnectionStatus,
    phase: MonitorPhase,
    stats: &ProbeStats,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report::to_json(status, phase, stats))?);
        }
        OutputFormat::Ndjson => {
            println!("{}", serde_json::to_string(&report::to_json(status, phase, stats))?);
        }
        OutputFormat::Human => {
            for line in report::human_lines(status, phase, stats) {
                println!("{line}");
            }
        }
    }

    Ok(())
}
