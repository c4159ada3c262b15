//! Upstream sentinel (v1)
//!
//! Watches a per-instance health gauge in a Prometheus-compatible backend and
//! takes degraded instances out of a load balancer's upstream set, putting
//! them back once they recover.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────┐   instance → value   ┌──────────────┐
//!   │    feed      │─────────────────────▶│   health     │
//!   │ (Prometheus) │                      │  tracker     │
//!   └──────────────┘                      └──────┬───────┘
//!                                                │ Remove / Restore
//!                                                ▼
//!   ┌──────────────┐   changed?           ┌──────────────┐
//!   │   reload     │◀─────────────────────│  upstream    │
//!   │  command     │                      │   editor     │
//!   └──────┬───────┘                      └──────────────┘
//!          │
//!          ▼
//!   ┌──────────────┐   shutdown           ┌──────────────┐
//!   │   events     │─────────────────────▶│ events.json  │
//!   └──────────────┘                      └──────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use upstream_sentinel::config::{resolve_config, ConfigOverrides};
use upstream_sentinel::lifecycle::{spawn_signal_listener, Shutdown};
use upstream_sentinel::observability::{logging, metrics};
use upstream_sentinel::Controller;

#[derive(Parser)]
#[command(name = "upstream-sentinel")]
#[command(about = "Detects degraded instances and removes them from the load balancer upstream", long_about = None)]
struct Cli {
    /// TOML configuration file; flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the metrics backend.
    #[arg(long)]
    prometheus_url: Option<String>,

    /// Gauge (query expression) holding the per-instance health value.
    #[arg(long)]
    metric: Option<String>,

    /// Seconds between health checks.
    #[arg(long)]
    poll_interval: Option<f64>,

    /// Consecutive unhealthy samples needed to confirm degradation.
    #[arg(long)]
    consecutive: Option<u32>,

    /// Minimum health value considered degraded.
    #[arg(long)]
    threshold: Option<f64>,

    /// Run detection without touching the upstream file or reloading.
    #[arg(long)]
    dry_run: bool,

    /// Debug-level logging.
    #[arg(short, long)]
    verbose: bool,

    /// Where the event log is written on exit.
    #[arg(long)]
    events_file: Option<PathBuf>,

    /// Load balancer upstream file to edit.
    #[arg(long)]
    upstream_file: Option<PathBuf>,

    /// Run a single cycle, then exit.
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            backend_url: self.prometheus_url.clone(),
            metric: self.metric.clone(),
            poll_interval_secs: self.poll_interval,
            consecutive: self.consecutive,
            threshold: self.threshold,
            dry_run: self.dry_run,
            verbose: self.verbose,
            events_path: self.events_file.clone(),
            upstream_path: self.upstream_file.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref(), cli.overrides())?;

    logging::init_tracing(&config.observability);
    tracing::info!("upstream-sentinel v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_listener(shutdown.clone())?;

    let mut controller = Controller::new(&config)?;
    let max_cycles = cli.once.then_some(1);
    let reason = controller.run(&shutdown, max_cycles).await;

    tracing::info!(reason = %reason, "Shutdown complete");
    Ok(())
}
