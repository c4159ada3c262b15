use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;

use upstream_sentinel::config::{resolve_config, ConfigOverrides, SentinelConfig};
use upstream_sentinel::events::{EventKind, EventLog};
use upstream_sentinel::feed::{to_health_map, HealthFeedClient};
use upstream_sentinel::observability::logging;
use upstream_sentinel::reload::ReloadTrigger;
use upstream_sentinel::upstream::{EntryState, UpstreamEditor};

#[derive(Parser)]
#[command(name = "upstream-ctl")]
#[command(about = "Operator tool for the upstream sentinel", long_about = None)]
struct Cli {
    /// Sentinel configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Upstream file to inspect or edit (overrides the configuration).
    #[arg(short, long)]
    upstream_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List upstream entries and whether they are active
    Status,
    /// Disable an instance's upstream entry (dry-run unless --commit)
    Disable {
        instance: String,
        #[arg(long)]
        commit: bool,
        /// Reload the load balancer after a committed change
        #[arg(long)]
        reload: bool,
    },
    /// Restore an instance's upstream entry (dry-run unless --commit)
    Enable {
        instance: String,
        #[arg(long)]
        commit: bool,
        /// Reload the load balancer after a committed change
        #[arg(long)]
        reload: bool,
    },
    /// Print the current health value of every instance
    Query,
    /// Summarize a saved event log
    Events { path: Option<PathBuf> },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let overrides = ConfigOverrides {
        upstream_path: cli.upstream_file.clone(),
        ..Default::default()
    };
    let config = resolve_config(cli.config.as_deref(), overrides)?;
    logging::init_tracing(&config.observability);

    let editor = UpstreamEditor::from_config(&config.upstream);

    match cli.command {
        Commands::Status => {
            let entries = editor.entries()?;
            for entry in &entries {
                let state = match entry.state {
                    EntryState::Active => "active",
                    EntryState::Disabled => "DISABLED",
                };
                println!("{:>4}  {:<9} {}", entry.line, state, entry.instance);
            }
            let disabled = entries.iter().filter(|e| e.state == EntryState::Disabled).count();
            println!("{} entries, {} disabled", entries.len(), disabled);
        }
        Commands::Disable { instance, commit, reload } => {
            let changed = editor.try_disable(&instance, commit)?;
            report_edit("disable", &instance, changed, commit);
            maybe_reload(&config, changed && commit && reload).await?;
        }
        Commands::Enable { instance, commit, reload } => {
            let changed = editor.try_enable(&instance, commit)?;
            report_edit("enable", &instance, changed, commit);
            maybe_reload(&config, changed && commit && reload).await?;
        }
        Commands::Query => {
            let client = HealthFeedClient::new(&config.feed)?;
            let states = to_health_map(client.fetch().await?);
            let out = json!({
                "metric": client.metric(),
                "threshold": config.detection.threshold,
                "instances": states,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Events { path } => {
            let path = path.unwrap_or_else(|| config.events.path.clone());
            let records = EventLog::load(&path)?;

            let mut per_kind: BTreeMap<EventKind, usize> = BTreeMap::new();
            for record in &records {
                *per_kind.entry(record.event).or_default() += 1;
                println!("{}  {:<22} {:<25} {}", record.ts, record.event, record.instance, record.detail);
            }
            println!();
            for (kind, count) in per_kind {
                println!("{:<22} {}", kind, count);
            }
        }
    }

    Ok(())
}

fn report_edit(action: &str, instance: &str, changed: bool, commit: bool) {
    match (changed, commit) {
        (false, _) => println!("{}: no matching entry for {}", action, instance),
        (true, true) => println!("{}: {} updated", action, instance),
        (true, false) => println!("{}: {} would change (pass --commit to write)", action, instance),
    }
}

async fn maybe_reload(config: &SentinelConfig, enabled: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !enabled {
        return Ok(());
    }
    let trigger = ReloadTrigger::from_config(&config.reload);
    trigger.try_reload().await?;
    println!("reload: ok ({})", trigger.display());
    Ok(())
}
