use anyhow::Context;
use clap::Parser;
use generator::synthetic::{events_json, thermal_csv, SyntheticConfig};
use gui_bridge::bridge::GuiBridge;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use workflow::config::DashboardConfig;
use workflow::runner::Runner;
use workflow::scheduler::spawn_refresh_tasks;

mod generator;
mod gui_bridge;
mod report;
mod sources;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Wildfire feed aggregator and dashboard bridge")]
struct Args {
    /// Normalize feeds from files (or synthetic data) instead of fetching them
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Thermal detection CSV used in offline mode
    #[arg(long, requires = "offline")]
    thermal_file: Option<PathBuf>,
    /// Open-events JSON used in offline mode
    #[arg(long, requires = "offline")]
    events_file: Option<PathBuf>,
    /// Seed for synthetic offline feeds
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Load the dashboard config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Record store base URL (ignored with --config)
    #[arg(long)]
    backend_url: Option<String>,
    /// Address for the HTTP bridge (ignored with --config)
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Seconds between feed refreshes (ignored with --config)
    #[arg(long)]
    refetch_secs: Option<u64>,
    /// Keep refreshing and serve the snapshot over HTTP until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::from_args(args.backend_url.clone(), args.bind, args.refetch_secs),
    }
    .with_env();

    let runner = Arc::new(Runner::new(config.clone())?);

    if args.offline {
        let synthetic = SyntheticConfig {
            seed: args.seed,
            ..Default::default()
        };
        let thermal = read_or(&args.thermal_file, || thermal_csv(&synthetic))?;
        let events = read_or(&args.events_file, || events_json(&synthetic))?;
        let summary = runner.run_offline(&thermal, &events)?;

        println!(
            "Offline run -> detections {}, events {}, skipped {}, fallback {}",
            summary.detections, summary.events, summary.skipped, summary.fallback_applied
        );
        for location in &summary.locations {
            println!("  near {location}");
        }
    } else {
        for (source, outcome) in runner.refresh_all().await {
            match outcome {
                Ok(count) => println!("{source}: {count} items"),
                Err(err) => println!("{source}: unavailable ({err})"),
            }
        }
    }

    if args.serve {
        let tasks = if args.offline {
            Vec::new()
        } else {
            spawn_refresh_tasks(runner.clone())
        };
        let bridge = GuiBridge::new(runner.clone());
        bridge
            .serve_until(config.bind, async {
                if let Err(err) = signal::ctrl_c().await {
                    log::error!("awaiting Ctrl+C failed: {err}");
                }
            })
            .await?;
        for task in tasks {
            task.abort();
        }
    }

    Ok(())
}

fn read_or<F>(path: &Option<PathBuf>, fallback: F) -> anyhow::Result<String>
where
    F: FnOnce() -> String,
{
    match path.as_deref() {
        Some(path) => read_feed(path),
        None => Ok(fallback()),
    }
}

fn read_feed(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading feed file {}", path.display()))
}
