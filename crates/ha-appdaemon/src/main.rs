//! App host binary
//!
//! Loads `apps.yaml` from the config directory, instantiates the apps and
//! replays a scenario against them, then prints every service call made.

use anyhow::{Context, Result};
use clap::Parser;
use ha_appdaemon::{register_apps, Runtime, Scenario};
use ha_config::AppsConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "appdaemon", version, about = "Run home automation apps against a scenario")]
struct Args {
    /// Directory containing apps.yaml (and secrets.yaml, if used)
    #[arg(short, long, default_value = ".")]
    config_dir: PathBuf,

    /// Scenario file to replay
    #[arg(short, long)]
    scenario: PathBuf,

    /// Pace the scenario by the wall clock instead of running it instantly
    #[arg(long)]
    realtime: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log filter")?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting app host");

    let apps = AppsConfig::load(args.config_dir.clone())
        .with_context(|| format!("loading apps from {}", args.config_dir.display()))?;
    let scenario = Scenario::load(&args.scenario)?;

    let mut runtime = Runtime::new(scenario.start);
    register_apps(&mut runtime, &apps)?;
    scenario.seed(&mut runtime)?;
    let initialized = runtime.initialize_apps();
    info!(initialized, total = runtime.app_count(), "Apps initialized");

    if args.realtime {
        tokio::select! {
            result = scenario.play_realtime(&mut runtime) => result?,
            _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        }
    } else {
        scenario.play(&mut runtime)?;
    }

    for record in runtime.service_log() {
        println!("{record}");
    }
    info!(calls = runtime.service_log().len(), "Shutting down");

    Ok(())
}
