//! Mi Air Purifier bridge.
//!
//! Run with: `cargo run -p miair-bridge -- simulate`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use miair_bridge::{Config, default_config_path};
use miair_core::{Bridge, DeviceProxy, MockConnector, MockPurifier};

/// Mi Air Purifier 2S bridge.
#[derive(Parser, Debug)]
#[command(name = "miair-bridge")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Validate the configuration and list the exposed accessories.
    Check,

    /// Run the bridge against a simulated purifier until Ctrl-C.
    Simulate {
        /// Seconds between simulated sensor changes.
        #[arg(long, default_value_t = 10)]
        drift: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("miair_bridge=info".parse()?)
                .add_directive("miair_core=info".parse()?),
        )
        .init();

    let path = args.config.unwrap_or_else(default_config_path);

    match args.command {
        Command::Init { force } => init(&path, force),
        Command::Check => check(&path),
        Command::Simulate { drift } => simulate(&path, Duration::from_secs(drift.max(1))).await,
    }
}

fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    Config::template().save(path)?;
    println!("Wrote {}", path.display());
    println!("Edit the device address and token before running the bridge.");
    Ok(())
}

fn check(path: &Path) -> anyhow::Result<()> {
    let config = Config::load_validated(path)?;
    println!("{} is valid", path.display());
    println!(
        "Device {} (poll every {}s)",
        config.device.address, config.device.poll_interval
    );

    let device = Arc::new(DeviceProxy::new(config.device.address.clone()));
    let bridge = miair_bridge::build_bridge(&config, device);
    print_accessories(&bridge);
    Ok(())
}

fn print_accessories(bridge: &Bridge) {
    if bridge.accessories().is_empty() {
        println!("No accessories enabled");
        return;
    }
    for accessory in bridge.accessories() {
        println!("{} ({})", accessory.name(), accessory.kind());
        for binding in accessory.characteristics() {
            let access = if binding.settable { "read/write" } else { "read" };
            println!("  {:<28} {}", binding.id.to_string(), access);
        }
    }
}

async fn simulate(path: &Path, drift: Duration) -> anyhow::Result<()> {
    let config = if path.exists() {
        Config::load_validated(path)?
    } else {
        info!("No config at {}, using the template", path.display());
        Config::template()
    };

    let purifier = Arc::new(MockPurifier::new());
    let connector = Arc::new(MockConnector::new(purifier.clone()));
    let bridge = miair_bridge::disconnected(&config);
    print_accessories(&bridge);

    let mut events = bridge.subscribe();
    let logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => info!(
                    "{} {} = {}",
                    event.accessory, event.characteristic, event.value
                ),
                Err(RecvError::Lagged(n)) => warn!("Event log lagged, {} events skipped", n),
                Err(RecvError::Closed) => break,
            }
        }
    });

    miair_bridge::connect_in_background(&config, connector, bridge.clone())
        .await?
        .context("connecting to the simulated purifier")?;

    if let Err(e) = bridge.refresh().await {
        warn!("Initial refresh failed: {}", e);
    }
    let (poller, token) = miair_bridge::start(&config, bridge.clone());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(drift);
    ticker.tick().await;
    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            _ = ticker.tick() => purifier.drift().await,
        }
    }

    info!("Shutting down");
    token.cancel();
    poller.await?;
    drop(bridge);
    logger.abort();
    Ok(())
}
