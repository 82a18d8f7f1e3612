//! Runs a Mi Air Purifier 2S bridge from a TOML configuration.
//!
//! The binary loads a [`Config`], connects a [`DeviceProxy`] through a
//! [`Connector`], builds the enabled accessories and polls the purifier on
//! the configured interval.
//!
//! # Configuration
//!
//! The bridge reads configuration from `~/.config/miair/bridge.toml`:
//!
//! ```toml
//! [device]
//! address = "192.168.1.40"
//! token = "00112233445566778899aabbccddeeff"
//! poll_interval = 5
//!
//! [accessories.air_purifier]
//! name = "Air Purifier"
//! [accessories.silent_mode_switch]
//! name = "Silent Mode"
//! [accessories.temperature]
//! name = "Temperature"
//! disabled = true
//! ```
//!
//! Accessories without an entry are not exposed. The optional `[tuning]`
//! table overrides the fan level table and the air quality thresholds.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use miair_core::{Bridge, Connector, DeviceProxy, Poller};

pub mod config;

pub use config::{
    Config, ConfigError, DeviceConfig, TuningConfig, ValidationError, default_config_path,
};

/// Build the accessories described by `config` around a device.
pub fn build_bridge(config: &Config, device: Arc<DeviceProxy>) -> Bridge {
    Bridge::builder()
        .levels(config.tuning.levels.clone())
        .thresholds(config.tuning.thresholds())
        .build(device, &config.accessories)
}

/// Build the bridge for the configured purifier without connecting it.
///
/// Every get and set fails with `NotConnected` until [`connect_in_background`]
/// (or [`connect`]) attaches a transport.
pub fn disconnected(config: &Config) -> Arc<Bridge> {
    let device = Arc::new(DeviceProxy::new(config.device.address.clone()));
    Arc::new(build_bridge(config, device))
}

/// Connect to the configured purifier and build its bridge.
pub async fn connect(config: &Config, connector: &dyn Connector) -> miair_core::Result<Arc<Bridge>> {
    let bridge = disconnected(config);
    bridge
        .device()
        .connect(connector, &config.device.address, &config.device.token)
        .await?;
    Ok(bridge)
}

/// Connect an already built bridge on a background task.
pub fn connect_in_background(
    config: &Config,
    connector: Arc<dyn Connector>,
    bridge: Arc<Bridge>,
) -> JoinHandle<miair_core::Result<()>> {
    let address = config.device.address.clone();
    let token = config.device.token.clone();
    tokio::spawn(async move {
        bridge
            .device()
            .connect(connector.as_ref(), &address, &token)
            .await
    })
}

/// Start polling `bridge` on the configured interval.
pub fn start(config: &Config, bridge: Arc<Bridge>) -> (JoinHandle<()>, CancellationToken) {
    info!(
        "Polling {} every {}s",
        config.device.address, config.device.poll_interval
    );
    Poller::new(bridge, config.device.poll_interval()).spawn()
}
