//! Core library for bridging a Mi Air Purifier 2S to a home-automation hub.
//!
//! The purifier is reached through a [`DeviceTransport`] that reads named
//! properties in batches and sends `set_*` commands. This crate sits on top
//! of that transport and turns it into a set of hub accessories whose
//! characteristics stay consistent with each other.
//!
//! # Features
//!
//! - **Property cache**: [`DeviceProxy`] serves repeated reads from memory and
//!   fetches only what is missing, in one round trip
//! - **Optimistic writes**: the cache is primed before each command so the
//!   display follows the user immediately
//! - **Cascading updates**: switching the purifier off also turns the silent
//!   switch off, picking manual mode restores the fan slider, and so on
//! - **Level mapping**: [`LevelMapper`] converts the 0-100 slider to the
//!   device's 14 favorite levels and back
//! - **Polling**: [`Poller`] refreshes everything on a fixed interval
//! - **Events**: every displayed-value change is broadcast as a
//!   [`CharacteristicEvent`]
//! - **Simulation**: [`MockPurifier`] stands in for real hardware
//!
//! # Accessories
//!
//! | Accessory | Characteristics |
//! |-----------|-----------------|
//! | Air purifier | Active, state, mode, lock, rotation speed, sensors, filter, silent switch |
//! | Temperature sensor | CurrentTemperature |
//! | Humidity sensor | CurrentRelativeHumidity |
//! | Buzzer switch | On |
//! | LED bulb | On |
//! | Air quality sensor | AirQuality, PM2_5Density |
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use miair_core::{AccessoriesConfig, Bridge, DeviceProxy, MockConnector, MockPurifier};
//! use miair_types::{CharacteristicId, CharacteristicValue};
//!
//! #[tokio::main]
//! async fn main() -> miair_core::Result<()> {
//!     let purifier = Arc::new(MockPurifier::new());
//!     let connector = MockConnector::new(purifier.clone());
//!
//!     let device = Arc::new(DeviceProxy::new("living room"));
//!     device.connect(&connector, "192.168.1.40", "00112233445566778899aabbccddeeff").await?;
//!
//!     let bridge = Bridge::new(device, &AccessoriesConfig::with_default_names());
//!     let led = bridge.accessory("LED").expect("LED is enabled");
//!     led.set(CharacteristicId::On, CharacteristicValue::On(false)).await?;
//!
//!     bridge.refresh().await?;
//!     Ok(())
//! }
//! ```

pub mod accessory;
pub mod bridge;
pub mod characteristic;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod level;
pub mod mock;
pub mod poller;
pub mod purifier;
pub mod thresholds;
pub mod traits;

pub use miair_types::{props, types};

// Core exports
pub use accessory::{Accessory, PropertyAccessory, PropertyBinding};
pub use bridge::{Bridge, BridgeBuilder};
pub use characteristic::{Characteristic, CharacteristicBinding};
pub use config::{AccessoriesConfig, AccessoryConfig};
pub use device::DeviceProxy;
pub use error::{Error, Result};
pub use events::{CharacteristicEvent, EventReceiver, EventSender, event_channel};
pub use level::{DEFAULT_LEVEL_BOUNDARIES, LevelMapper};
pub use mock::{Invocation, MockConnector, MockPurifier, MockPurifierBuilder};
pub use poller::{DEFAULT_POLL_INTERVAL, Poller};
pub use purifier::AirPurifier;
pub use thresholds::{ThresholdConfig, Thresholds};
pub use traits::{Connector, DeviceTransport};
