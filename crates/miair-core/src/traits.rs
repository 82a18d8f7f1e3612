//! Trait abstractions for the device transport.
//!
//! The bridge never speaks the miIO wire protocol itself. It consumes an
//! already-connected, already-authenticated [`DeviceTransport`] produced by a
//! [`Connector`]. The in-process [`MockPurifier`](crate::MockPurifier)
//! implements both traits for tests and simulation.

use std::sync::Arc;

use async_trait::async_trait;

use miair_types::PropertyValue;

use crate::error::Result;

/// A live connection to a purifier.
///
/// # Example
///
/// ```ignore
/// use miair_core::{DeviceTransport, Result};
///
/// async fn print_power<T: DeviceTransport>(transport: &T) -> Result<()> {
///     let values = transport.fetch_properties(&["power".to_string()]).await?;
///     println!("power = {}", values[0]);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Fetch the named properties in one round trip.
    ///
    /// Values are returned in the order of `names`. The call is
    /// all-or-nothing: a transport failure yields an error and no values.
    async fn fetch_properties(&self, names: &[String]) -> Result<Vec<PropertyValue>>;

    /// Invoke a device command and return its raw result tokens.
    ///
    /// A first token of `"ok"` denotes success; any other token is the
    /// failure reason. Interpreting the tokens is left to the caller.
    async fn invoke(&self, command: &str, args: &[PropertyValue]) -> Result<Vec<String>>;
}

/// Establishes transports to purifiers.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to the device at `address` using the given `token`.
    ///
    /// No retry happens at this layer.
    async fn connect(&self, address: &str, token: &str) -> Result<Arc<dyn DeviceTransport>>;
}
