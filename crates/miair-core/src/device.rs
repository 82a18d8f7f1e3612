//! Cached proxy in front of the purifier transport.
//!
//! [`DeviceProxy`] keeps the last known value of every property it has seen.
//! Reads are served from that cache unless forced, and only the missing
//! names are fetched. Writes go straight through to the device. Callers that
//! want an optimistic display prime the cache before writing.
//!
//! The proxy starts disconnected. While disconnected every read and write
//! fails with [`Error::NotConnected`] and priming is a no-op. Attaching a
//! transport is permanent; a second attach fails with
//! [`Error::AlreadyConnected`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, error, info};

use miair_types::{PropertyValue, props};

use crate::error::{Error, Result};
use crate::traits::{Connector, DeviceTransport};

/// Cached access to one purifier.
pub struct DeviceProxy {
    name: String,
    transport: OnceCell<Arc<dyn DeviceTransport>>,
    cache: RwLock<HashMap<String, PropertyValue>>,
}

impl std::fmt::Debug for DeviceProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceProxy")
            .field("name", &self.name)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl DeviceProxy {
    /// Create a disconnected proxy. `name` is only used for logging.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: OnceCell::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Create a proxy that is already connected through `transport`.
    pub fn with_transport(name: impl Into<String>, transport: Arc<dyn DeviceTransport>) -> Self {
        Self {
            name: name.into(),
            transport: OnceCell::new_with(Some(transport)),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_connected(&self) -> bool {
        self.transport.initialized()
    }

    /// Attach a live transport, switching the proxy to the connected state.
    pub fn attach(&self, transport: Arc<dyn DeviceTransport>) -> Result<()> {
        self.transport
            .set(transport)
            .map_err(|_| Error::AlreadyConnected)?;
        info!(device = %self.name, "Device transport attached");
        Ok(())
    }

    /// Dial the purifier at `address` and attach the resulting transport.
    ///
    /// Failures are logged and returned; the proxy stays disconnected and
    /// the caller may try again.
    #[tracing::instrument(level = "info", skip_all, fields(device = %self.name, address = %address))]
    pub async fn connect(&self, connector: &dyn Connector, address: &str, token: &str) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        info!("Connecting to air purifier...");
        match connector.connect(address, token).await {
            Ok(transport) => {
                self.attach(transport)?;
                info!("Connected!");
                Ok(())
            }
            Err(e) => {
                error!("Failed to connect: {e}");
                Err(e)
            }
        }
    }

    fn transport(&self) -> Result<&Arc<dyn DeviceTransport>> {
        self.transport.get().ok_or(Error::NotConnected)
    }

    /// Read properties, in the order given.
    ///
    /// Cached values are returned as-is unless `force` is set. The names that
    /// are missing (or all of them, when forced) are fetched in a single round
    /// trip and written to the cache. A failed fetch leaves the cache
    /// untouched.
    #[tracing::instrument(level = "debug", skip(self, names), fields(device = %self.name))]
    pub async fn read<S: AsRef<str>>(&self, names: &[S], force: bool) -> Result<Vec<PropertyValue>> {
        let transport = self.transport()?;

        let mut values: Vec<Option<PropertyValue>> = if force {
            vec![None; names.len()]
        } else {
            let cache = self.cache.read().await;
            names
                .iter()
                .map(|name| cache.get(name.as_ref()).cloned())
                .collect()
        };

        let mut missing: Vec<String> = Vec::new();
        for (name, value) in names.iter().zip(&values) {
            let name = name.as_ref();
            if value.is_none() && !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
        }

        if missing.is_empty() {
            debug!("Using cached values");
        } else {
            debug!("Fetching device values: {}", missing.join(", "));
            let fetched = transport
                .fetch_properties(&missing)
                .await
                .map_err(|e| match e {
                    Error::Communication { .. } => e,
                    other => Error::communication(props::GET_PROP, other.to_string()),
                })?;

            if fetched.len() != missing.len() {
                return Err(Error::communication(
                    props::GET_PROP,
                    format!(
                        "requested {} properties, device returned {}",
                        missing.len(),
                        fetched.len()
                    ),
                ));
            }

            let fetched: HashMap<String, PropertyValue> = missing.into_iter().zip(fetched).collect();
            {
                let mut cache = self.cache.write().await;
                for (name, value) in &fetched {
                    cache.insert(name.clone(), value.clone());
                }
            }

            for (name, slot) in names.iter().zip(values.iter_mut()) {
                if slot.is_none() {
                    *slot = fetched.get(name.as_ref()).cloned();
                }
            }
        }

        names
            .iter()
            .zip(values)
            .map(|(name, value)| {
                value.ok_or_else(|| {
                    Error::communication(
                        props::GET_PROP,
                        format!("no value for '{}'", name.as_ref()),
                    )
                })
            })
            .collect()
    }

    /// Read a single property. See [`read`](Self::read).
    pub async fn read_one(&self, name: &str, force: bool) -> Result<PropertyValue> {
        self.read(&[name], force)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::communication(props::GET_PROP, format!("no value for '{name}'")))
    }

    /// Send a command and return the device's raw result tokens.
    ///
    /// The cache is not touched.
    #[tracing::instrument(level = "debug", skip(self, args), fields(device = %self.name))]
    pub async fn write(&self, command: &str, args: &[PropertyValue]) -> Result<Vec<String>> {
        let transport = self.transport()?;
        debug!(
            "Sending {command}({})",
            args.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        );
        transport.invoke(command, args).await
    }

    /// Send a command and require an `"ok"` answer.
    pub async fn invoke(&self, command: &str, args: &[PropertyValue]) -> Result<()> {
        let result = self.write(command, args).await?;
        match result.first().map(String::as_str) {
            Some(props::RESULT_OK) => Ok(()),
            Some(token) => Err(Error::rejected(command, token)),
            None => Err(Error::rejected(command, "")),
        }
    }

    /// Overwrite one cache entry without talking to the device.
    ///
    /// Does nothing while disconnected.
    pub async fn prime(&self, name: &str, value: impl Into<PropertyValue>) {
        if !self.is_connected() {
            return;
        }
        self.cache.write().await.insert(name.to_string(), value.into());
    }

    /// Peek at the cached value of a property.
    pub async fn cached(&self, name: &str) -> Option<PropertyValue> {
        self.cache.read().await.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockConnector, MockPurifier};

    fn connected(purifier: &Arc<MockPurifier>) -> DeviceProxy {
        DeviceProxy::with_transport("test", purifier.clone())
    }

    #[tokio::test]
    async fn test_read_before_connect() {
        let proxy = DeviceProxy::new("test");
        assert!(!proxy.is_connected());

        let err = proxy.read(&["power"], false).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));

        let err = proxy.invoke("set_power", &["on".into()]).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn test_prime_before_connect_is_noop() {
        let proxy = DeviceProxy::new("test");
        proxy.prime("power", "on").await;
        assert_eq!(proxy.cached("power").await, None);
    }

    #[tokio::test]
    async fn test_read_fetches_then_caches() {
        let purifier = Arc::new(MockPurifier::builder().mode("favorite").build());
        let proxy = connected(&purifier);

        let values = proxy.read(&["mode", "power"], false).await.unwrap();
        assert_eq!(values, vec![PropertyValue::from("favorite"), PropertyValue::from("on")]);
        assert_eq!(purifier.fetch_count(), 1);

        let values = proxy.read(&["power", "mode"], false).await.unwrap();
        assert_eq!(values, vec![PropertyValue::from("on"), PropertyValue::from("favorite")]);
        assert_eq!(purifier.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_read_fetches_only_missing() {
        let purifier = Arc::new(MockPurifier::new());
        let proxy = connected(&purifier);

        proxy.read(&["mode"], false).await.unwrap();
        proxy.read(&["mode", "aqi", "mode"], false).await.unwrap();

        let fetches = purifier.fetches().await;
        assert_eq!(fetches, vec![vec!["mode".to_string()], vec!["aqi".to_string()]]);
    }

    #[tokio::test]
    async fn test_forced_read_refetches() {
        let purifier = Arc::new(MockPurifier::new());
        let proxy = connected(&purifier);

        proxy.read(&["aqi"], false).await.unwrap();
        purifier.set_property("aqi", 150i64).await;

        assert_eq!(proxy.read_one("aqi", false).await.unwrap(), PropertyValue::Int(12));
        assert_eq!(proxy.read_one("aqi", true).await.unwrap(), PropertyValue::Int(150));
        assert_eq!(proxy.cached("aqi").await, Some(PropertyValue::Int(150)));
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_cache() {
        let purifier = Arc::new(MockPurifier::new());
        let proxy = connected(&purifier);

        proxy.read(&["aqi"], false).await.unwrap();
        purifier.set_property("aqi", 99i64).await;
        purifier.set_should_fail(true, Some("timeout")).await;

        let err = proxy.read(&["aqi", "power"], true).await.unwrap_err();
        assert!(matches!(err, Error::Communication { .. }));
        assert_eq!(proxy.cached("aqi").await, Some(PropertyValue::Int(12)));
        assert_eq!(proxy.cached("power").await, None);
    }

    #[tokio::test]
    async fn test_prime_overrides_cache() {
        let purifier = Arc::new(MockPurifier::new());
        let proxy = connected(&purifier);

        proxy.prime("power", "off").await;
        assert_eq!(proxy.read_one("power", false).await.unwrap(), "off".into());
        assert_eq!(purifier.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_invoke_result_tokens() {
        let purifier = Arc::new(MockPurifier::new());
        let proxy = connected(&purifier);

        proxy.invoke("set_led", &["off".into()]).await.unwrap();

        purifier.reject_command("set_led", "busy").await;
        let err = proxy.invoke("set_led", &["on".into()]).await.unwrap_err();
        match err {
            Error::Rejected { command, reason } => {
                assert_eq!(command, "set_led");
                assert_eq!(reason, "busy");
            }
            other => panic!("unexpected error: {other}"),
        }

        let raw = proxy.write("set_led", &["on".into()]).await.unwrap();
        assert_eq!(raw, vec!["busy".to_string()]);
    }

    #[tokio::test]
    async fn test_write_does_not_touch_cache() {
        let purifier = Arc::new(MockPurifier::new());
        let proxy = connected(&purifier);

        proxy.read(&["led"], false).await.unwrap();
        proxy.invoke("set_led", &["off".into()]).await.unwrap();
        assert_eq!(proxy.cached("led").await, Some("on".into()));
    }

    #[tokio::test]
    async fn test_connect_once() {
        let purifier = Arc::new(MockPurifier::new());
        let connector = MockConnector::new(purifier.clone());
        let proxy = DeviceProxy::new("test");

        connector.set_should_fail(true);
        let err = proxy.connect(&connector, "10.0.0.2", "token").await.unwrap_err();
        assert!(matches!(err, Error::ConnectionFailed { .. }));
        assert!(!proxy.is_connected());

        connector.set_should_fail(false);
        proxy.connect(&connector, "10.0.0.2", "token").await.unwrap();
        assert!(proxy.is_connected());
        assert!(proxy.read(&["power"], false).await.is_ok());

        let err = proxy.connect(&connector, "10.0.0.2", "token").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyConnected));
        assert!(matches!(proxy.attach(purifier), Err(Error::AlreadyConnected)));
    }
}
