//! Simulated purifier for testing and offline runs.
//!
//! This module provides an in-memory purifier that speaks the same
//! property/command vocabulary as the real device, without any network.
//!
//! The [`MockPurifier`] implements the [`DeviceTransport`] trait, and
//! [`MockConnector`] implements [`Connector`], so both can be used
//! interchangeably with real transports in generic code.
//!
//! # Features
//!
//! - **Device semantics**: `set_*` commands update the simulated properties
//!   the way the purifier does (`set_power off` parks the mode at `"idle"`)
//! - **Failure injection**: fail every call, fail the next N calls, or make a
//!   single command answer with a custom rejection token
//! - **Call recording**: count fetches and inspect every invoked command
//! - **Latency simulation**: add artificial delays to every round trip
//! - **Drift**: randomly wander the sensor readings for live demos

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::RwLock;

use miair_types::{PropertyValue, props};

use crate::error::{Error, Result};
use crate::traits::{Connector, DeviceTransport};

/// A command received by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<PropertyValue>,
}

/// A simulated Mi Air Purifier 2S.
///
/// # Example
///
/// ```
/// use miair_core::{DeviceTransport, MockPurifier};
/// use miair_types::PropertyValue;
///
/// #[tokio::main]
/// async fn main() {
///     let purifier = MockPurifier::builder().power(false).build();
///     let values = purifier.fetch_properties(&["power".to_string()]).await.unwrap();
///     assert_eq!(values[0], PropertyValue::from("off"));
///
///     let result = purifier.invoke("set_power", &["on".into()]).await.unwrap();
///     assert_eq!(result, vec!["ok".to_string()]);
/// }
/// ```
pub struct MockPurifier {
    properties: RwLock<HashMap<String, PropertyValue>>,
    /// Mode restored when the purifier is switched back on.
    resume_mode: RwLock<String>,
    fetch_count: AtomicU32,
    fetches: RwLock<Vec<Vec<String>>>,
    invocations: RwLock<Vec<Invocation>>,
    rejections: RwLock<HashMap<String, String>>,
    should_fail: AtomicBool,
    fail_message: RwLock<String>,
    /// Number of calls still to fail before succeeding again.
    remaining_failures: AtomicU32,
    /// Simulated round-trip latency in milliseconds (0 = no delay).
    latency_ms: AtomicU64,
}

impl std::fmt::Debug for MockPurifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPurifier")
            .field("fetch_count", &self.fetch_count.load(Ordering::Relaxed))
            .field("should_fail", &self.should_fail.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockPurifier {
    fn default() -> Self {
        MockPurifierBuilder::default().build()
    }
}

impl MockPurifier {
    /// Create a purifier with default state (on, auto mode, clean air).
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a purifier with custom initial state.
    pub fn builder() -> MockPurifierBuilder {
        MockPurifierBuilder::default()
    }

    fn from_properties(properties: HashMap<String, PropertyValue>) -> Self {
        let resume_mode = properties
            .get(props::MODE)
            .and_then(PropertyValue::as_str)
            .filter(|m| is_active_mode(m))
            .unwrap_or(props::MODE_AUTO)
            .to_string();

        Self {
            properties: RwLock::new(properties),
            resume_mode: RwLock::new(resume_mode),
            fetch_count: AtomicU32::new(0),
            fetches: RwLock::new(Vec::new()),
            invocations: RwLock::new(Vec::new()),
            rejections: RwLock::new(HashMap::new()),
            should_fail: AtomicBool::new(false),
            fail_message: RwLock::new("Mock failure".to_string()),
            remaining_failures: AtomicU32::new(0),
            latency_ms: AtomicU64::new(0),
        }
    }

    async fn simulate_round_trip(&self, operation: &str) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        // Transient failures first
        if self.remaining_failures.load(Ordering::Relaxed) > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(Error::communication(
                operation,
                self.fail_message.read().await.clone(),
            ));
        }

        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::communication(
                operation,
                self.fail_message.read().await.clone(),
            ));
        }

        Ok(())
    }

    async fn apply(&self, command: &str, args: &[PropertyValue]) -> Vec<String> {
        let ok = || vec![props::RESULT_OK.to_string()];
        let invalid = || vec!["invalid_arg".to_string()];

        let Some(arg) = args.first() else {
            return invalid();
        };

        let switch_arg = match arg.as_str() {
            Some(props::ON) => Some(true),
            Some(props::OFF) => Some(false),
            _ => None,
        };

        let mut properties = self.properties.write().await;
        match command {
            props::SET_POWER => {
                let Some(on) = switch_arg else {
                    return invalid();
                };
                properties.insert(props::POWER.to_string(), props::on_off(on).into());
                let mode = if on {
                    self.resume_mode.read().await.clone()
                } else {
                    "idle".to_string()
                };
                properties.insert(props::MODE.to_string(), mode.into());
                ok()
            }
            props::SET_MODE => match arg.as_str() {
                Some(mode) if is_active_mode(mode) => {
                    properties.insert(props::MODE.to_string(), mode.into());
                    *self.resume_mode.write().await = mode.to_string();
                    ok()
                }
                _ => invalid(),
            },
            props::SET_LEVEL_FAVORITE => match arg.as_i64() {
                Some(level @ 0..=16) => {
                    properties.insert(props::FAVORITE_LEVEL.to_string(), level.into());
                    ok()
                }
                _ => invalid(),
            },
            props::SET_CHILD_LOCK | props::SET_BUZZER | props::SET_LED => {
                let Some(on) = switch_arg else {
                    return invalid();
                };
                let property = match command {
                    props::SET_CHILD_LOCK => props::CHILD_LOCK,
                    props::SET_BUZZER => props::VOLUME,
                    _ => props::LED,
                };
                properties.insert(property.to_string(), props::on_off(on).into());
                ok()
            }
            _ => vec!["unknown_method".to_string()],
        }
    }

    // --- Test control methods ---

    /// Read a simulated property directly (no round trip, not counted).
    pub async fn property(&self, name: &str) -> Option<PropertyValue> {
        self.properties.read().await.get(name).cloned()
    }

    /// Change a property as if the physical buttons had been used.
    pub async fn set_property(&self, name: &str, value: impl Into<PropertyValue>) {
        let value = value.into();
        if name == props::MODE
            && let Some(mode) = value.as_str()
            && is_active_mode(mode)
        {
            *self.resume_mode.write().await = mode.to_string();
        }
        self.properties.write().await.insert(name.to_string(), value);
    }

    /// Make every subsequent call fail with a communication error.
    pub async fn set_should_fail(&self, fail: bool, message: Option<&str>) {
        self.should_fail.store(fail, Ordering::Relaxed);
        if let Some(msg) = message {
            *self.fail_message.write().await = msg.to_string();
        }
    }

    /// Fail the next `count` calls, then succeed.
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Answer `command` with `token` instead of executing it.
    pub async fn reject_command(&self, command: &str, token: &str) {
        self.rejections
            .write()
            .await
            .insert(command.to_string(), token.to_string());
    }

    /// Stop rejecting `command`.
    pub async fn accept_command(&self, command: &str) {
        self.rejections.write().await.remove(command);
    }

    /// Set simulated round-trip latency.
    ///
    /// Set to `Duration::ZERO` to disable latency simulation.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of `get_prop` round trips performed (failed ones included).
    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// Property names requested by each fetch, oldest first.
    pub async fn fetches(&self) -> Vec<Vec<String>> {
        self.fetches.read().await.clone()
    }

    /// Commands received so far, oldest first.
    pub async fn invocations(&self) -> Vec<Invocation> {
        self.invocations.read().await.clone()
    }

    /// Names of the commands received so far.
    pub async fn commands(&self) -> Vec<String> {
        self.invocations
            .read()
            .await
            .iter()
            .map(|i| i.command.clone())
            .collect()
    }

    /// Forget recorded fetches and invocations.
    pub async fn reset_counts(&self) {
        self.fetch_count.store(0, Ordering::Relaxed);
        self.fetches.write().await.clear();
        self.invocations.write().await.clear();
    }

    /// Randomly wander the sensor readings, as a real room would.
    pub async fn drift(&self) {
        let mut properties = self.properties.write().await;
        let mut rng = rand::rng();

        let mut nudge = |name: &str, step: i64, min: i64, max: i64| {
            let current = properties.get(name).and_then(PropertyValue::as_i64);
            if let Some(current) = current {
                let next = (current + rng.random_range(-step..=step)).clamp(min, max);
                properties.insert(name.to_string(), next.into());
            }
        };

        nudge(props::AQI, 6, 0, 500);
        nudge(props::TEMP_DEC, 2, -100, 500);
        nudge(props::HUMIDITY, 1, 0, 100);
    }
}

fn is_active_mode(mode: &str) -> bool {
    matches!(
        mode,
        props::MODE_AUTO | props::MODE_SILENT | props::MODE_FAVORITE
    )
}

#[async_trait]
impl DeviceTransport for MockPurifier {
    async fn fetch_properties(&self, names: &[String]) -> Result<Vec<PropertyValue>> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        self.fetches.write().await.push(names.to_vec());
        self.simulate_round_trip(props::GET_PROP).await?;

        let properties = self.properties.read().await;
        names
            .iter()
            .map(|name| {
                properties.get(name).cloned().ok_or_else(|| {
                    Error::communication(props::GET_PROP, format!("unknown property '{name}'"))
                })
            })
            .collect()
    }

    async fn invoke(&self, command: &str, args: &[PropertyValue]) -> Result<Vec<String>> {
        self.invocations.write().await.push(Invocation {
            command: command.to_string(),
            args: args.to_vec(),
        });
        self.simulate_round_trip(command).await?;

        if let Some(token) = self.rejections.read().await.get(command) {
            return Ok(vec![token.clone()]);
        }

        Ok(self.apply(command, args).await)
    }
}

/// Connector handing out a shared [`MockPurifier`].
#[derive(Debug)]
pub struct MockConnector {
    device: Arc<MockPurifier>,
    should_fail: AtomicBool,
    attempts: AtomicU32,
}

impl MockConnector {
    pub fn new(device: Arc<MockPurifier>) -> Self {
        Self {
            device,
            should_fail: AtomicBool::new(false),
            attempts: AtomicU32::new(0),
        }
    }

    /// Make connection attempts fail.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Number of connection attempts made.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, address: &str, _token: &str) -> Result<Arc<dyn DeviceTransport>> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::ConnectionFailed {
                address: address.to_string(),
                reason: "device unreachable".to_string(),
            });
        }
        Ok(self.device.clone())
    }
}

/// Builder for [`MockPurifier`] initial state.
#[derive(Debug, Clone)]
pub struct MockPurifierBuilder {
    power: bool,
    mode: String,
    favorite_level: i64,
    child_lock: bool,
    temp_dec: i64,
    humidity: i64,
    aqi: i64,
    filter1_life: i64,
    buzzer: bool,
    led: bool,
}

impl Default for MockPurifierBuilder {
    fn default() -> Self {
        Self {
            power: true,
            mode: props::MODE_AUTO.to_string(),
            favorite_level: 8,
            child_lock: false,
            temp_dec: 215,
            humidity: 45,
            aqi: 12,
            filter1_life: 80,
            buzzer: true,
            led: true,
        }
    }
}

impl MockPurifierBuilder {
    pub fn power(mut self, on: bool) -> Self {
        self.power = on;
        self
    }

    pub fn mode(mut self, mode: &str) -> Self {
        self.mode = mode.to_string();
        self
    }

    pub fn favorite_level(mut self, level: i64) -> Self {
        self.favorite_level = level;
        self
    }

    pub fn child_lock(mut self, locked: bool) -> Self {
        self.child_lock = locked;
        self
    }

    pub fn temp_dec(mut self, temp_dec: i64) -> Self {
        self.temp_dec = temp_dec;
        self
    }

    pub fn humidity(mut self, humidity: i64) -> Self {
        self.humidity = humidity;
        self
    }

    pub fn aqi(mut self, aqi: i64) -> Self {
        self.aqi = aqi;
        self
    }

    pub fn filter1_life(mut self, life: i64) -> Self {
        self.filter1_life = life;
        self
    }

    pub fn buzzer(mut self, on: bool) -> Self {
        self.buzzer = on;
        self
    }

    pub fn led(mut self, on: bool) -> Self {
        self.led = on;
        self
    }

    pub fn build(self) -> MockPurifier {
        let mode = if self.power { self.mode } else { "idle".to_string() };
        let properties: HashMap<String, PropertyValue> = [
            (props::POWER, PropertyValue::from(props::on_off(self.power))),
            (props::MODE, mode.into()),
            (props::FAVORITE_LEVEL, self.favorite_level.into()),
            (props::CHILD_LOCK, props::on_off(self.child_lock).into()),
            (props::TEMP_DEC, self.temp_dec.into()),
            (props::HUMIDITY, self.humidity.into()),
            (props::AQI, self.aqi.into()),
            (props::FILTER1_LIFE, self.filter1_life.into()),
            (props::VOLUME, props::on_off(self.buzzer).into()),
            (props::LED, props::on_off(self.led).into()),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();

        MockPurifier::from_properties(properties)
    }
}
