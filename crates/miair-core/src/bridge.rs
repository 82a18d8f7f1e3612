//! Assembles the enabled accessories around one purifier.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info};

use miair_types::props;

use crate::accessory::{Accessory, PropertyAccessory, PropertyBinding};
use crate::config::AccessoriesConfig;
use crate::device::DeviceProxy;
use crate::error::Result;
use crate::events::{DEFAULT_EVENT_CAPACITY, EventReceiver, EventSender, event_channel};
use crate::level::LevelMapper;
use crate::purifier::AirPurifier;
use crate::thresholds::Thresholds;

/// All accessories sharing one device proxy and one event stream.
pub struct Bridge {
    device: Arc<DeviceProxy>,
    events: EventSender,
    accessories: Vec<Arc<dyn Accessory>>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("device", &self.device)
            .field(
                "accessories",
                &self.accessories.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Bridge {
    /// Build a bridge with default level table and thresholds.
    pub fn new(device: Arc<DeviceProxy>, config: &AccessoriesConfig) -> Self {
        Self::builder().build(device, config)
    }

    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::default()
    }

    pub fn device(&self) -> &Arc<DeviceProxy> {
        &self.device
    }

    pub fn accessories(&self) -> &[Arc<dyn Accessory>] {
        &self.accessories
    }

    /// Find an accessory by display name.
    pub fn accessory(&self, name: &str) -> Option<&Arc<dyn Accessory>> {
        self.accessories.iter().find(|a| a.name() == name)
    }

    /// Subscribe to characteristic change events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Force-fetch every polled property, then re-run every get handler.
    ///
    /// The get handlers are served from the freshly filled cache. If the
    /// fetch fails nothing is re-evaluated.
    pub async fn refresh(&self) -> Result<()> {
        self.device.read(&props::POLL_PROPERTIES, true).await?;

        let results = join_all(self.accessories.iter().map(|a| a.refresh())).await;

        let mut first_error = None;
        for (accessory, result) in self.accessories.iter().zip(results) {
            if let Err(e) = result {
                debug!("Refreshing {} failed: {e}", accessory.name());
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Tuning knobs for [`Bridge`] construction.
#[derive(Debug, Clone)]
pub struct BridgeBuilder {
    levels: LevelMapper,
    thresholds: Thresholds,
    event_capacity: usize,
}

impl Default for BridgeBuilder {
    fn default() -> Self {
        Self {
            levels: LevelMapper::default(),
            thresholds: Thresholds::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl BridgeBuilder {
    #[must_use]
    pub fn levels(mut self, levels: LevelMapper) -> Self {
        self.levels = levels;
        self
    }

    #[must_use]
    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self, device: Arc<DeviceProxy>, config: &AccessoriesConfig) -> Bridge {
        let (events, _) = event_channel(self.event_capacity);
        let mut accessories: Vec<Arc<dyn Accessory>> = Vec::new();

        if let Some((name, silent_name)) = config.purifier_names() {
            let purifier = AirPurifier::new(name, silent_name, device.clone(), events.clone())
                .with_levels(self.levels.clone())
                .with_thresholds(self.thresholds.clone())
                .hide_silent_switch(config.silent_mode_switch.disabled);
            accessories.push(Arc::new(purifier));
        }

        let single = [
            (&config.temperature, PropertyBinding::temperature()),
            (&config.humidity, PropertyBinding::humidity()),
            (&config.buzzer_switch, PropertyBinding::buzzer()),
            (&config.led_bulb, PropertyBinding::led()),
            (&config.air_quality, PropertyBinding::air_quality(self.thresholds.clone())),
        ];
        for (entry, binding) in single {
            if let Some(name) = entry.enabled_name() {
                accessories.push(Arc::new(PropertyAccessory::new(
                    name,
                    binding,
                    device.clone(),
                    events.clone(),
                )));
            }
        }

        info!(
            "Initializing air purifier bridge for {}, accessories size: {}",
            device.name(),
            accessories.len()
        );

        Bridge {
            device,
            events,
            accessories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPurifier;
    use miair_types::{AccessoryKind, CharacteristicId, CharacteristicValue};

    fn device(mock: &Arc<MockPurifier>) -> Arc<DeviceProxy> {
        Arc::new(DeviceProxy::with_transport("purifier", mock.clone()))
    }

    #[test]
    fn test_all_accessories() {
        let mock = Arc::new(MockPurifier::new());
        let bridge = Bridge::new(device(&mock), &AccessoriesConfig::with_default_names());

        let kinds: Vec<_> = bridge.accessories().iter().map(|a| a.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                AccessoryKind::AirPurifier,
                AccessoryKind::TemperatureSensor,
                AccessoryKind::HumiditySensor,
                AccessoryKind::BuzzerSwitch,
                AccessoryKind::LedBulb,
                AccessoryKind::AirQualitySensor,
            ]
        );
        assert!(bridge.accessory("LED").is_some());
        assert!(bridge.accessory("Nope").is_none());
    }

    #[test]
    fn test_disabled_accessories_are_skipped() {
        let mock = Arc::new(MockPurifier::new());
        let mut config = AccessoriesConfig::with_default_names();
        config.temperature.disabled = true;
        config.humidity.name = Some(String::new());
        config.silent_mode_switch.name = None;

        let bridge = Bridge::new(device(&mock), &config);
        let names: Vec<_> = bridge.accessories().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["Buzzer", "LED", "Air Quality"]);
    }

    #[test]
    fn test_empty_config() {
        let mock = Arc::new(MockPurifier::new());
        let bridge = Bridge::new(device(&mock), &AccessoriesConfig::default());
        assert!(bridge.accessories().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_single_fetch() {
        let mock = Arc::new(MockPurifier::builder().temp_dec(230).build());
        let bridge = Bridge::new(device(&mock), &AccessoriesConfig::with_default_names());

        bridge.refresh().await.unwrap();
        assert_eq!(mock.fetch_count(), 1);
        assert_eq!(mock.fetches().await[0].len(), props::POLL_PROPERTIES.len());

        let sensor = bridge.accessory("Temperature").unwrap();
        assert_eq!(
            sensor.displayed(CharacteristicId::CurrentTemperature),
            Some(CharacteristicValue::Temperature(23.0))
        );
    }

    #[tokio::test]
    async fn test_refresh_failure_skips_gets() {
        let mock = Arc::new(MockPurifier::new());
        let bridge = Bridge::new(device(&mock), &AccessoriesConfig::with_default_names());
        mock.set_should_fail(true, None).await;

        assert!(bridge.refresh().await.is_err());
        assert_eq!(mock.fetch_count(), 1);
        let sensor = bridge.accessory("Temperature").unwrap();
        assert_eq!(sensor.displayed(CharacteristicId::CurrentTemperature), None);
    }

    #[tokio::test]
    async fn test_subscribe_sees_refresh() {
        let mock = Arc::new(MockPurifier::new());
        let mut config = AccessoriesConfig::default();
        config.led_bulb = crate::config::AccessoryConfig::named("LED");
        let bridge = Bridge::new(device(&mock), &config);
        let mut rx = bridge.subscribe();

        bridge.refresh().await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.accessory, "LED");
        assert_eq!(event.value, CharacteristicValue::On(true));
    }
}
