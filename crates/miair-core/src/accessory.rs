//! Accessories presented to the hub.
//!
//! Every accessory exposes a list of [`CharacteristicBinding`]s and async
//! `get` / `set` handlers for them. The purifier itself lives in
//! [`crate::purifier`]; the simpler sensors and switches are all instances of
//! [`PropertyAccessory`], a single device property bound to one primary
//! characteristic with an optional write command and an optional companion
//! characteristic that is refreshed on every read.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use miair_types::{
    AccessoryInfo, AccessoryKind, CharacteristicId, CharacteristicValue, ParseResult,
    PropertyValue, props,
};

use crate::characteristic::{Characteristic, CharacteristicBinding};
use crate::device::DeviceProxy;
use crate::error::{Error, Result};
use crate::events::EventSender;
use crate::thresholds::Thresholds;

/// A hub-facing accessory backed by the purifier.
#[async_trait]
pub trait Accessory: Send + Sync {
    /// Display name.
    fn name(&self) -> &str;

    fn kind(&self) -> AccessoryKind;

    fn info(&self) -> &AccessoryInfo;

    /// Characteristics exposed to the hub.
    fn characteristics(&self) -> Vec<CharacteristicBinding>;

    /// Value currently on display for `id`, without touching the device.
    fn displayed(&self, id: CharacteristicId) -> Option<CharacteristicValue>;

    /// Run the get handler for `id`.
    async fn get(&self, id: CharacteristicId) -> Result<CharacteristicValue>;

    /// Run the set handler for `id`.
    async fn set(&self, id: CharacteristicId, value: CharacteristicValue) -> Result<()>;

    /// Re-run every exposed get handler. All handlers run even if some fail;
    /// the first error is returned.
    async fn refresh(&self) -> Result<()> {
        let mut first_error = None;
        for binding in self.characteristics() {
            if let Err(e) = self.get(binding.id).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Turns a raw property into a displayed value.
pub type Decoder = Arc<dyn Fn(&PropertyValue) -> ParseResult<CharacteristicValue> + Send + Sync>;

/// Device command used by a settable [`PropertyAccessory`].
#[derive(Debug, Clone, Copy)]
pub struct WriteCommand {
    pub command: &'static str,
}

/// Secondary characteristic refreshed from the same property.
#[derive(Clone)]
pub struct Companion {
    pub id: CharacteristicId,
    pub decode: Decoder,
}

/// Everything needed to build a [`PropertyAccessory`].
#[derive(Clone)]
pub struct PropertyBinding {
    pub kind: AccessoryKind,
    pub property: &'static str,
    pub characteristic: CharacteristicId,
    pub decode: Decoder,
    pub write: Option<WriteCommand>,
    pub companion: Option<Companion>,
}

impl fmt::Debug for PropertyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBinding")
            .field("kind", &self.kind)
            .field("property", &self.property)
            .field("characteristic", &self.characteristic)
            .field("write", &self.write)
            .field("companion", &self.companion.as_ref().map(|c| c.id))
            .finish()
    }
}

impl PropertyBinding {
    /// `temp_dec / 10` as the current temperature.
    pub fn temperature() -> Self {
        Self {
            kind: AccessoryKind::TemperatureSensor,
            property: props::TEMP_DEC,
            characteristic: CharacteristicId::CurrentTemperature,
            decode: Arc::new(decode_temperature),
            write: None,
            companion: None,
        }
    }

    /// `humidity` as relative humidity.
    pub fn humidity() -> Self {
        Self {
            kind: AccessoryKind::HumiditySensor,
            property: props::HUMIDITY,
            characteristic: CharacteristicId::CurrentRelativeHumidity,
            decode: Arc::new(decode_percent),
            write: None,
            companion: None,
        }
    }

    /// `volume` as an on/off switch, written with `set_buzzer`.
    pub fn buzzer() -> Self {
        Self {
            kind: AccessoryKind::BuzzerSwitch,
            property: props::VOLUME,
            characteristic: CharacteristicId::On,
            decode: Arc::new(decode_switch),
            write: Some(WriteCommand {
                command: props::SET_BUZZER,
            }),
            companion: None,
        }
    }

    /// `led` as a light bulb, written with `set_led`.
    pub fn led() -> Self {
        Self {
            kind: AccessoryKind::LedBulb,
            property: props::LED,
            characteristic: CharacteristicId::On,
            decode: Arc::new(decode_switch),
            write: Some(WriteCommand {
                command: props::SET_LED,
            }),
            companion: None,
        }
    }

    /// `aqi` classified into an air quality, with the raw PM2.5 density as
    /// companion.
    pub fn air_quality(thresholds: Thresholds) -> Self {
        Self {
            kind: AccessoryKind::AirQualitySensor,
            property: props::AQI,
            characteristic: CharacteristicId::AirQuality,
            decode: Arc::new(move |value: &PropertyValue| {
                Ok(CharacteristicValue::AirQuality(
                    thresholds.classify_value(value),
                ))
            }),
            write: None,
            companion: Some(Companion {
                id: CharacteristicId::Pm25Density,
                decode: Arc::new(decode_density),
            }),
        }
    }
}

pub(crate) fn decode_temperature(value: &PropertyValue) -> ParseResult<CharacteristicValue> {
    Ok(CharacteristicValue::Temperature(
        (value.expect_f64()? / 10.0) as f32,
    ))
}

pub(crate) fn decode_percent(value: &PropertyValue) -> ParseResult<CharacteristicValue> {
    CharacteristicValue::percent(value.expect_i64()?)
}

pub(crate) fn decode_density(value: &PropertyValue) -> ParseResult<CharacteristicValue> {
    Ok(CharacteristicValue::Density(value.expect_f64()? as f32))
}

pub(crate) fn decode_switch(value: &PropertyValue) -> ParseResult<CharacteristicValue> {
    Ok(CharacteristicValue::On(value.is_on()))
}

/// A sensor or switch bound to one device property.
pub struct PropertyAccessory {
    name: String,
    info: AccessoryInfo,
    binding: PropertyBinding,
    device: Arc<DeviceProxy>,
    primary: Characteristic,
    companion: Option<Characteristic>,
}

impl fmt::Debug for PropertyAccessory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyAccessory")
            .field("name", &self.name)
            .field("binding", &self.binding)
            .finish()
    }
}

impl PropertyAccessory {
    pub fn new(
        name: impl Into<String>,
        binding: PropertyBinding,
        device: Arc<DeviceProxy>,
        events: EventSender,
    ) -> Self {
        let name = name.into();
        let primary = Characteristic::new(
            &name,
            CharacteristicBinding {
                id: binding.characteristic,
                settable: binding.write.is_some(),
            },
            events.clone(),
        );
        let companion = binding.companion.as_ref().map(|c| {
            Characteristic::new(&name, CharacteristicBinding::read_only(c.id), events.clone())
        });

        Self {
            name,
            info: AccessoryInfo::default(),
            binding,
            device,
            primary,
            companion,
        }
    }

    pub fn property(&self) -> &'static str {
        self.binding.property
    }

    fn is_companion(&self, id: CharacteristicId) -> bool {
        self.companion.as_ref().is_some_and(|c| c.id() == id)
    }

    async fn read(&self, id: CharacteristicId) -> Result<CharacteristicValue> {
        let property = self.binding.property;
        let raw = self.device.read_one(property, false).await?;
        debug!("[{}] {id} - get: {raw}", self.name);

        let primary = (self.binding.decode)(&raw).map_err(|e| Error::unexpected_value(property, e));
        if let Ok(value) = primary {
            self.primary.update_value(value);
        }

        let companion = match (&self.binding.companion, &self.companion) {
            (Some(bound), Some(slot)) => {
                let decoded = (bound.decode)(&raw).map_err(|e| Error::unexpected_value(property, e));
                match &decoded {
                    Ok(value) => {
                        slot.update_value(*value);
                    }
                    Err(e) => debug!("[{}] {} not updated: {e}", self.name, bound.id),
                }
                Some(decoded)
            }
            _ => None,
        };

        match companion {
            Some(decoded) if self.is_companion(id) => decoded,
            _ => primary,
        }
    }

    async fn write(&self, command: &'static str, value: CharacteristicValue) -> Result<()> {
        let on = value.as_bool().ok_or_else(|| {
            Error::invalid_value(self.binding.characteristic, format!("expected on/off, got {value}"))
        })?;
        let arg = props::on_off(on);

        self.device.prime(self.binding.property, arg).await;
        self.device.invoke(command, &[arg.into()]).await?;
        self.primary.update_value(value);
        Ok(())
    }
}

#[async_trait]
impl Accessory for PropertyAccessory {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AccessoryKind {
        self.binding.kind
    }

    fn info(&self) -> &AccessoryInfo {
        &self.info
    }

    fn characteristics(&self) -> Vec<CharacteristicBinding> {
        std::iter::once(self.primary.binding())
            .chain(self.companion.as_ref().map(Characteristic::binding))
            .collect()
    }

    fn displayed(&self, id: CharacteristicId) -> Option<CharacteristicValue> {
        if id == self.primary.id() {
            self.primary.value()
        } else {
            self.companion
                .as_ref()
                .filter(|c| c.id() == id)
                .and_then(Characteristic::value)
        }
    }

    async fn get(&self, id: CharacteristicId) -> Result<CharacteristicValue> {
        if id != self.primary.id() && !self.is_companion(id) {
            return Err(Error::UnknownCharacteristic(id));
        }
        self.read(id).await.inspect_err(|e| {
            error!("[{}] {id} - get error: {e}", self.name);
        })
    }

    async fn set(&self, id: CharacteristicId, value: CharacteristicValue) -> Result<()> {
        if self.is_companion(id) {
            return Err(Error::ReadOnly(id));
        }
        if id != self.primary.id() {
            return Err(Error::UnknownCharacteristic(id));
        }
        let Some(write) = self.binding.write else {
            return Err(Error::ReadOnly(id));
        };

        debug!("[{}] {id} - set: {value}", self.name);
        self.write(write.command, value).await.inspect_err(|e| {
            error!("[{}] {id} - set {value} error: {e}", self.name);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;
    use crate::mock::MockPurifier;
    use miair_types::AirQuality;

    fn accessory(purifier: &Arc<MockPurifier>, binding: PropertyBinding) -> PropertyAccessory {
        let (tx, _rx) = event_channel(64);
        let device = Arc::new(DeviceProxy::with_transport("test", purifier.clone()));
        PropertyAccessory::new("Test", binding, device, tx)
    }

    #[tokio::test]
    async fn test_temperature_divides_by_ten() {
        let purifier = Arc::new(MockPurifier::builder().temp_dec(215).build());
        let sensor = accessory(&purifier, PropertyBinding::temperature());

        let value = sensor.get(CharacteristicId::CurrentTemperature).await.unwrap();
        assert_eq!(value, CharacteristicValue::Temperature(21.5));
        assert_eq!(sensor.kind(), AccessoryKind::TemperatureSensor);
        assert_eq!(sensor.info().model, "AirPurifier2S");
    }

    #[tokio::test]
    async fn test_humidity_is_percent() {
        let purifier = Arc::new(MockPurifier::builder().humidity(47).build());
        let sensor = accessory(&purifier, PropertyBinding::humidity());

        let value = sensor.get(CharacteristicId::CurrentRelativeHumidity).await.unwrap();
        assert_eq!(value, CharacteristicValue::Percent(47));
    }

    #[tokio::test]
    async fn test_unexpected_value() {
        let purifier = Arc::new(MockPurifier::new());
        purifier.set_property("temp_dec", "broken").await;
        let sensor = accessory(&purifier, PropertyBinding::temperature());

        let err = sensor.get(CharacteristicId::CurrentTemperature).await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedValue { ref property, .. } if property == "temp_dec"));
        assert_eq!(sensor.displayed(CharacteristicId::CurrentTemperature), None);
    }

    #[tokio::test]
    async fn test_air_quality_pushes_density() {
        let purifier = Arc::new(MockPurifier::builder().aqi(120).build());
        let sensor = accessory(&purifier, PropertyBinding::air_quality(Thresholds::default()));

        let value = sensor.get(CharacteristicId::AirQuality).await.unwrap();
        assert_eq!(value, CharacteristicValue::AirQuality(AirQuality::Fair));
        assert_eq!(
            sensor.displayed(CharacteristicId::Pm25Density),
            Some(CharacteristicValue::Density(120.0))
        );

        purifier.set_property("aqi", 55i64).await;
        sensor.device.read(&["aqi"], true).await.unwrap();
        let value = sensor.get(CharacteristicId::AirQuality).await.unwrap();
        assert_eq!(value, CharacteristicValue::AirQuality(AirQuality::Good));

        let bindings = sensor.characteristics();
        assert_eq!(bindings.len(), 2);
        assert!(bindings.iter().all(|b| !b.settable));
    }

    #[tokio::test]
    async fn test_air_quality_non_numeric_is_unknown() {
        let purifier = Arc::new(MockPurifier::new());
        purifier.set_property("aqi", "n/a").await;
        let sensor = accessory(&purifier, PropertyBinding::air_quality(Thresholds::default()));

        let value = sensor.get(CharacteristicId::AirQuality).await.unwrap();
        assert_eq!(value, CharacteristicValue::AirQuality(AirQuality::Unknown));
        assert!(sensor.get(CharacteristicId::Pm25Density).await.is_err());
    }

    #[tokio::test]
    async fn test_switch_write_protocol() {
        let purifier = Arc::new(MockPurifier::builder().led(true).build());
        let led = accessory(&purifier, PropertyBinding::led());

        led.set(CharacteristicId::On, CharacteristicValue::On(false)).await.unwrap();
        assert_eq!(purifier.property("led").await, Some("off".into()));
        assert_eq!(led.device.cached("led").await, Some("off".into()));
        assert_eq!(led.displayed(CharacteristicId::On), Some(CharacteristicValue::On(false)));

        let invocation = &purifier.invocations().await[0];
        assert_eq!(invocation.command, "set_led");
        assert_eq!(invocation.args, vec![PropertyValue::from("off")]);
    }

    #[tokio::test]
    async fn test_rejected_write_keeps_primed_value() {
        let purifier = Arc::new(MockPurifier::builder().buzzer(true).build());
        purifier.reject_command("set_buzzer", "error").await;
        let buzzer = accessory(&purifier, PropertyBinding::buzzer());

        let err = buzzer
            .set(CharacteristicId::On, CharacteristicValue::On(false))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Rejected { .. }));
        assert_eq!(buzzer.device.cached("volume").await, Some("off".into()));
        assert_eq!(buzzer.displayed(CharacteristicId::On), None);
    }

    #[tokio::test]
    async fn test_set_errors() {
        let purifier = Arc::new(MockPurifier::new());
        let sensor = accessory(&purifier, PropertyBinding::temperature());
        let err = sensor
            .set(CharacteristicId::CurrentTemperature, CharacteristicValue::Temperature(20.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReadOnly(_)));

        let err = sensor.get(CharacteristicId::On).await.unwrap_err();
        assert!(matches!(err, Error::UnknownCharacteristic(CharacteristicId::On)));

        let led = accessory(&purifier, PropertyBinding::led());
        let err = led
            .set(CharacteristicId::On, CharacteristicValue::Percent(3))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
        assert!(purifier.invocations().await.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_runs_all_gets() {
        let purifier = Arc::new(MockPurifier::builder().aqi(400).build());
        let sensor = accessory(&purifier, PropertyBinding::air_quality(Thresholds::default()));

        sensor.refresh().await.unwrap();
        assert_eq!(
            sensor.displayed(CharacteristicId::AirQuality),
            Some(CharacteristicValue::AirQuality(AirQuality::Poor))
        );
        assert_eq!(purifier.fetch_count(), 1);
    }
}
