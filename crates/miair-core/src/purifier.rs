//! The air purifier accessory.
//!
//! Each characteristic is bound to one device property. Reads go through the
//! shared [`DeviceProxy`] cache. Writes follow one protocol: prime the cache
//! with the new property value, send the command, and on an `"ok"` answer
//! store the requested value and push the consequences onto sibling
//! characteristics. Pushes only change what is displayed; they never run the
//! sibling's own set handler.
//!
//! | Characteristic | Property | Set command |
//! |----------------|----------|-------------|
//! | Active | `power` | `set_power` |
//! | CurrentAirPurifierState | `power` | - |
//! | TargetAirPurifierState | `mode` | `set_mode` |
//! | SilentModeSwitch | `mode` | `set_mode` |
//! | LockPhysicalControls | `child_lock` | `set_child_lock` |
//! | RotationSpeed | `favorite_level` | `set_level_favorite` |
//! | CurrentTemperature | `temp_dec` | - |
//! | CurrentRelativeHumidity | `humidity` | - |
//! | PM2_5Density / AirQuality | `aqi` | - |
//! | FilterChangeIndication / FilterLifeLevel | `filter1_life` | - |
//!
//! The silent-mode switch is its own service with its own display name. It
//! always exists because the target-mode and active handlers consult it, but
//! it can be hidden from the hub.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use miair_types::{
    AccessoryInfo, AccessoryKind, Active, CharacteristicId, CharacteristicValue,
    CurrentPurifierState, FilterIndication, LockState, ParseError, PropertyValue, TargetPurifierState,
    props,
};

use crate::accessory::{Accessory, decode_density, decode_percent, decode_temperature};
use crate::characteristic::{Characteristic, CharacteristicBinding};
use crate::device::DeviceProxy;
use crate::error::{Error, Result};
use crate::events::EventSender;
use crate::level::LevelMapper;
use crate::thresholds::Thresholds;

/// Remaining filter life (percent) below which a change is requested.
pub const FILTER_CHANGE_THRESHOLD: i64 = 5;

fn decode_err(property: &'static str) -> impl Fn(ParseError) -> Error {
    move |e| Error::unexpected_value(property, e)
}

/// Air purifier accessory with its companion silent-mode switch.
pub struct AirPurifier {
    name: String,
    silent_switch_name: String,
    silent_switch_hidden: bool,
    info: AccessoryInfo,
    device: Arc<DeviceProxy>,
    levels: LevelMapper,
    thresholds: Thresholds,

    active: Characteristic,
    current_state: Characteristic,
    target_state: Characteristic,
    silent: Characteristic,
    lock: Characteristic,
    rotation_speed: Characteristic,
    temperature: Characteristic,
    humidity: Characteristic,
    pm25: Characteristic,
    air_quality: Characteristic,
    filter_change: Characteristic,
    filter_life: Characteristic,
}

impl std::fmt::Debug for AirPurifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirPurifier")
            .field("name", &self.name)
            .field("silent_switch_name", &self.silent_switch_name)
            .field("silent_switch_hidden", &self.silent_switch_hidden)
            .finish()
    }
}

impl AirPurifier {
    pub fn new(
        name: impl Into<String>,
        silent_switch_name: impl Into<String>,
        device: Arc<DeviceProxy>,
        events: EventSender,
    ) -> Self {
        use CharacteristicBinding as B;
        use CharacteristicId as Id;

        let name = name.into();
        let silent_switch_name = silent_switch_name.into();
        let c = |binding| Characteristic::new(&name, binding, events.clone());

        Self {
            active: c(B::settable(Id::Active)),
            current_state: c(B::read_only(Id::CurrentAirPurifierState)),
            target_state: c(B::settable(Id::TargetAirPurifierState)),
            silent: Characteristic::new(
                &silent_switch_name,
                B::settable(Id::SilentMode),
                events.clone(),
            ),
            lock: c(B::settable(Id::LockPhysicalControls)),
            rotation_speed: c(B::settable(Id::RotationSpeed)),
            temperature: c(B::read_only(Id::CurrentTemperature)),
            humidity: c(B::read_only(Id::CurrentRelativeHumidity)),
            pm25: c(B::read_only(Id::Pm25Density)),
            air_quality: c(B::read_only(Id::AirQuality)),
            filter_change: c(B::read_only(Id::FilterChangeIndication)),
            filter_life: c(B::read_only(Id::FilterLifeLevel)),
            name,
            silent_switch_name,
            silent_switch_hidden: false,
            info: AccessoryInfo::default(),
            device,
            levels: LevelMapper::default(),
            thresholds: Thresholds::default(),
        }
    }

    /// Use a custom slider/level boundary table.
    pub fn with_levels(mut self, levels: LevelMapper) -> Self {
        self.levels = levels;
        self
    }

    /// Use custom air quality thresholds.
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Hide the silent-mode switch from the hub. It keeps working internally.
    pub fn hide_silent_switch(mut self, hidden: bool) -> Self {
        self.silent_switch_hidden = hidden;
        self
    }

    pub fn silent_switch_name(&self) -> &str {
        &self.silent_switch_name
    }

    pub fn silent_switch_visible(&self) -> bool {
        !self.silent_switch_hidden
    }

    fn slot(&self, id: CharacteristicId) -> Option<&Characteristic> {
        use CharacteristicId as Id;
        Some(match id {
            Id::Active => &self.active,
            Id::CurrentAirPurifierState => &self.current_state,
            Id::TargetAirPurifierState => &self.target_state,
            Id::SilentMode => &self.silent,
            Id::LockPhysicalControls => &self.lock,
            Id::RotationSpeed => &self.rotation_speed,
            Id::CurrentTemperature => &self.temperature,
            Id::CurrentRelativeHumidity => &self.humidity,
            Id::Pm25Density => &self.pm25,
            Id::AirQuality => &self.air_quality,
            Id::FilterChangeIndication => &self.filter_change,
            Id::FilterLifeLevel => &self.filter_life,
            Id::On => return None,
        })
    }

    async fn read(&self, id: CharacteristicId, property: &str) -> Result<PropertyValue> {
        let value = self.device.read_one(property, false).await?;
        debug!("[{}] {id} - get: {value}", self.name);
        Ok(value)
    }

    async fn compute(&self, id: CharacteristicId) -> Result<CharacteristicValue> {
        use CharacteristicId as Id;
        use CharacteristicValue as V;

        let value = match id {
            Id::Active => {
                let power = self.read(id, props::POWER).await?;
                V::Active(if power.as_str() == Some(props::OFF) {
                    Active::Inactive
                } else {
                    Active::Active
                })
            }
            Id::CurrentAirPurifierState => {
                let power = self.read(id, props::POWER).await?;
                V::CurrentState(if power.as_str() == Some(props::OFF) {
                    CurrentPurifierState::Inactive
                } else {
                    CurrentPurifierState::PurifyingAir
                })
            }
            Id::TargetAirPurifierState => {
                let mode = self.read(id, props::MODE).await?;
                V::TargetState(if mode.as_str() == Some(props::MODE_FAVORITE) {
                    TargetPurifierState::Manual
                } else {
                    TargetPurifierState::Auto
                })
            }
            Id::SilentMode => {
                let mode = self.read(id, props::MODE).await?;
                V::On(mode.as_str() == Some(props::MODE_SILENT))
            }
            Id::LockPhysicalControls => {
                let lock = self.read(id, props::CHILD_LOCK).await?;
                V::Lock(if lock.is_on() {
                    LockState::Locked
                } else {
                    LockState::Unlocked
                })
            }
            Id::RotationSpeed => {
                let level = self
                    .read(id, props::FAVORITE_LEVEL)
                    .await?
                    .expect_i64()
                    .map_err(decode_err(props::FAVORITE_LEVEL))?;
                V::Percent(self.rotation_for_level(level))
            }
            Id::CurrentTemperature => {
                let raw = self.read(id, props::TEMP_DEC).await?;
                decode_temperature(&raw).map_err(decode_err(props::TEMP_DEC))?
            }
            Id::CurrentRelativeHumidity => {
                let raw = self.read(id, props::HUMIDITY).await?;
                decode_percent(&raw).map_err(decode_err(props::HUMIDITY))?
            }
            Id::Pm25Density => {
                let raw = self.read(id, props::AQI).await?;
                self.air_quality
                    .update_value(V::AirQuality(self.thresholds.classify_value(&raw)));
                decode_density(&raw).map_err(decode_err(props::AQI))?
            }
            Id::AirQuality => {
                let raw = self.read(id, props::AQI).await?;
                V::AirQuality(self.thresholds.classify_value(&raw))
            }
            Id::FilterChangeIndication => {
                let life = self
                    .read(id, props::FILTER1_LIFE)
                    .await?
                    .expect_i64()
                    .map_err(decode_err(props::FILTER1_LIFE))?;
                V::FilterChange(if life < FILTER_CHANGE_THRESHOLD {
                    FilterIndication::ChangeFilter
                } else {
                    FilterIndication::FilterOk
                })
            }
            Id::FilterLifeLevel => {
                let raw = self.read(id, props::FILTER1_LIFE).await?;
                decode_percent(&raw).map_err(decode_err(props::FILTER1_LIFE))?
            }
            Id::On => return Err(Error::UnknownCharacteristic(id)),
        };
        Ok(value)
    }

    fn rotation_for_level(&self, level: i64) -> u8 {
        let level = level.clamp(0, i64::from(u8::MAX)) as u8;
        let shown = self
            .rotation_speed
            .value()
            .and_then(|v| v.as_percent());
        self.levels.position_for_level(level, shown)
    }

    /// Whether the purifier is off, from the displayed Active value or,
    /// before the first Active get, from the `power` property.
    async fn is_inactive(&self) -> Result<bool> {
        if let Some(active) = self.active.value().and_then(|v| v.as_active()) {
            return Ok(active == Active::Inactive);
        }
        let power = self.device.read_one(props::POWER, false).await?;
        Ok(power.as_str() == Some(props::OFF))
    }

    /// Prime the cache, send the command and require `"ok"`.
    async fn command(&self, property: &str, command: &str, arg: PropertyValue) -> Result<()> {
        self.device.prime(property, arg.clone()).await;
        self.device.invoke(command, &[arg]).await
    }

    async fn set_active(&self, value: CharacteristicValue) -> Result<()> {
        let active = value
            .as_active()
            .ok_or_else(|| Error::invalid_value(CharacteristicId::Active, format!("got {value}")))?;
        let power = props::on_off(active == Active::Active);

        self.command(props::POWER, props::SET_POWER, power.into()).await?;
        self.active.update_value(value);

        self.current_state
            .update_value(CharacteristicValue::CurrentState(CurrentPurifierState::Idle));
        match active {
            Active::Active => {
                self.current_state.update_value(CharacteristicValue::CurrentState(
                    CurrentPurifierState::PurifyingAir,
                ));
                match self.device.read_one(props::MODE, false).await {
                    Ok(mode) => {
                        self.silent.update_value(CharacteristicValue::On(
                            mode.as_str() == Some(props::MODE_SILENT),
                        ));
                    }
                    Err(e) => error!("[{}] Active - re-reading mode failed: {e}", self.name),
                }
            }
            Active::Inactive => {
                self.current_state.update_value(CharacteristicValue::CurrentState(
                    CurrentPurifierState::Inactive,
                ));
                self.silent.update_value(CharacteristicValue::On(false));
            }
        }
        Ok(())
    }

    async fn set_target_state(&self, value: CharacteristicValue) -> Result<()> {
        let target = value.as_target_state().ok_or_else(|| {
            Error::invalid_value(CharacteristicId::TargetAirPurifierState, format!("got {value}"))
        })?;
        let mode = match target {
            TargetPurifierState::Auto if self.silent.value() == Some(CharacteristicValue::On(true)) => {
                props::MODE_SILENT
            }
            TargetPurifierState::Auto => props::MODE_AUTO,
            TargetPurifierState::Manual => props::MODE_FAVORITE,
        };

        self.command(props::MODE, props::SET_MODE, mode.into()).await?;

        if target == TargetPurifierState::Manual {
            let level = self
                .device
                .read_one(props::FAVORITE_LEVEL, false)
                .await?
                .expect_i64()
                .map_err(decode_err(props::FAVORITE_LEVEL))?;
            self.target_state.update_value(value);
            self.rotation_speed
                .update_value(CharacteristicValue::Percent(self.rotation_for_level(level)));
        } else {
            self.target_state.update_value(value);
        }

        if mode != props::MODE_SILENT {
            self.silent.update_value(CharacteristicValue::On(false));
        }
        Ok(())
    }

    async fn set_silent(&self, value: CharacteristicValue) -> Result<()> {
        let on = value.as_bool().ok_or_else(|| {
            Error::invalid_value(CharacteristicId::SilentMode, format!("got {value}"))
        })?;

        let inactive = self.is_inactive().await?;

        if on {
            self.command(props::MODE, props::SET_MODE, props::MODE_SILENT.into())
                .await?;
            self.silent.update_value(value);
            self.target_state
                .update_value(CharacteristicValue::TargetState(TargetPurifierState::Auto));
            if inactive {
                self.active.update_value(CharacteristicValue::Active(Active::Active));
                self.current_state.update_value(CharacteristicValue::CurrentState(
                    CurrentPurifierState::PurifyingAir,
                ));
            }
            return Ok(());
        }

        if inactive {
            self.silent.update_value(value);
            return Ok(());
        }

        let mode = match self.target_state.value().and_then(|v| v.as_target_state()) {
            Some(TargetPurifierState::Auto) => props::MODE_AUTO,
            _ => props::MODE_FAVORITE,
        };
        self.command(props::MODE, props::SET_MODE, mode.into()).await?;
        self.silent.update_value(value);
        Ok(())
    }

    async fn set_lock(&self, value: CharacteristicValue) -> Result<()> {
        let lock = value.as_lock().ok_or_else(|| {
            Error::invalid_value(CharacteristicId::LockPhysicalControls, format!("got {value}"))
        })?;
        let arg = props::on_off(lock == LockState::Locked);

        self.command(props::CHILD_LOCK, props::SET_CHILD_LOCK, arg.into())
            .await?;
        self.lock.update_value(value);
        Ok(())
    }

    async fn set_rotation_speed(&self, value: CharacteristicValue) -> Result<()> {
        let position = value.as_percent().filter(|p| *p <= 100).ok_or_else(|| {
            Error::invalid_value(CharacteristicId::RotationSpeed, format!("expected 0-100%, got {value}"))
        })?;

        if position == 0 {
            debug!("[{}] RotationSpeed - 0 ignored", self.name);
            self.rotation_speed.update_value(value);
            return Ok(());
        }

        let level = self.levels.level_for_position(position);
        self.command(props::FAVORITE_LEVEL, props::SET_LEVEL_FAVORITE, level.into())
            .await?;
        self.rotation_speed.update_value(value);
        Ok(())
    }
}

#[async_trait]
impl Accessory for AirPurifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AccessoryKind {
        AccessoryKind::AirPurifier
    }

    fn info(&self) -> &AccessoryInfo {
        &self.info
    }

    fn characteristics(&self) -> Vec<CharacteristicBinding> {
        let mut bindings: Vec<CharacteristicBinding> = [
            &self.active,
            &self.current_state,
            &self.target_state,
            &self.lock,
            &self.rotation_speed,
            &self.temperature,
            &self.humidity,
            &self.pm25,
            &self.air_quality,
            &self.filter_change,
            &self.filter_life,
        ]
        .iter()
        .map(|c| c.binding())
        .collect();

        if !self.silent_switch_hidden {
            bindings.push(self.silent.binding());
        }
        bindings
    }

    fn displayed(&self, id: CharacteristicId) -> Option<CharacteristicValue> {
        self.slot(id).and_then(Characteristic::value)
    }

    async fn get(&self, id: CharacteristicId) -> Result<CharacteristicValue> {
        let slot = self.slot(id).ok_or(Error::UnknownCharacteristic(id))?;
        match self.compute(id).await {
            Ok(value) => {
                slot.update_value(value);
                Ok(value)
            }
            Err(e) => {
                error!("[{}] {id} - get error: {e}", self.name);
                Err(e)
            }
        }
    }

    async fn set(&self, id: CharacteristicId, value: CharacteristicValue) -> Result<()> {
        use CharacteristicId as Id;

        debug!("[{}] {id} - set: {value}", self.name);
        let result = match id {
            Id::Active => self.set_active(value).await,
            Id::TargetAirPurifierState => self.set_target_state(value).await,
            Id::SilentMode => self.set_silent(value).await,
            Id::LockPhysicalControls => self.set_lock(value).await,
            Id::RotationSpeed => self.set_rotation_speed(value).await,
            Id::On => Err(Error::UnknownCharacteristic(id)),
            _ => Err(Error::ReadOnly(id)),
        };

        if let Err(e) = &result {
            error!("[{}] {id} - set {value} error: {e}", self.name);
        }
        result
    }
}
