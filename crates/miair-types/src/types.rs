//! Core types shared by the device proxy and the accessory layer.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

/// A scalar property value as reported by the device.
///
/// The purifier reports enumerations and booleans as strings (`"on"`,
/// `"favorite"`) and measurements as integers (`temp_dec = 215`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum PropertyValue {
    /// JSON boolean.
    Bool(bool),
    /// Integer measurement or level.
    Int(i64),
    /// Non-integral number.
    Float(f64),
    /// String enumeration (`"on"`, `"auto"`, ...).
    Text(String),
}

impl PropertyValue {
    /// Borrow the value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret the value as an integer.
    ///
    /// Integral floats and numeric strings are accepted, since some firmware
    /// versions quote their numbers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            PropertyValue::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            PropertyValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interpret the value as a floating point number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(v) => Some(*v as f64),
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Text(s) => s.trim().parse().ok(),
            PropertyValue::Bool(_) => None,
        }
    }

    /// Like [`as_i64`](Self::as_i64) but with a descriptive error.
    pub fn expect_i64(&self) -> ParseResult<i64> {
        self.as_i64()
            .ok_or_else(|| ParseError::unexpected("integer", self))
    }

    /// Like [`as_f64`](Self::as_f64) but with a descriptive error.
    pub fn expect_f64(&self) -> ParseResult<f64> {
        self.as_f64().ok_or_else(|| ParseError::unexpected("number", self))
    }

    /// True only for the exact string `"on"`.
    pub fn is_on(&self) -> bool {
        self.as_str() == Some(crate::props::ON)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<u8> for PropertyValue {
    fn from(value: u8) -> Self {
        PropertyValue::Int(i64::from(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

/// Whether the purifier is switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Active {
    Inactive = 0,
    Active = 1,
}

/// What the purifier is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum CurrentPurifierState {
    Inactive = 0,
    Idle = 1,
    PurifyingAir = 2,
}

/// Requested operating mode.
///
/// `Auto` covers both the device's `"auto"` and `"silent"` modes; `Manual`
/// is the device's `"favorite"` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum TargetPurifierState {
    Manual = 0,
    Auto = 1,
}

/// Physical controls lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum LockState {
    Unlocked = 0,
    Locked = 1,
}

/// Air quality classification derived from PM2.5 density.
///
/// Ordering follows severity, so `AirQuality::Poor > AirQuality::Good`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum AirQuality {
    Unknown = 0,
    Excellent = 1,
    Good = 2,
    Fair = 3,
    Inferior = 4,
    Poor = 5,
}

impl fmt::Display for AirQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AirQuality::Unknown => write!(f, "Unknown"),
            AirQuality::Excellent => write!(f, "Excellent"),
            AirQuality::Good => write!(f, "Good"),
            AirQuality::Fair => write!(f, "Fair"),
            AirQuality::Inferior => write!(f, "Inferior"),
            AirQuality::Poor => write!(f, "Poor"),
        }
    }
}

/// Filter replacement indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum FilterIndication {
    FilterOk = 0,
    ChangeFilter = 1,
}

/// Identifies one exposed characteristic within an accessory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CharacteristicId {
    Active,
    CurrentAirPurifierState,
    TargetAirPurifierState,
    /// The silent-mode switch's `On` characteristic.
    SilentMode,
    LockPhysicalControls,
    RotationSpeed,
    CurrentTemperature,
    CurrentRelativeHumidity,
    Pm25Density,
    AirQuality,
    FilterChangeIndication,
    FilterLifeLevel,
    /// Generic switch / bulb `On`.
    On,
}

impl fmt::Display for CharacteristicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CharacteristicId::Active => "Active",
            CharacteristicId::CurrentAirPurifierState => "CurrentAirPurifierState",
            CharacteristicId::TargetAirPurifierState => "TargetAirPurifierState",
            CharacteristicId::SilentMode => "SilentModeSwitch",
            CharacteristicId::LockPhysicalControls => "LockPhysicalControls",
            CharacteristicId::RotationSpeed => "RotationSpeed",
            CharacteristicId::CurrentTemperature => "CurrentTemperature",
            CharacteristicId::CurrentRelativeHumidity => "CurrentRelativeHumidity",
            CharacteristicId::Pm25Density => "PM2_5Density",
            CharacteristicId::AirQuality => "AirQuality",
            CharacteristicId::FilterChangeIndication => "FilterChangeIndication",
            CharacteristicId::FilterLifeLevel => "FilterLifeLevel",
            CharacteristicId::On => "On",
        };
        f.write_str(name)
    }
}

/// The value shown for a characteristic.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "value", rename_all = "snake_case"))]
pub enum CharacteristicValue {
    Active(Active),
    CurrentState(CurrentPurifierState),
    TargetState(TargetPurifierState),
    Lock(LockState),
    On(bool),
    /// 0-100 slider or percentage (rotation speed, humidity, filter life).
    Percent(u8),
    /// Degrees Celsius.
    Temperature(f32),
    /// PM2.5 density in µg/m³.
    Density(f32),
    AirQuality(AirQuality),
    FilterChange(FilterIndication),
}

impl CharacteristicValue {
    /// Build a percentage value, rejecting anything outside 0..=100.
    pub fn percent(value: i64) -> ParseResult<Self> {
        if (0..=100).contains(&value) {
            Ok(CharacteristicValue::Percent(value as u8))
        } else {
            Err(ParseError::OutOfRange {
                value,
                min: 0,
                max: 100,
            })
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CharacteristicValue::On(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_percent(&self) -> Option<u8> {
        match self {
            CharacteristicValue::Percent(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_active(&self) -> Option<Active> {
        match self {
            CharacteristicValue::Active(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_target_state(&self) -> Option<TargetPurifierState> {
        match self {
            CharacteristicValue::TargetState(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_lock(&self) -> Option<LockState> {
        match self {
            CharacteristicValue::Lock(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacteristicValue::Active(v) => write!(f, "{v:?}"),
            CharacteristicValue::CurrentState(v) => write!(f, "{v:?}"),
            CharacteristicValue::TargetState(v) => write!(f, "{v:?}"),
            CharacteristicValue::Lock(v) => write!(f, "{v:?}"),
            CharacteristicValue::On(v) => write!(f, "{v}"),
            CharacteristicValue::Percent(v) => write!(f, "{v}%"),
            CharacteristicValue::Temperature(v) => write!(f, "{v:.1}°C"),
            CharacteristicValue::Density(v) => write!(f, "{v} µg/m³"),
            CharacteristicValue::AirQuality(v) => write!(f, "{v}"),
            CharacteristicValue::FilterChange(v) => write!(f, "{v:?}"),
        }
    }
}

/// Kind of sub-accessory presented to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AccessoryKind {
    AirPurifier,
    TemperatureSensor,
    HumiditySensor,
    BuzzerSwitch,
    LedBulb,
    AirQualitySensor,
}

impl fmt::Display for AccessoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessoryKind::AirPurifier => write!(f, "Air Purifier"),
            AccessoryKind::TemperatureSensor => write!(f, "Temperature Sensor"),
            AccessoryKind::HumiditySensor => write!(f, "Humidity Sensor"),
            AccessoryKind::BuzzerSwitch => write!(f, "Buzzer Switch"),
            AccessoryKind::LedBulb => write!(f, "LED Bulb"),
            AccessoryKind::AirQualitySensor => write!(f, "Air Quality Sensor"),
        }
    }
}

/// Accessory information service contents.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AccessoryInfo {
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
}

impl Default for AccessoryInfo {
    fn default() -> Self {
        Self {
            manufacturer: "XiaoMi".to_string(),
            model: "AirPurifier2S".to_string(),
            serial: "Undefined".to_string(),
        }
    }
}
