//! Which accessories to expose and what to call them.
//!
//! An accessory is exposed when it is not disabled and has a non-empty name.
//! The purifier additionally needs a named silent-mode switch; disabling the
//! switch only hides it.

use serde::{Deserialize, Serialize};

/// Display name and enable flag of one accessory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessoryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

impl AccessoryConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            disabled: false,
        }
    }

    /// Non-empty display name.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.trim().is_empty())
    }

    /// The display name, if the accessory should be exposed.
    pub fn enabled_name(&self) -> Option<&str> {
        if self.disabled {
            None
        } else {
            self.display_name()
        }
    }
}

/// Per-accessory settings. Missing entries are disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessoriesConfig {
    pub air_purifier: AccessoryConfig,
    pub silent_mode_switch: AccessoryConfig,
    pub temperature: AccessoryConfig,
    pub humidity: AccessoryConfig,
    pub buzzer_switch: AccessoryConfig,
    pub led_bulb: AccessoryConfig,
    pub air_quality: AccessoryConfig,
}

impl AccessoriesConfig {
    /// Every accessory enabled with a sensible name.
    pub fn with_default_names() -> Self {
        Self {
            air_purifier: AccessoryConfig::named("Air Purifier"),
            silent_mode_switch: AccessoryConfig::named("Silent Mode"),
            temperature: AccessoryConfig::named("Temperature"),
            humidity: AccessoryConfig::named("Humidity"),
            buzzer_switch: AccessoryConfig::named("Buzzer"),
            led_bulb: AccessoryConfig::named("LED"),
            air_quality: AccessoryConfig::named("Air Quality"),
        }
    }

    /// Purifier and silent switch names, if the purifier is exposed.
    pub fn purifier_names(&self) -> Option<(&str, &str)> {
        let purifier = self.air_purifier.enabled_name()?;
        let silent = self.silent_mode_switch.display_name()?;
        Some((purifier, silent))
    }
}
