//! Property and command names understood by the Mi Air Purifier 2S.
//!
//! The device exposes a flat namespace of named properties that are read in
//! batches with `get_prop`, and a set of `set_*` commands that change them.

// --- Properties ---

/// Operating mode: `"auto"`, `"silent"`, `"favorite"` (or `"idle"` when off).
pub const MODE: &str = "mode";

/// Power state: `"on"` / `"off"`.
pub const POWER: &str = "power";

/// Physical child lock: `"on"` / `"off"`.
pub const CHILD_LOCK: &str = "child_lock";

/// Fan level used in favorite (manual) mode, 1..=14 on the 2S.
pub const FAVORITE_LEVEL: &str = "favorite_level";

/// Temperature in tenths of a degree Celsius.
pub const TEMP_DEC: &str = "temp_dec";

/// Relative humidity in percent.
pub const HUMIDITY: &str = "humidity";

/// PM2.5 density in µg/m³ (reported by the device as "aqi").
pub const AQI: &str = "aqi";

/// Remaining filter life in percent.
pub const FILTER1_LIFE: &str = "filter1_life";

/// Buzzer state: `"on"` / `"off"`.
pub const VOLUME: &str = "volume";

/// Display LED state: `"on"` / `"off"`.
pub const LED: &str = "led";

/// Properties refreshed together on every poll cycle.
pub const POLL_PROPERTIES: [&str; 10] = [
    MODE,
    POWER,
    CHILD_LOCK,
    FAVORITE_LEVEL,
    TEMP_DEC,
    HUMIDITY,
    AQI,
    FILTER1_LIFE,
    VOLUME,
    LED,
];

// --- Commands ---

/// Batched property read.
pub const GET_PROP: &str = "get_prop";

/// Switch power, argument `"on"` / `"off"`.
pub const SET_POWER: &str = "set_power";

/// Change mode, argument one of the `MODE_*` values.
pub const SET_MODE: &str = "set_mode";

/// Toggle the child lock, argument `"on"` / `"off"`.
pub const SET_CHILD_LOCK: &str = "set_child_lock";

/// Set the favorite-mode fan level, integer argument.
pub const SET_LEVEL_FAVORITE: &str = "set_level_favorite";

/// Toggle the buzzer, argument `"on"` / `"off"`.
pub const SET_BUZZER: &str = "set_buzzer";

/// Toggle the display LED, argument `"on"` / `"off"`.
pub const SET_LED: &str = "set_led";

// --- Values ---

pub const ON: &str = "on";
pub const OFF: &str = "off";

pub const MODE_AUTO: &str = "auto";
pub const MODE_SILENT: &str = "silent";
pub const MODE_FAVORITE: &str = "favorite";

/// First result token of a successful command.
pub const RESULT_OK: &str = "ok";

/// Encode a boolean as the device's `"on"` / `"off"` string.
pub fn on_off(value: bool) -> &'static str {
    if value { ON } else { OFF }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_off() {
        assert_eq!(on_off(true), "on");
        assert_eq!(on_off(false), "off");
    }

    #[test]
    fn test_poll_properties_unique() {
        let mut names = POLL_PROPERTIES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), POLL_PROPERTIES.len());
    }
}
