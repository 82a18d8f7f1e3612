//! Shared types for bridging Mi air purifiers to home-automation hubs.
//!
//! This crate holds the vocabulary used on both sides of the bridge:
//!
//! - Raw device properties ([`PropertyValue`]) and the property / command
//!   names the purifier understands ([`props`])
//! - Characteristic identifiers and values presented to the hub
//! - Error types for value parsing
//!
//! # Example
//!
//! ```
//! use miair_types::{PropertyValue, props};
//!
//! let power = PropertyValue::from("on");
//! assert!(power.is_on());
//! assert_eq!(props::on_off(false), "off");
//! ```

pub mod error;
pub mod props;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    AccessoryInfo, AccessoryKind, Active, AirQuality, CharacteristicId, CharacteristicValue,
    CurrentPurifierState, FilterIndication, LockState, PropertyValue, TargetPurifierState,
};

#[cfg(test)]
mod tests {
    use super::*;

    // --- PropertyValue conversions ---

    #[test]
    fn test_property_value_as_i64() {
        assert_eq!(PropertyValue::Int(215).as_i64(), Some(215));
        assert_eq!(PropertyValue::Float(7.0).as_i64(), Some(7));
        assert_eq!(PropertyValue::Float(7.5).as_i64(), None);
        assert_eq!(PropertyValue::from(" 12 ").as_i64(), Some(12));
        assert_eq!(PropertyValue::from("on").as_i64(), None);
        assert_eq!(PropertyValue::Bool(true).as_i64(), None);
    }

    #[test]
    fn test_property_value_as_f64() {
        assert_eq!(PropertyValue::Int(45).as_f64(), Some(45.0));
        assert_eq!(PropertyValue::from("21.5").as_f64(), Some(21.5));
        assert_eq!(PropertyValue::Bool(false).as_f64(), None);
    }

    #[test]
    fn test_property_value_is_on_is_strict() {
        assert!(PropertyValue::from("on").is_on());
        assert!(!PropertyValue::from("ON").is_on());
        assert!(!PropertyValue::from("off").is_on());
        assert!(!PropertyValue::Bool(true).is_on());
        assert!(!PropertyValue::Int(1).is_on());
    }

    #[test]
    fn test_property_value_expect_errors() {
        let err = PropertyValue::from("favorite").expect_i64().unwrap_err();
        assert!(err.to_string().contains("integer"));
        assert!(err.to_string().contains("favorite"));

        let err = PropertyValue::Bool(true).expect_f64().unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedKind { .. }));
    }

    #[test]
    fn test_property_value_display() {
        assert_eq!(PropertyValue::from("auto").to_string(), "\"auto\"");
        assert_eq!(PropertyValue::Int(3).to_string(), "3");
        assert_eq!(PropertyValue::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_property_value_json_shape() {
        let values: Vec<PropertyValue> =
            serde_json::from_str(r#"["favorite", "on", 215, 45, 21.5, true]"#).unwrap();
        assert_eq!(
            values,
            vec![
                PropertyValue::from("favorite"),
                PropertyValue::from("on"),
                PropertyValue::Int(215),
                PropertyValue::Int(45),
                PropertyValue::Float(21.5),
                PropertyValue::Bool(true),
            ]
        );

        let json = serde_json::to_string(&PropertyValue::Int(7)).unwrap();
        assert_eq!(json, "7");
    }

    // --- CharacteristicValue ---

    #[test]
    fn test_characteristic_value_percent_bounds() {
        assert_eq!(
            CharacteristicValue::percent(0).unwrap(),
            CharacteristicValue::Percent(0)
        );
        assert_eq!(
            CharacteristicValue::percent(100).unwrap(),
            CharacteristicValue::Percent(100)
        );
        assert!(CharacteristicValue::percent(101).is_err());
        assert!(CharacteristicValue::percent(-1).is_err());
    }

    #[test]
    fn test_characteristic_value_accessors() {
        let v = CharacteristicValue::On(true);
        assert_eq!(v.as_bool(), Some(true));
        assert_eq!(v.as_percent(), None);

        let v = CharacteristicValue::TargetState(TargetPurifierState::Manual);
        assert_eq!(v.as_target_state(), Some(TargetPurifierState::Manual));
        assert_eq!(v.as_active(), None);
    }

    #[test]
    fn test_characteristic_value_display() {
        assert_eq!(CharacteristicValue::Temperature(21.5).to_string(), "21.5°C");
        assert_eq!(CharacteristicValue::Percent(40).to_string(), "40%");
        assert_eq!(
            CharacteristicValue::AirQuality(AirQuality::Fair).to_string(),
            "Fair"
        );
    }

    #[test]
    fn test_characteristic_value_serde() {
        let json =
            serde_json::to_value(CharacteristicValue::Active(Active::Active)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "active", "value": "Active" })
        );

        let back: CharacteristicValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, CharacteristicValue::Active(Active::Active));
    }

    #[test]
    fn test_air_quality_ordering() {
        assert!(AirQuality::Poor > AirQuality::Inferior);
        assert!(AirQuality::Good > AirQuality::Excellent);
        assert_eq!(AirQuality::Fair as u8, 3);
    }

    #[test]
    fn test_characteristic_id_display() {
        assert_eq!(CharacteristicId::SilentMode.to_string(), "SilentModeSwitch");
        assert_eq!(CharacteristicId::Pm25Density.to_string(), "PM2_5Density");
    }

    #[test]
    fn test_accessory_info_default() {
        let info = AccessoryInfo::default();
        assert_eq!(info.manufacturer, "XiaoMi");
        assert_eq!(info.model, "AirPurifier2S");
        assert_eq!(info.serial, "Undefined");
    }

    #[test]
    fn test_hap_discriminants() {
        assert_eq!(Active::Inactive as u8, 0);
        assert_eq!(CurrentPurifierState::PurifyingAir as u8, 2);
        assert_eq!(TargetPurifierState::Auto as u8, 1);
        assert_eq!(LockState::Locked as u8, 1);
        assert_eq!(FilterIndication::ChangeFilter as u8, 1);
    }
}
