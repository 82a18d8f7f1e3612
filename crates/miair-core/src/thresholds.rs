//! PM2.5 thresholds and air quality classification.
//!
//! Both the purifier's PM2.5 reading and the stand-alone air quality sensor
//! classify the device's `aqi` property with the same [`Thresholds`].
//!
//! # Example
//!
//! ```
//! use miair_core::Thresholds;
//! use miair_types::{AirQuality, PropertyValue};
//!
//! let thresholds = Thresholds::default();
//! assert_eq!(thresholds.classify(120), AirQuality::Fair);
//! assert_eq!(thresholds.classify_value(&PropertyValue::from("n/a")), AirQuality::Unknown);
//! ```

use serde::{Deserialize, Serialize};

use miair_types::{AirQuality, PropertyValue};

/// Upper bounds (inclusive, µg/m³) for each air quality class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Upper bound for Excellent.
    pub excellent_max: i64,
    /// Upper bound for Good.
    pub good_max: i64,
    /// Upper bound for Fair.
    pub fair_max: i64,
    /// Upper bound for Inferior. Anything above is Poor.
    pub inferior_max: i64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            excellent_max: 50,
            good_max: 100,
            fair_max: 200,
            inferior_max: 300,
        }
    }
}

/// Air quality classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Thresholds {
    config: ThresholdConfig,
}

impl Thresholds {
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Classify a PM2.5 density.
    pub fn classify(&self, density: i64) -> AirQuality {
        let c = &self.config;
        if density <= c.excellent_max {
            AirQuality::Excellent
        } else if density <= c.good_max {
            AirQuality::Good
        } else if density <= c.fair_max {
            AirQuality::Fair
        } else if density <= c.inferior_max {
            AirQuality::Inferior
        } else {
            AirQuality::Poor
        }
    }

    /// Classify a raw `aqi` property value. Non-numeric values are Unknown.
    pub fn classify_value(&self, value: &PropertyValue) -> AirQuality {
        match value.as_f64() {
            Some(density) if density.is_finite() => self.classify(density.ceil() as i64),
            _ => AirQuality::Unknown,
        }
    }
}
