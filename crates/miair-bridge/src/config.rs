//! Bridge configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use miair_core::{AccessoriesConfig, LevelMapper, ThresholdConfig, Thresholds};

/// Bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Purifier connection settings.
    pub device: DeviceConfig,
    /// Fan level table and air quality thresholds.
    pub tuning: TuningConfig,
    /// Accessories to expose.
    pub accessories: AccessoriesConfig,
}

impl Config {
    /// A starting point for `init`: every accessory enabled, placeholder
    /// device credentials.
    pub fn template() -> Self {
        Self {
            device: DeviceConfig {
                address: "192.168.1.40".to_string(),
                token: "00112233445566778899aabbccddeeff".to_string(),
                poll_interval: default_poll_interval(),
            },
            tuning: TuningConfig::default(),
            accessories: AccessoriesConfig::with_default_names(),
        }
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// This checks:
    /// - Device address is not empty
    /// - Token is 32 hexadecimal characters
    /// - Poll interval is within 1 s - 1 hour
    /// - Air quality thresholds are strictly increasing
    ///
    /// # Example
    ///
    /// ```
    /// use miair_bridge::Config;
    ///
    /// let config = Config::template();
    /// config.validate().expect("Template config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.device.validate());
        errors.extend(self.tuning.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Purifier connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// IP address or host name of the purifier.
    #[serde(default)]
    pub address: String,
    /// 128-bit device token as hex.
    #[serde(default)]
    pub token: String,
    /// Poll interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

/// Minimum poll interval in seconds.
pub const MIN_POLL_INTERVAL: u64 = 1;
/// Maximum poll interval in seconds (1 hour).
pub const MAX_POLL_INTERVAL: u64 = 3600;
/// Length of a device token in hex characters.
pub const TOKEN_LENGTH: usize = 32;

fn default_poll_interval() -> u64 {
    5
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            token: String::new(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl DeviceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    /// Validate device configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.address.trim().is_empty() {
            errors.push(ValidationError {
                field: "device.address".to_string(),
                message: "device address cannot be empty".to_string(),
            });
        }

        if self.token.len() != TOKEN_LENGTH
            || !self.token.chars().all(|c| c.is_ascii_hexdigit())
        {
            errors.push(ValidationError {
                field: "device.token".to_string(),
                message: format!("token must be {} hexadecimal characters", TOKEN_LENGTH),
            });
        }

        if self.poll_interval < MIN_POLL_INTERVAL {
            errors.push(ValidationError {
                field: "device.poll_interval".to_string(),
                message: format!(
                    "poll interval {} is too short (minimum {} second)",
                    self.poll_interval, MIN_POLL_INTERVAL
                ),
            });
        } else if self.poll_interval > MAX_POLL_INTERVAL {
            errors.push(ValidationError {
                field: "device.poll_interval".to_string(),
                message: format!(
                    "poll interval {} is too long (maximum {} seconds / 1 hour)",
                    self.poll_interval, MAX_POLL_INTERVAL
                ),
            });
        }

        errors
    }
}

/// Fan level table and air quality thresholds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Slider boundaries of each favorite level, from 0 to 100.
    pub levels: LevelMapper,
    /// PM2.5 upper bounds of each air quality class.
    pub thresholds: ThresholdConfig,
}

impl TuningConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.thresholds.clone())
    }

    /// Validate tuning configuration.
    ///
    /// The level table is checked while parsing.
    pub fn validate(&self) -> Vec<ValidationError> {
        let t = &self.thresholds;
        let bounds = [
            ("excellent_max", t.excellent_max),
            ("good_max", t.good_max),
            ("fair_max", t.fair_max),
            ("inferior_max", t.inferior_max),
        ];

        let mut errors = Vec::new();
        if t.excellent_max < 0 {
            errors.push(ValidationError {
                field: "tuning.thresholds.excellent_max".to_string(),
                message: "threshold cannot be negative".to_string(),
            });
        }
        for pair in bounds.windows(2) {
            let ((_, lower), (name, upper)) = (pair[0], pair[1]);
            if upper <= lower {
                errors.push(ValidationError {
                    field: format!("tuning.thresholds.{}", name),
                    message: format!(
                        "threshold {} must be greater than {} ({})",
                        upper, pair[0].0, lower
                    ),
                });
            }
        }
        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path (e.g., `device.token`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("miair")
        .join("bridge.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use miair_core::AccessoryConfig;

    fn fields(config: &Config) -> Vec<String> {
        match config.validate() {
            Ok(()) => Vec::new(),
            Err(ConfigError::Validation(errors)) => errors.into_iter().map(|e| e.field).collect(),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.device.address.is_empty());
        assert_eq!(config.device.poll_interval, 5);
        assert_eq!(config.tuning.levels, LevelMapper::default());
        assert_eq!(config.accessories, AccessoriesConfig::default());
    }

    #[test]
    fn test_template_validates() {
        assert!(Config::template().validate().is_ok());
    }

    #[test]
    fn test_default_config_needs_credentials() {
        assert_eq!(
            fields(&Config::default()),
            vec!["device.address", "device.token"]
        );
    }

    #[test]
    fn test_config_full_toml() {
        let toml = r#"
            [device]
            address = "10.0.0.7"
            token = "ffeeddccbbaa99887766554433221100"
            poll_interval = 30

            [tuning]
            levels = [0, 50, 100]

            [tuning.thresholds]
            fair_max = 150

            [accessories.air_purifier]
            name = "Purifier"
            [accessories.silent_mode_switch]
            name = "Night"
            disabled = true
            [accessories.temperature]
            name = "Temperature"
            disabled = true
        "#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.device.address, "10.0.0.7");
        assert_eq!(config.device.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.tuning.levels.max_level(), 2);
        assert_eq!(config.tuning.thresholds.fair_max, 150);
        assert_eq!(config.tuning.thresholds.good_max, 100);
        assert_eq!(config.accessories.purifier_names(), Some(("Purifier", "Night")));
        assert!(config.accessories.silent_mode_switch.disabled);
        assert_eq!(config.accessories.temperature.enabled_name(), None);
        assert_eq!(config.accessories.humidity, AccessoryConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_level_table_fails_to_parse() {
        let toml = r#"
            [tuning]
            levels = [0, 60, 40, 100]
        "#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("bridge.toml");

        let mut config = Config::template();
        config.device.poll_interval = 12;
        config.accessories.led_bulb.disabled = true;

        config.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/bridge.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_validated_rejects_bad_token() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("bridge.toml");
        std::fs::write(
            &config_path,
            "[device]\naddress = \"10.0.0.7\"\ntoken = \"not-a-token\"\n",
        )
        .unwrap();

        let result = Config::load_validated(&config_path);
        assert!(matches!(result, Err(ConfigError::Validation(ref e)) if e.len() == 1));
    }

    #[test]
    fn test_token_validation() {
        let mut config = Config::template();

        config.device.token = "00112233445566778899AABBCCDDEEFF".to_string();
        assert!(config.validate().is_ok());

        config.device.token = "00112233445566778899aabbccddeef".to_string();
        assert_eq!(fields(&config), vec!["device.token"]);

        config.device.token = "00112233445566778899aabbccddeefg".to_string();
        assert_eq!(fields(&config), vec!["device.token"]);
    }

    #[test]
    fn test_poll_interval_validation() {
        let mut config = Config::template();

        config.device.poll_interval = 0;
        assert_eq!(fields(&config), vec!["device.poll_interval"]);

        config.device.poll_interval = 1;
        assert!(config.validate().is_ok());

        config.device.poll_interval = 3600;
        assert!(config.validate().is_ok());

        config.device.poll_interval = 3601;
        assert_eq!(fields(&config), vec!["device.poll_interval"]);
    }

    #[test]
    fn test_errors_are_collected() {
        let mut config = Config::template();
        config.device.address = "  ".to_string();
        config.device.token.clear();
        config.device.poll_interval = 0;
        config.tuning.thresholds.fair_max = 90;

        assert_eq!(
            fields(&config),
            vec![
                "device.address",
                "device.token",
                "device.poll_interval",
                "tuning.thresholds.fair_max",
            ]
        );
    }

    #[test]
    fn test_threshold_validation() {
        let mut config = Config::template();
        config.tuning.thresholds.inferior_max = 200;
        assert_eq!(fields(&config), vec!["tuning.thresholds.inferior_max"]);

        config.tuning.thresholds = ThresholdConfig {
            excellent_max: -1,
            ..Default::default()
        };
        assert_eq!(fields(&config), vec!["tuning.thresholds.excellent_max"]);
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("miair/bridge.toml"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let error = ConfigError::Validation(vec![
            ValidationError {
                field: "device.address".to_string(),
                message: "device address cannot be empty".to_string(),
            },
            ValidationError {
                field: "device.token".to_string(),
                message: "token must be 32 hexadecimal characters".to_string(),
            },
        ]);
        let msg = error.to_string();
        assert!(msg.contains("Configuration validation failed"));
        assert!(msg.contains("  - device.address: device address cannot be empty"));
        assert!(msg.contains("  - device.token: token must be 32"));
    }
}
