//! Error types for miair-core.
//!
//! This module defines all error types that can occur when talking to the
//! purifier through the [`DeviceProxy`](crate::DeviceProxy) and when driving
//! characteristics.
//!
//! # Error Taxonomy
//!
//! | Error | Raised when | Cache effect |
//! |-------|-------------|--------------|
//! | [`Error::NotConnected`] | Any read/write before the transport is attached | none |
//! | [`Error::Communication`] | Transport failure during fetch or invoke | none (fetch) / optimistic value kept (invoke) |
//! | [`Error::Rejected`] | Device answered a command with a non-`"ok"` token | optimistic value kept |
//! | [`Error::UnexpectedValue`] | Device reported a value of the wrong shape | none |
//! | [`Error::InvalidValue`] | A set request carried a value of the wrong domain | none |
//!
//! Nothing here is retried by the core. A command failure after an optimistic
//! prime leaves the primed value in the cache until the next forced refetch
//! (normally the next poll cycle) reconciles it.

use thiserror::Error;

use miair_types::{CharacteristicId, ParseError};

/// Errors that can occur when communicating with the purifier.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum Error {
    /// Operation attempted before a transport was attached.
    #[error("Not connected to device")]
    NotConnected,

    /// A transport was already attached; the connected state is permanent.
    #[error("Already connected to device")]
    AlreadyConnected,

    /// Establishing the transport failed.
    #[error("Failed to connect to {address}: {reason}")]
    ConnectionFailed {
        /// Device address that was dialed.
        address: String,
        /// Transport-supplied reason.
        reason: String,
    },

    /// Transport-level failure during a fetch or invoke.
    #[error("Device communication failed during {operation}: {reason}")]
    Communication {
        /// The operation that failed (e.g. `get_prop`, `set_mode`).
        operation: String,
        /// Transport-supplied reason.
        reason: String,
    },

    /// The device answered a command with something other than `"ok"`.
    #[error("Device rejected {command}: {reason}")]
    Rejected {
        /// The command that was rejected.
        command: String,
        /// The first result token reported by the device.
        reason: String,
    },

    /// A property value could not be interpreted.
    #[error("Unexpected value for property '{property}': {source}")]
    UnexpectedValue {
        /// Property name.
        property: String,
        /// What went wrong.
        source: ParseError,
    },

    /// A set request carried a value of the wrong domain.
    #[error("Invalid value for {characteristic}: {reason}")]
    InvalidValue {
        /// The characteristic being written.
        characteristic: CharacteristicId,
        /// Description of the mismatch.
        reason: String,
    },

    /// The accessory does not expose the requested characteristic.
    #[error("Characteristic {0} is not exposed by this accessory")]
    UnknownCharacteristic(CharacteristicId),

    /// The characteristic has no set handler.
    #[error("Characteristic {0} is read-only")]
    ReadOnly(CharacteristicId),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a communication error with operation context.
    pub fn communication(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Communication {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a rejection error from the device's result token.
    pub fn rejected(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Create an unexpected-value error for a property.
    pub fn unexpected_value(property: impl Into<String>, source: ParseError) -> Self {
        Self::UnexpectedValue {
            property: property.into(),
            source,
        }
    }

    /// Create an invalid-value error for a set request.
    pub fn invalid_value(characteristic: CharacteristicId, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            characteristic,
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether the error came from the device or its transport, as opposed
    /// to a local precondition.
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Error::Communication { .. } | Error::Rejected { .. } | Error::UnexpectedValue { .. }
        )
    }
}

/// Result type alias using miair-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotConnected;
        assert_eq!(err.to_string(), "Not connected to device");

        let err = Error::communication("get_prop", "socket closed");
        assert!(err.to_string().contains("get_prop"));
        assert!(err.to_string().contains("socket closed"));

        let err = Error::rejected("set_mode", "unknown_method");
        assert_eq!(err.to_string(), "Device rejected set_mode: unknown_method");

        let err = Error::invalid_value(CharacteristicId::RotationSpeed, "expected percent");
        assert!(err.to_string().contains("RotationSpeed"));

        let err = Error::ReadOnly(CharacteristicId::CurrentTemperature);
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_unexpected_value_display() {
        let err = Error::unexpected_value("temp_dec", ParseError::unexpected("number", "\"x\""));
        let msg = err.to_string();
        assert!(msg.contains("temp_dec"));
        assert!(msg.contains("expected number"));
    }

    #[test]
    fn test_is_device_error() {
        assert!(Error::communication("get_prop", "timeout").is_device_error());
        assert!(Error::rejected("set_led", "error").is_device_error());
        assert!(!Error::NotConnected.is_device_error());
        assert!(!Error::ReadOnly(CharacteristicId::AirQuality).is_device_error());
    }
}
