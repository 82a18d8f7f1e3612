//! Characteristic change notifications.
//!
//! Every time a characteristic's displayed value changes, whether from a
//! get, a successful set, a cascading push or a poll, a
//! [`CharacteristicEvent`] is broadcast. A hub adapter subscribes here to
//! forward updates.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::broadcast;

use miair_types::{CharacteristicId, CharacteristicValue};

/// A characteristic's displayed value changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicEvent {
    /// Display name of the accessory owning the characteristic.
    pub accessory: String,
    pub characteristic: CharacteristicId,
    pub value: CharacteristicValue,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

impl CharacteristicEvent {
    pub fn new(
        accessory: impl Into<String>,
        characteristic: CharacteristicId,
        value: CharacteristicValue,
    ) -> Self {
        Self {
            accessory: accessory.into(),
            characteristic,
            value,
            at: OffsetDateTime::now_utc(),
        }
    }
}

/// Sender for characteristic events.
pub type EventSender = broadcast::Sender<CharacteristicEvent>;

/// Receiver for characteristic events.
pub type EventReceiver = broadcast::Receiver<CharacteristicEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    broadcast::channel(capacity)
}

/// Default channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;
    use miair_types::Active;

    #[test]
    fn test_event_serialization() {
        let event = CharacteristicEvent::new(
            "Air Purifier",
            CharacteristicId::Active,
            CharacteristicValue::Active(Active::Active),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["accessory"], "Air Purifier");
        assert_eq!(json["characteristic"], "Active");
        assert_eq!(json["value"]["kind"], "active");
        assert!(json["at"].as_str().unwrap().contains('T'));

        let back: CharacteristicEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.characteristic, CharacteristicId::Active);
    }

    #[tokio::test]
    async fn test_event_channel() {
        let (tx, mut rx) = event_channel(16);
        tx.send(CharacteristicEvent::new(
            "LED",
            CharacteristicId::On,
            CharacteristicValue::On(false),
        ))
        .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.accessory, "LED");
        assert_eq!(event.value, CharacteristicValue::On(false));
    }
}
