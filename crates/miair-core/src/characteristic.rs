//! Displayed-value slots for exposed characteristics.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::trace;

use miair_types::{CharacteristicId, CharacteristicValue};

use crate::events::{CharacteristicEvent, EventSender};

/// An exposed characteristic and whether the hub may write it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacteristicBinding {
    pub id: CharacteristicId,
    pub settable: bool,
}

impl CharacteristicBinding {
    pub const fn read_only(id: CharacteristicId) -> Self {
        Self { id, settable: false }
    }

    pub const fn settable(id: CharacteristicId) -> Self {
        Self { id, settable: true }
    }
}

/// One characteristic's displayed value.
///
/// The slot starts empty. Gets, successful sets and sibling pushes all go
/// through [`update_value`](Self::update_value), which broadcasts a
/// [`CharacteristicEvent`] whenever the value actually changes.
#[derive(Debug)]
pub struct Characteristic {
    accessory: String,
    binding: CharacteristicBinding,
    value: Mutex<Option<CharacteristicValue>>,
    events: EventSender,
}

impl Characteristic {
    pub fn new(accessory: impl Into<String>, binding: CharacteristicBinding, events: EventSender) -> Self {
        Self {
            accessory: accessory.into(),
            binding,
            value: Mutex::new(None),
            events,
        }
    }

    pub fn id(&self) -> CharacteristicId {
        self.binding.id
    }

    pub fn binding(&self) -> CharacteristicBinding {
        self.binding
    }

    pub fn accessory(&self) -> &str {
        &self.accessory
    }

    /// The value currently on display, if any was ever set.
    pub fn value(&self) -> Option<CharacteristicValue> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the displayed value. Returns whether it changed.
    pub fn update_value(&self, value: CharacteristicValue) -> bool {
        let previous = self
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(value);
        if previous == Some(value) {
            return false;
        }

        trace!(accessory = %self.accessory, characteristic = %self.binding.id, %value, "Displayed value changed");
        // No subscribers is fine.
        let _ = self
            .events
            .send(CharacteristicEvent::new(&self.accessory, self.binding.id, value));
        true
    }
}
