//! Trigger bindings
//!
//! A binding pairs a MIDI identity with its hysteresis thresholds, the
//! current debounced state and the key combination it turns pages with.

use super::keys::{combo_label, Key, KeyPreset};
use super::types::{ClassifiedMessage, EventKind, SlotId};

/// Label shown for a slot that has no input bound
pub const UNBOUND_LABEL: &str = "No Input Selected.";

/// Label shown while a slot waits for its next distinguishing message
pub const CAPTURING_LABEL: &str = "Capturing...";

/// Result of feeding one value through a binding's hysteresis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Crossed the activate threshold while inactive
    Activated,
    /// Above the activate threshold while already active
    StillActive,
    /// Dropped below the deactivate threshold
    Deactivated,
    /// Inside the dead zone
    Unchanged,
}

/// One configured trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerBinding {
    slot: SlotId,
    kind: EventKind,
    channel: u8,
    activate_threshold: u8,
    deactivate_threshold: u8,
    active: bool,
    preset: KeyPreset,
    display_label: String,
}

impl TriggerBinding {
    /// An unbound trigger for `slot`
    pub fn unbound(slot: SlotId, preset: KeyPreset) -> Self {
        Self {
            slot,
            kind: EventKind::None,
            channel: 0,
            activate_threshold: 0,
            deactivate_threshold: 0,
            active: false,
            preset,
            display_label: UNBOUND_LABEL.to_string(),
        }
    }

    /// A trigger bound to `(kind, channel)` with thresholds from the range table
    ///
    /// Binding [`EventKind::None`] yields an unbound trigger.
    pub fn bound(slot: SlotId, kind: EventKind, channel: u8, preset: KeyPreset) -> Self {
        let Some(range) = kind.range() else {
            return Self::unbound(slot, preset);
        };

        Self {
            slot,
            kind,
            channel,
            activate_threshold: range.activate_threshold(),
            deactivate_threshold: range.deactivate_threshold(),
            active: false,
            preset,
            display_label: describe_identity(kind, channel),
        }
    }

    /// Rebuild a binding with explicit thresholds, returning `None` when they
    /// break `min <= deactivate < activate <= max`
    pub fn with_thresholds(
        slot: SlotId,
        kind: EventKind,
        channel: u8,
        activate_threshold: u8,
        deactivate_threshold: u8,
        preset: KeyPreset,
    ) -> Option<Self> {
        match kind.range() {
            None => (activate_threshold == 0 && deactivate_threshold == 0)
                .then(|| Self::unbound(slot, preset)),
            Some(range) => {
                let valid = channel <= 0x7F
                    && range.min <= deactivate_threshold
                    && deactivate_threshold < activate_threshold
                    && activate_threshold <= range.max;
                valid.then(|| Self {
                    slot,
                    kind,
                    channel,
                    activate_threshold,
                    deactivate_threshold,
                    active: false,
                    preset,
                    display_label: describe_identity(kind, channel),
                })
            }
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn activate_threshold(&self) -> u8 {
        self.activate_threshold
    }

    pub fn deactivate_threshold(&self) -> u8 {
        self.deactivate_threshold
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_bound(&self) -> bool {
        self.kind.is_bound()
    }

    pub fn preset(&self) -> KeyPreset {
        self.preset
    }

    pub fn key_combo(&self) -> &'static [Key] {
        self.preset.combo(self.slot)
    }

    pub fn display_label(&self) -> &str {
        &self.display_label
    }

    /// `(kind, channel)` identity used for matching and mutual exclusion
    pub fn identity(&self) -> (EventKind, u8) {
        (self.kind, self.channel)
    }

    /// Whether `msg` addresses this binding; unbound triggers match nothing
    pub fn matches(&self, msg: &ClassifiedMessage) -> bool {
        self.is_bound() && msg.identity() == self.identity()
    }

    pub fn set_preset(&mut self, preset: KeyPreset) {
        self.preset = preset;
    }

    /// Drop the identity, keeping the key preset
    pub fn unbind(&mut self, label: &str) {
        *self = Self::unbound(self.slot, self.preset);
        self.display_label = label.to_string();
    }

    /// Apply hysteresis to a value addressed to this binding
    pub fn apply(&mut self, value: u8) -> Transition {
        if value > self.activate_threshold {
            let was_active = std::mem::replace(&mut self.active, true);
            if was_active {
                Transition::StillActive
            } else {
                Transition::Activated
            }
        } else if value < self.deactivate_threshold {
            self.active = false;
            Transition::Deactivated
        } else {
            Transition::Unchanged
        }
    }
}

/// "Control Change, Channel: 7" / "Note On/Off, Note: 60"
pub fn describe_identity(kind: EventKind, channel: u8) -> String {
    if kind.is_bound() {
        format!("{}, {}: {}", kind.describe(), kind.identity_name(), channel)
    } else {
        UNBOUND_LABEL.to_string()
    }
}
