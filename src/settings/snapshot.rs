//! Binding snapshots for persistence
//!
//! A snapshot is the serialized form of both trigger bindings. The debounced
//! `active` state is never persisted; restored bindings start inactive.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::SettingsError;
use crate::engine::{EventKind, KeyPreset, SlotId, TriggerBinding};

/// Persisted configuration of one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSettings {
    pub kind: EventKind,
    pub channel: u8,
    pub activate_threshold: u8,
    pub deactivate_threshold: u8,
    #[serde(default)]
    pub keys: KeyPreset,
    #[serde(default)]
    pub label: String,
}

impl SlotSettings {
    fn from_binding(binding: &TriggerBinding) -> Self {
        Self {
            kind: binding.kind(),
            channel: binding.channel(),
            activate_threshold: binding.activate_threshold(),
            deactivate_threshold: binding.deactivate_threshold(),
            keys: binding.preset(),
            label: binding.display_label().to_string(),
        }
    }

    fn to_binding(&self, slot: SlotId) -> Result<TriggerBinding, SettingsError> {
        TriggerBinding::with_thresholds(
            slot,
            self.kind,
            self.channel,
            self.activate_threshold,
            self.deactivate_threshold,
            self.keys,
        )
        .ok_or_else(|| {
            SettingsError::Invalid(format!(
                "{} binding {:?}/{} has thresholds {}/{} outside its range",
                slot, self.kind, self.channel, self.activate_threshold, self.deactivate_threshold
            ))
        })
    }
}

/// Both slot configurations plus format metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSnapshot {
    /// Timestamp of snapshot creation (milliseconds since epoch)
    pub timestamp: u64,
    /// Version of the snapshot format
    pub version: String,
    pub primary: SlotSettings,
    pub secondary: SlotSettings,
}

impl BindingSnapshot {
    /// Current snapshot format version
    pub const VERSION: &'static str = "1.0.0";

    pub fn from_bindings(bindings: &[TriggerBinding; 2]) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            timestamp,
            version: Self::VERSION.to_string(),
            primary: SlotSettings::from_binding(&bindings[SlotId::Primary.index()]),
            secondary: SlotSettings::from_binding(&bindings[SlotId::Secondary.index()]),
        }
    }

    /// Rebuild both bindings, rejecting anything the engine could not have
    /// produced
    pub fn to_bindings(&self) -> Result<[TriggerBinding; 2], SettingsError> {
        if self.version != Self::VERSION {
            return Err(SettingsError::Invalid(format!(
                "unsupported snapshot version {}",
                self.version
            )));
        }

        let primary = self.primary.to_binding(SlotId::Primary)?;
        let secondary = self.secondary.to_binding(SlotId::Secondary)?;

        if primary.is_bound() && primary.identity() == secondary.identity() {
            return Err(SettingsError::Invalid(format!(
                "both slots bound to {}",
                primary.display_label()
            )));
        }

        Ok([primary, secondary])
    }
}
