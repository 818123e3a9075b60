//! Commands for the engine actor
//!
//! MIDI input is the hot path and never waits for a reply. Console and config
//! commands are applied in the same queue, so they interleave with MIDI in
//! arrival order.

use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use super::binding::TriggerBinding;
use super::keys::{Key, KeyPreset};
use super::types::SlotId;

#[derive(Debug)]
pub enum EngineCommand {
    /// Raw MIDI bytes and their arrival time (fire and forget)
    Midi { data: Vec<u8>, at: Instant },

    /// Put a slot into learn mode
    BeginLearn { slot: SlotId },

    /// Abort any pending learn
    CancelLearn,

    /// Change the key preset of a slot
    SelectKeys { slot: SlotId, preset: KeyPreset },

    /// Snapshot of both slots for display
    Status { response: oneshot::Sender<EngineStatus> },

    Shutdown,
}

/// Display state of one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotStatus {
    pub slot: SlotId,
    pub label: String,
    pub bound: bool,
    pub active: bool,
    pub preset: KeyPreset,
    pub combo: &'static [Key],
}

impl SlotStatus {
    pub fn from_binding(binding: &TriggerBinding) -> Self {
        Self {
            slot: binding.slot(),
            label: binding.display_label().to_string(),
            bound: binding.is_bound(),
            active: binding.is_active(),
            preset: binding.preset(),
            combo: binding.key_combo(),
        }
    }
}

/// Point-in-time view of the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    pub slots: [SlotStatus; 2],
    pub learning: Option<SlotId>,
    /// Time until the next page turn is allowed
    pub cooldown_remaining: Duration,
    pub fire_count: u64,
}

impl EngineStatus {
    pub fn slot(&self, slot: SlotId) -> &SlotStatus {
        &self.slots[slot.index()]
    }
}
