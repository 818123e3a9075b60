//! Engine observations
//!
//! State-change notifications for presentation layers (console, logs).
//! Observations are derived from engine results and carry no authority.

use std::fmt;
use std::time::Duration;

use super::binding::TriggerBinding;
use super::keys::{combo_label, Key, KeyPreset};
use super::trigger::{Actuation, Dispatch, LearnStart};
use super::types::SlotId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// A slot started capturing; `cancelled` lost its pending learn
    LearnStarted {
        slot: SlotId,
        cancelled: Option<SlotId>,
    },
    LearnCancelled {
        slot: SlotId,
    },
    /// A slot accepted a new binding; `value` is the captured message's value
    Learned {
        slot: SlotId,
        label: String,
        value: u8,
    },
    /// A bound slot received a value
    SlotValue {
        slot: SlotId,
        value: u8,
        active: bool,
    },
    Fired {
        slot: SlotId,
        combo: &'static [Key],
    },
    Suppressed {
        slot: SlotId,
        remaining: Duration,
    },
    KeysSelected {
        slot: SlotId,
        preset: KeyPreset,
    },
    /// Persisted settings were unusable and both slots were unbound
    SettingsReset {
        reason: String,
    },
}

impl Observation {
    pub fn from_learn_start(start: LearnStart) -> Self {
        Observation::LearnStarted {
            slot: start.slot,
            cancelled: start.cancelled,
        }
    }

    /// Observations for one dispatch, in emission order
    pub fn from_dispatch(dispatch: &Dispatch, bindings: &[TriggerBinding; 2]) -> Vec<Self> {
        match dispatch {
            Dispatch::Dropped => Vec::new(),
            Dispatch::Learned { slot, value } => vec![Observation::Learned {
                slot: *slot,
                label: bindings[slot.index()].display_label().to_string(),
                value: *value,
            }],
            Dispatch::Evaluated { updates, actuation } => {
                let mut out: Vec<Self> = updates
                    .iter()
                    .flatten()
                    .map(|update| Observation::SlotValue {
                        slot: update.slot,
                        value: update.value,
                        active: update.active,
                    })
                    .collect();

                match actuation {
                    Actuation::Idle => {}
                    Actuation::Suppressed { slot, remaining } => out.push(Observation::Suppressed {
                        slot: *slot,
                        remaining: *remaining,
                    }),
                    Actuation::Fired { slot, .. } => out.push(Observation::Fired {
                        slot: *slot,
                        combo: bindings[slot.index()].key_combo(),
                    }),
                }
                out
            }
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observation::LearnStarted { slot, cancelled: Some(other) } => {
                write!(f, "{} capturing (cancelled {} learn)", slot, other)
            }
            Observation::LearnStarted { slot, cancelled: None } => write!(f, "{} capturing", slot),
            Observation::LearnCancelled { slot } => write!(f, "{} learn cancelled", slot),
            Observation::Learned { slot, label, value } => {
                write!(f, "{} set to {} (value {})", slot, label, value)
            }
            Observation::SlotValue { slot, value, active } => {
                write!(f, "{} value {} ({})", slot, value, if *active { "on" } else { "off" })
            }
            Observation::Fired { slot, combo } => {
                write!(f, "{} page turn: {}", slot, combo_label(combo))
            }
            Observation::Suppressed { slot, remaining } => {
                write!(f, "{} page turn suppressed ({}ms cooldown left)", slot, remaining.as_millis())
            }
            Observation::KeysSelected { slot, preset } => {
                write!(f, "{} keys: {} ({})", slot, preset, combo_label(preset.combo(*slot)))
            }
            Observation::SettingsReset { reason } => {
                write!(f, "saved settings invalid, resetting: {}", reason)
            }
        }
    }
}
