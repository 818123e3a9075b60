//! Trigger engine - turns classified MIDI into page turns
//!
//! The engine owns both trigger bindings, the learn state and the cooldown
//! clock. [`TriggerEngine`] is synchronous and deterministic; the
//! [`EngineActor`] wraps it so that messages from the MIDI thread, console
//! commands and config reloads are applied one at a time in arrival order.

mod actor;
mod actor_handle;
mod binding;
mod classify;
mod commands;
mod keys;
mod observation;
mod trigger;
mod types;

pub use actor::{EngineActor, OBSERVATION_CAPACITY};
pub use actor_handle::EngineActorHandle;
pub use binding::{describe_identity, Transition, TriggerBinding, CAPTURING_LABEL, UNBOUND_LABEL};
pub use classify::{classify, classify_raw, ClassifyError};
pub use commands::{EngineCommand, EngineStatus, SlotStatus};
pub use keys::{combo_label, InjectionPlan, Key, KeyEvent, KeyPreset};
pub use observation::Observation;
pub use trigger::{Actuation, Dispatch, LearnStart, SlotUpdate, TriggerEngine};
pub use types::{
    ClassifiedMessage, EventKind, SlotId, ValueRange, ACTUATION_COOLDOWN, CC_RANGE,
    HYSTERESIS_DELTA, NOTE_RANGE,
};

#[cfg(test)]
mod tests;
