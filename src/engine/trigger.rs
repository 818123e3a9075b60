//! TriggerEngine - learn mode, hysteresis and actuation
//!
//! The engine is a plain synchronous state machine. Every incoming message is
//! either consumed by learn mode or evaluated against both slots, and at most
//! one page turn is produced per message. Time is passed in by the caller so
//! the cooldown is a pure monotonic comparison.

use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::binding::{Transition, TriggerBinding, CAPTURING_LABEL, UNBOUND_LABEL};
use super::keys::{InjectionPlan, KeyPreset};
use super::types::{ClassifiedMessage, SlotId, ACTUATION_COOLDOWN};

/// Value update for one slot addressed by a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotUpdate {
    pub slot: SlotId,
    pub value: u8,
    pub active: bool,
    pub transition: Transition,
}

/// Page-turn decision for one evaluated message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actuation {
    /// No slot fired
    Idle,
    /// A slot fired inside the cooldown window
    Suppressed { slot: SlotId, remaining: Duration },
    /// A slot fired; the plan goes to the key injector
    Fired { slot: SlotId, plan: InjectionPlan },
}

/// What the engine did with one classified message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Unclassifiable message, no state touched
    Dropped,
    /// Consumed by learn mode as the new binding of `slot`
    Learned { slot: SlotId, value: u8 },
    /// Evaluated against both slots
    Evaluated {
        updates: [Option<SlotUpdate>; 2],
        actuation: Actuation,
    },
}

impl Dispatch {
    /// Injection plan produced by this dispatch, if any
    pub fn plan(&self) -> Option<&InjectionPlan> {
        match self {
            Dispatch::Evaluated {
                actuation: Actuation::Fired { plan, .. },
                ..
            } => Some(plan),
            _ => None,
        }
    }

    /// Whether the persisted bindings changed
    pub fn bindings_changed(&self) -> bool {
        matches!(self, Dispatch::Learned { .. })
    }
}

/// Outcome of [`TriggerEngine::begin_learn`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearnStart {
    pub slot: SlotId,
    /// Slot whose pending learn was cancelled and unbound
    pub cancelled: Option<SlotId>,
}

/// Trigger engine state: both bindings, learn mode and cooldown timing
#[derive(Debug, Clone)]
pub struct TriggerEngine {
    slots: [TriggerBinding; 2],
    learning: Option<SlotId>,
    last_actuation: Instant,
    cooldown: Duration,
}

impl TriggerEngine {
    /// Create an engine from restored bindings
    ///
    /// `started_at` seeds the cooldown clock, so nothing fires within one
    /// cooldown of startup.
    pub fn new(bindings: [TriggerBinding; 2], started_at: Instant) -> Self {
        let [first, second] = bindings;
        let slots = if first.slot() == SlotId::Primary {
            [first, second]
        } else {
            [second, first]
        };
        debug_assert_eq!(slots[0].slot(), SlotId::Primary);
        debug_assert_eq!(slots[1].slot(), SlotId::Secondary);

        Self {
            slots,
            learning: None,
            last_actuation: started_at,
            cooldown: ACTUATION_COOLDOWN,
        }
    }

    /// Engine with both slots unbound and the default key preset
    pub fn unbound(started_at: Instant) -> Self {
        Self::new(
            [
                TriggerBinding::unbound(SlotId::Primary, KeyPreset::default()),
                TriggerBinding::unbound(SlotId::Secondary, KeyPreset::default()),
            ],
            started_at,
        )
    }

    pub fn binding(&self, slot: SlotId) -> &TriggerBinding {
        &self.slots[slot.index()]
    }

    pub fn bindings(&self) -> &[TriggerBinding; 2] {
        &self.slots
    }

    pub fn learning(&self) -> Option<SlotId> {
        self.learning
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn last_actuation(&self) -> Instant {
        self.last_actuation
    }

    /// Start capturing a new binding for `slot`
    ///
    /// A learn pending on the other slot is cancelled and that slot is left
    /// unbound. The learning slot itself is unbound until a message is
    /// accepted.
    pub fn begin_learn(&mut self, slot: SlotId) -> LearnStart {
        let other = slot.other();
        let cancelled = (self.learning == Some(other)).then(|| {
            self.slots[other.index()].unbind(UNBOUND_LABEL);
            other
        });

        self.slots[slot.index()].unbind(CAPTURING_LABEL);
        self.learning = Some(slot);

        debug!(%slot, ?cancelled, "Learn started");
        LearnStart { slot, cancelled }
    }

    /// Abort a pending learn, returning the slot that was learning
    pub fn cancel_learn(&mut self) -> Option<SlotId> {
        let slot = self.learning.take()?;
        self.slots[slot.index()].unbind(UNBOUND_LABEL);
        debug!(%slot, "Learn cancelled");
        Some(slot)
    }

    /// Change the key preset of a slot, returning whether it changed
    pub fn select_keys(&mut self, slot: SlotId, preset: KeyPreset) -> bool {
        let binding = &mut self.slots[slot.index()];
        if binding.preset() == preset {
            return false;
        }
        binding.set_preset(preset);
        true
    }

    /// Process one classified message received at `now`
    pub fn handle(&mut self, msg: ClassifiedMessage, now: Instant) -> Dispatch {
        if !msg.kind.is_bound() {
            return Dispatch::Dropped;
        }

        if let Some(slot) = self.learning {
            if self.feed_learn(slot, &msg) {
                return Dispatch::Learned { slot, value: msg.value };
            }
            trace!(%slot, ?msg, "Learn ignored message bound to the other slot");
        }

        self.evaluate(msg, now)
    }

    /// Accept `msg` as the new binding of `slot` unless the other slot owns
    /// the same identity
    fn feed_learn(&mut self, slot: SlotId, msg: &ClassifiedMessage) -> bool {
        let other = &self.slots[slot.other().index()];
        if other.is_bound() && other.identity() == msg.identity() {
            return false;
        }

        let preset = self.slots[slot.index()].preset();
        self.slots[slot.index()] = TriggerBinding::bound(slot, msg.kind, msg.channel, preset);
        self.learning = None;

        debug!(
            %slot,
            label = self.slots[slot.index()].display_label(),
            "Learned new trigger"
        );
        true
    }

    fn evaluate(&mut self, msg: ClassifiedMessage, now: Instant) -> Dispatch {
        let mut updates = [None; 2];
        let mut firing = None;

        for slot in SlotId::ALL {
            let binding = &mut self.slots[slot.index()];
            if !binding.matches(&msg) {
                continue;
            }

            let transition = binding.apply(msg.value);
            if transition == Transition::Activated {
                // Later slots win, so Secondary takes a shared message
                firing = Some(slot);
            }

            updates[slot.index()] = Some(SlotUpdate {
                slot,
                value: msg.value,
                active: binding.is_active(),
                transition,
            });
        }

        let actuation = match firing {
            None => Actuation::Idle,
            Some(slot) => self.actuate(slot, now),
        };

        Dispatch::Evaluated { updates, actuation }
    }

    fn actuate(&mut self, slot: SlotId, now: Instant) -> Actuation {
        let elapsed = now.saturating_duration_since(self.last_actuation);
        if elapsed < self.cooldown {
            return Actuation::Suppressed {
                slot,
                remaining: self.cooldown - elapsed,
            };
        }

        self.last_actuation = now;
        Actuation::Fired {
            slot,
            plan: InjectionPlan::for_combo(self.slots[slot.index()].key_combo()),
        }
    }

    /// Force both slots into the same identity; only for exercising the
    /// tie-break, which correct learn discipline never reaches
    #[cfg(test)]
    pub(crate) fn force_binding(&mut self, binding: TriggerBinding) {
        let slot = binding.slot();
        self.slots[slot.index()] = binding;
    }
}
