//! Tests for the trigger engine

use super::*;
use proptest::prelude::*;
use std::time::{Duration, Instant};

fn cc(channel: u8, value: u8) -> ClassifiedMessage {
    ClassifiedMessage::control_change(channel, value)
}

fn note(channel: u8, value: u8) -> ClassifiedMessage {
    ClassifiedMessage::note(channel, value)
}

/// Engine whose cooldown has already elapsed at `t0 + 1s`
fn make_engine(primary: Option<(EventKind, u8)>, secondary: Option<(EventKind, u8)>) -> (TriggerEngine, Instant) {
    let t0 = Instant::now();
    let bind = |slot, identity: Option<(EventKind, u8)>| match identity {
        Some((kind, channel)) => TriggerBinding::bound(slot, kind, channel, KeyPreset::Horizontal),
        None => TriggerBinding::unbound(slot, KeyPreset::Horizontal),
    };
    let engine = TriggerEngine::new(
        [bind(SlotId::Primary, primary), bind(SlotId::Secondary, secondary)],
        t0,
    );
    (engine, t0 + Duration::from_secs(1))
}

fn fired_slot(dispatch: &Dispatch) -> Option<SlotId> {
    match dispatch {
        Dispatch::Evaluated {
            actuation: Actuation::Fired { slot, .. },
            ..
        } => Some(*slot),
        _ => None,
    }
}

#[test]
fn test_value_sequence_example() {
    let (mut engine, start) = make_engine(Some((EventKind::ControlChange, 1)), None);

    let binding = engine.binding(SlotId::Primary);
    assert_eq!(binding.activate_threshold(), 107);
    assert_eq!(binding.deactivate_threshold(), 20);

    let mut active = Vec::new();
    let mut fires = Vec::new();
    for (i, value) in [0u8, 50, 110, 108, 15].into_iter().enumerate() {
        let now = start + Duration::from_millis(10 * i as u64);
        let dispatch = engine.handle(cc(1, value), now);
        active.push(engine.binding(SlotId::Primary).is_active());
        if fired_slot(&dispatch).is_some() {
            fires.push(value);
        }
    }

    assert_eq!(active, vec![false, false, true, true, false]);
    assert_eq!(fires, vec![110]);
}

#[test]
fn test_none_kind_is_dropped() {
    let (mut engine, now) = make_engine(Some((EventKind::ControlChange, 0)), None);
    engine.begin_learn(SlotId::Secondary);
    let before = engine.clone();

    let dispatch = engine.handle(ClassifiedMessage::NONE, now);

    assert_eq!(dispatch, Dispatch::Dropped);
    assert_eq!(engine.bindings(), before.bindings());
    assert_eq!(engine.learning(), Some(SlotId::Secondary));
    assert_eq!(engine.last_actuation(), before.last_actuation());
}

#[test]
fn test_unmatched_message_changes_nothing() {
    let (mut engine, now) = make_engine(Some((EventKind::ControlChange, 1)), None);
    let dispatch = engine.handle(cc(2, 127), now);

    assert_eq!(
        dispatch,
        Dispatch::Evaluated {
            updates: [None, None],
            actuation: Actuation::Idle,
        }
    );
    assert!(!engine.binding(SlotId::Primary).is_active());
}

#[test]
fn test_already_active_slot_does_not_refire() {
    let (mut engine, now) = make_engine(Some((EventKind::ControlChange, 1)), None);

    assert_eq!(fired_slot(&engine.handle(cc(1, 127), now)), Some(SlotId::Primary));

    // Well past the cooldown, but still held down
    let later = now + Duration::from_secs(5);
    assert_eq!(fired_slot(&engine.handle(cc(1, 127), later)), None);
    assert_eq!(fired_slot(&engine.handle(cc(1, 60), later)), None);
    assert!(engine.binding(SlotId::Primary).is_active());
}

#[test]
fn test_cooldown_suppresses_second_fire() {
    let (mut engine, now) = make_engine(Some((EventKind::ControlChange, 1)), None);

    let first = engine.handle(cc(1, 127), now);
    engine.handle(cc(1, 0), now + Duration::from_millis(100));
    let second = engine.handle(cc(1, 127), now + Duration::from_millis(749));

    assert_eq!(fired_slot(&first), Some(SlotId::Primary));
    assert!(second.plan().is_none());
    match second {
        Dispatch::Evaluated {
            actuation: Actuation::Suppressed { slot, remaining },
            ..
        } => {
            assert_eq!(slot, SlotId::Primary);
            assert_eq!(remaining, Duration::from_millis(1));
        }
        other => panic!("expected suppression, got {:?}", other),
    }
    assert_eq!(engine.last_actuation(), now);
}

#[test]
fn test_cooldown_boundary_allows_second_fire() {
    let (mut engine, now) = make_engine(Some((EventKind::ControlChange, 1)), None);

    engine.handle(cc(1, 127), now);
    engine.handle(cc(1, 0), now + Duration::from_millis(100));
    let second = engine.handle(cc(1, 127), now + ACTUATION_COOLDOWN);

    assert_eq!(fired_slot(&second), Some(SlotId::Primary));
    assert_eq!(engine.last_actuation(), now + ACTUATION_COOLDOWN);
}

#[test]
fn test_suppression_does_not_reset_timer() {
    let (mut engine, now) = make_engine(
        Some((EventKind::ControlChange, 1)),
        Some((EventKind::ControlChange, 2)),
    );

    engine.handle(cc(1, 127), now);
    // Suppressed at +500ms
    engine.handle(cc(2, 127), now + Duration::from_millis(500));
    engine.handle(cc(2, 0), now + Duration::from_millis(600));
    // Would still be inside a window restarted at +500ms
    let third = engine.handle(cc(2, 127), now + Duration::from_millis(800));

    assert_eq!(fired_slot(&third), Some(SlotId::Secondary));
}

#[test]
fn test_cooldown_is_shared_between_slots() {
    let (mut engine, now) = make_engine(
        Some((EventKind::ControlChange, 1)),
        Some((EventKind::NoteOnOff, 60)),
    );

    assert_eq!(fired_slot(&engine.handle(cc(1, 127), now)), Some(SlotId::Primary));
    let second = engine.handle(note(60, 100), now + Duration::from_millis(200));
    assert!(second.plan().is_none());
    // Secondary latched active even though the turn was suppressed
    assert!(engine.binding(SlotId::Secondary).is_active());
}

#[test]
fn test_startup_counts_as_last_actuation() {
    let t0 = Instant::now();
    let mut engine = TriggerEngine::new(
        [
            TriggerBinding::bound(SlotId::Primary, EventKind::ControlChange, 1, KeyPreset::Page),
            TriggerBinding::unbound(SlotId::Secondary, KeyPreset::Page),
        ],
        t0,
    );

    let dispatch = engine.handle(cc(1, 127), t0 + Duration::from_millis(10));
    assert!(matches!(
        dispatch,
        Dispatch::Evaluated {
            actuation: Actuation::Suppressed { .. },
            ..
        }
    ));
}

#[test]
fn test_plan_uses_firing_slot_combo() {
    let t0 = Instant::now();
    let mut engine = TriggerEngine::new(
        [
            TriggerBinding::bound(SlotId::Primary, EventKind::ControlChange, 1, KeyPreset::Page),
            TriggerBinding::bound(SlotId::Secondary, EventKind::ControlChange, 2, KeyPreset::Space),
        ],
        t0,
    );
    let now = t0 + Duration::from_secs(1);

    let dispatch = engine.handle(cc(2, 127), now);
    assert_eq!(
        dispatch.plan().map(|p| p.events().to_vec()),
        Some(vec![
            KeyEvent::Press(Key::Shift),
            KeyEvent::Press(Key::Space),
            KeyEvent::Release(Key::Space),
            KeyEvent::Release(Key::Shift),
        ])
    );

    let dispatch = engine.handle(cc(1, 127), now + Duration::from_secs(1));
    assert_eq!(
        dispatch.plan().map(|p| p.events().to_vec()),
        Some(vec![KeyEvent::Press(Key::PageDown), KeyEvent::Release(Key::PageDown)])
    );
}

#[test]
fn test_tie_break_prefers_secondary() {
    let (mut engine, now) = make_engine(Some((EventKind::ControlChange, 5)), None);
    engine.force_binding(TriggerBinding::bound(
        SlotId::Secondary,
        EventKind::ControlChange,
        5,
        KeyPreset::Horizontal,
    ));

    let dispatch = engine.handle(cc(5, 127), now);

    match &dispatch {
        Dispatch::Evaluated { updates, actuation } => {
            assert!(updates.iter().all(|u| matches!(u, Some(update) if update.active)));
            assert_eq!(
                actuation,
                &Actuation::Fired {
                    slot: SlotId::Secondary,
                    plan: InjectionPlan::for_combo(&[Key::Left]),
                }
            );
        }
        other => panic!("expected evaluation, got {:?}", other),
    }
}

#[test]
fn test_learn_accepts_next_message() {
    let (mut engine, now) = make_engine(None, None);

    let start = engine.begin_learn(SlotId::Primary);
    assert_eq!(start, LearnStart { slot: SlotId::Primary, cancelled: None });
    assert_eq!(engine.binding(SlotId::Primary).display_label(), CAPTURING_LABEL);

    let dispatch = engine.handle(note(64, 90), now);
    assert_eq!(dispatch, Dispatch::Learned { slot: SlotId::Primary, value: 90 });
    assert!(dispatch.bindings_changed());
    assert_eq!(engine.learning(), None);

    let binding = engine.binding(SlotId::Primary);
    assert_eq!(binding.identity(), (EventKind::NoteOnOff, 64));
    assert_eq!(binding.activate_threshold(), 80);
    assert_eq!(binding.deactivate_threshold(), 20);
    assert_eq!(binding.display_label(), "Note On/Off, Note: 64");
    // The learning message is not evaluated
    assert!(!binding.is_active());
}

#[test]
fn test_learn_rebinds_existing_slot() {
    let (mut engine, now) = make_engine(Some((EventKind::ControlChange, 1)), None);
    engine.handle(cc(1, 127), now);
    assert!(engine.binding(SlotId::Primary).is_active());

    engine.begin_learn(SlotId::Primary);
    assert!(!engine.binding(SlotId::Primary).is_bound());

    engine.handle(cc(1, 127), now);
    let binding = engine.binding(SlotId::Primary);
    assert_eq!(binding.identity(), (EventKind::ControlChange, 1));
    assert!(!binding.is_active());
}

#[test]
fn test_learn_mutual_exclusion() {
    let (mut engine, now) = make_engine(None, None);

    engine.begin_learn(SlotId::Secondary);
    engine.handle(cc(7, 127), now);
    assert_eq!(engine.binding(SlotId::Secondary).identity(), (EventKind::ControlChange, 7));

    engine.begin_learn(SlotId::Primary);
    let ignored = engine.handle(cc(7, 127), now + Duration::from_millis(10));
    assert!(!matches!(ignored, Dispatch::Learned { .. }));
    assert_eq!(engine.learning(), Some(SlotId::Primary));
    assert!(!engine.binding(SlotId::Primary).is_bound());

    let accepted = engine.handle(cc(8, 127), now + Duration::from_millis(20));
    assert_eq!(accepted, Dispatch::Learned { slot: SlotId::Primary, value: 127 });
    assert_eq!(engine.binding(SlotId::Primary).identity(), (EventKind::ControlChange, 8));
    assert_eq!(engine.binding(SlotId::Secondary).identity(), (EventKind::ControlChange, 7));
}

#[test]
fn test_same_controller_different_kind_is_distinct() {
    let (mut engine, now) = make_engine(None, Some((EventKind::ControlChange, 7)));

    engine.begin_learn(SlotId::Primary);
    let dispatch = engine.handle(note(7, 50), now);

    assert_eq!(dispatch, Dispatch::Learned { slot: SlotId::Primary, value: 50 });
    assert_eq!(engine.binding(SlotId::Primary).identity(), (EventKind::NoteOnOff, 7));
}

#[test]
fn test_conflicting_learn_message_is_still_evaluated() {
    let (mut engine, now) = make_engine(None, Some((EventKind::ControlChange, 7)));

    engine.begin_learn(SlotId::Primary);
    let dispatch = engine.handle(cc(7, 127), now);

    assert_eq!(fired_slot(&dispatch), Some(SlotId::Secondary));
    assert_eq!(engine.learning(), Some(SlotId::Primary));
}

#[test]
fn test_learn_conflict_unbinds_pending_slot() {
    let (mut engine, _now) = make_engine(
        Some((EventKind::ControlChange, 1)),
        Some((EventKind::ControlChange, 2)),
    );

    engine.begin_learn(SlotId::Primary);
    let start = engine.begin_learn(SlotId::Secondary);
    assert_eq!(start.cancelled, Some(SlotId::Primary));
    assert_eq!(engine.learning(), Some(SlotId::Secondary));

    let start = engine.begin_learn(SlotId::Primary);
    assert_eq!(start, LearnStart { slot: SlotId::Primary, cancelled: Some(SlotId::Secondary) });
    assert_eq!(engine.learning(), Some(SlotId::Primary));

    let secondary = engine.binding(SlotId::Secondary);
    assert!(!secondary.is_bound());
    assert_eq!(secondary.activate_threshold(), 0);
    assert_eq!(secondary.deactivate_threshold(), 0);
    assert_eq!(secondary.display_label(), UNBOUND_LABEL);
}

#[test]
fn test_begin_learn_keeps_settled_other_slot() {
    let (mut engine, _now) = make_engine(None, Some((EventKind::ControlChange, 2)));

    let start = engine.begin_learn(SlotId::Primary);

    assert_eq!(start.cancelled, None);
    assert_eq!(engine.binding(SlotId::Secondary).identity(), (EventKind::ControlChange, 2));
}

#[test]
fn test_cancel_learn() {
    let (mut engine, now) = make_engine(None, None);
    assert_eq!(engine.cancel_learn(), None);

    engine.begin_learn(SlotId::Secondary);
    assert_eq!(engine.cancel_learn(), Some(SlotId::Secondary));
    assert_eq!(engine.learning(), None);
    assert_eq!(engine.binding(SlotId::Secondary).display_label(), UNBOUND_LABEL);

    // Nothing is captured afterwards
    let dispatch = engine.handle(cc(3, 100), now);
    assert!(matches!(dispatch, Dispatch::Evaluated { .. }));
    assert!(!engine.binding(SlotId::Secondary).is_bound());
}

#[test]
fn test_select_keys() {
    let (mut engine, now) = make_engine(Some((EventKind::ControlChange, 1)), None);

    assert!(engine.select_keys(SlotId::Primary, KeyPreset::Page));
    assert!(!engine.select_keys(SlotId::Primary, KeyPreset::Page));

    let dispatch = engine.handle(cc(1, 127), now);
    assert_eq!(dispatch.plan(), Some(&InjectionPlan::for_combo(&[Key::PageDown])));
}

#[test]
fn test_learn_keeps_key_preset() {
    let (mut engine, now) = make_engine(None, None);
    engine.select_keys(SlotId::Secondary, KeyPreset::Vertical);

    engine.begin_learn(SlotId::Secondary);
    engine.handle(cc(11, 64), now);

    assert_eq!(engine.binding(SlotId::Secondary).key_combo(), &[Key::Up]);
}

proptest! {
    #[test]
    fn prop_dead_zone_holds_active(values in proptest::collection::vec(21u8..=107, 0..50)) {
        let (mut engine, now) = make_engine(Some((EventKind::ControlChange, 1)), None);
        engine.handle(cc(1, 127), now);

        for value in values {
            let dispatch = engine.handle(cc(1, value), now);
            prop_assert!(dispatch.plan().is_none());
            prop_assert!(engine.binding(SlotId::Primary).is_active());
        }

        engine.handle(cc(1, 19), now);
        prop_assert!(!engine.binding(SlotId::Primary).is_active());
    }

    #[test]
    fn prop_at_most_one_fire_per_cooldown(
        steps in proptest::collection::vec((0u64..400, any::<u8>(), any::<bool>()), 1..80)
    ) {
        let (mut engine, start) = make_engine(
            Some((EventKind::ControlChange, 1)),
            Some((EventKind::ControlChange, 2)),
        );
        let mut now = start;
        let mut fires: Vec<Instant> = Vec::new();

        for (delta_ms, value, primary) in steps {
            now += Duration::from_millis(delta_ms);
            let channel = if primary { 1 } else { 2 };
            if engine.handle(cc(channel, value), now).plan().is_some() {
                fires.push(now);
            }
        }

        for pair in fires.windows(2) {
            prop_assert!(pair[1].duration_since(pair[0]) >= ACTUATION_COOLDOWN);
        }
    }

    #[test]
    fn prop_learning_never_duplicates_identity(
        messages in proptest::collection::vec((any::<bool>(), 0u8..4, any::<u8>(), any::<bool>()), 1..60)
    ) {
        let (mut engine, now) = make_engine(None, None);

        for (note_kind, channel, value, learn_primary) in messages {
            let msg = if note_kind { note(channel, value) } else { cc(channel, value) };
            if engine.learning().is_none() {
                let slot = if learn_primary { SlotId::Primary } else { SlotId::Secondary };
                engine.begin_learn(slot);
            }
            engine.handle(msg, now);

            let [primary, secondary] = engine.bindings();
            if primary.is_bound() && secondary.is_bound() {
                prop_assert_ne!(primary.identity(), secondary.identity());
            }
        }
    }
}
