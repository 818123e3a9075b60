//! Core trigger engine type definitions
//!
//! Event kinds, classified messages, slot identifiers and the per-kind value
//! range table used to derive hysteresis thresholds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Distance between the range edges and the activate/deactivate thresholds
pub const HYSTERESIS_DELTA: u8 = 20;

/// Minimum time between two page turns, whichever slot fires
pub const ACTUATION_COOLDOWN: Duration = Duration::from_millis(750);

/// Value range transmitted for note on/off (velocity)
pub const NOTE_RANGE: ValueRange = ValueRange { min: 0, max: 100 };

/// Value range transmitted for control change
pub const CC_RANGE: ValueRange = ValueRange { min: 0, max: 127 };

// The dead zone must stay non-empty for every bindable kind
const _: () = assert!(HYSTERESIS_DELTA as u16 * 2 < (NOTE_RANGE.max - NOTE_RANGE.min) as u16);
const _: () = assert!(HYSTERESIS_DELTA as u16 * 2 < (CC_RANGE.max - CC_RANGE.min) as u16);

/// Kind of MIDI event a trigger can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Unbound / unclassifiable
    #[default]
    None,
    /// Note On and Note Off, keyed by note number
    NoteOnOff,
    /// Control Change, keyed by controller number
    ControlChange,
}

impl EventKind {
    /// Value range for this kind, `None` for the unbound kind
    pub fn range(self) -> Option<ValueRange> {
        match self {
            EventKind::None => None,
            EventKind::NoteOnOff => Some(NOTE_RANGE),
            EventKind::ControlChange => Some(CC_RANGE),
        }
    }

    /// Human-readable kind name
    pub fn describe(self) -> &'static str {
        match self {
            EventKind::None => "None",
            EventKind::NoteOnOff => "Note On/Off",
            EventKind::ControlChange => "Control Change",
        }
    }

    /// Name of the identity field for this kind ("Note", "Channel")
    pub fn identity_name(self) -> &'static str {
        match self {
            EventKind::None => "",
            EventKind::NoteOnOff => "Note",
            EventKind::ControlChange => "Channel",
        }
    }

    pub fn is_bound(self) -> bool {
        self != EventKind::None
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Inclusive range of values a kind can transmit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRange {
    pub min: u8,
    pub max: u8,
}

impl ValueRange {
    /// Threshold above which a binding becomes active
    pub fn activate_threshold(self) -> u8 {
        self.max - HYSTERESIS_DELTA
    }

    /// Threshold below which a binding becomes inactive
    pub fn deactivate_threshold(self) -> u8 {
        self.min + HYSTERESIS_DELTA
    }
}

/// A raw MIDI event normalized into `(kind, channel, value)`
///
/// `channel` holds the note number for [`EventKind::NoteOnOff`] and the
/// controller number for [`EventKind::ControlChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassifiedMessage {
    pub kind: EventKind,
    pub channel: u8,
    pub value: u8,
}

impl ClassifiedMessage {
    pub const NONE: Self = Self {
        kind: EventKind::None,
        channel: 0,
        value: 0,
    };

    pub fn control_change(controller: u8, value: u8) -> Self {
        Self {
            kind: EventKind::ControlChange,
            channel: controller,
            value,
        }
    }

    pub fn note(note: u8, velocity: u8) -> Self {
        Self {
            kind: EventKind::NoteOnOff,
            channel: note,
            value: velocity,
        }
    }

    /// The `(kind, channel)` pair a binding is matched against
    pub fn identity(&self) -> (EventKind, u8) {
        (self.kind, self.channel)
    }
}

/// One of the two trigger slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotId {
    Primary,
    Secondary,
}

impl SlotId {
    /// Slots in evaluation order
    pub const ALL: [SlotId; 2] = [SlotId::Primary, SlotId::Secondary];

    pub fn index(self) -> usize {
        match self {
            SlotId::Primary => 0,
            SlotId::Secondary => 1,
        }
    }

    pub fn other(self) -> SlotId {
        match self {
            SlotId::Primary => SlotId::Secondary,
            SlotId::Secondary => SlotId::Primary,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SlotId::Primary => "primary",
            SlotId::Secondary => "secondary",
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SlotId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "primary" | "1" | "p" | "next" => Ok(SlotId::Primary),
            "secondary" | "2" | "s" | "prev" => Ok(SlotId::Secondary),
            other => Err(format!("unknown slot '{}' (expected primary or secondary)", other)),
        }
    }
}
