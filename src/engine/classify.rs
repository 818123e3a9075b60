//! Message classification
//!
//! Normalizes raw MIDI into the `(kind, channel, value)` triple the trigger
//! engine works with. The MIDI channel nibble plays no part in matching.

use thiserror::Error;

use super::types::ClassifiedMessage;
use crate::midi::{format_hex, MidiMessage};

/// Raw input that cannot be classified
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("malformed MIDI message: [{0}]")]
    Malformed(String),
}

/// Classify a parsed message
///
/// Control change wins over note on, which wins over note off. Anything else
/// yields [`ClassifiedMessage::NONE`], which callers must drop.
pub fn classify(message: &MidiMessage) -> ClassifiedMessage {
    match *message {
        MidiMessage::ControlChange { cc, value, .. } => ClassifiedMessage::control_change(cc, value),
        MidiMessage::NoteOn { note, velocity, .. } => ClassifiedMessage::note(note, velocity),
        MidiMessage::NoteOff { note, .. } => ClassifiedMessage::note(note, 0),
        _ => ClassifiedMessage::NONE,
    }
}

/// Parse and classify raw bytes
///
/// Bytes that do not form a MIDI message are reported as
/// [`ClassifyError::Malformed`]; well-formed but irrelevant messages classify
/// as [`ClassifiedMessage::NONE`].
pub fn classify_raw(data: &[u8]) -> Result<ClassifiedMessage, ClassifyError> {
    MidiMessage::parse(data)
        .map(|message| classify(&message))
        .ok_or_else(|| ClassifyError::Malformed(format_hex(data)))
}
