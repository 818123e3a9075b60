//! MIDI Page Turner
//!
//! Turns MIDI foot-pedal or controller input into page-turn keystrokes. Two
//! trigger slots are bound by learning a MIDI message, debounced with
//! hysteresis and rate-limited by a shared cooldown.

pub mod cli;
pub mod config;
pub mod engine;
pub mod inject;
pub mod input;
pub mod midi;
pub mod paths;
pub mod settings;
