//! MIDI input driver
//!
//! Opens one input port and forwards every received message, with its
//! arrival time, into a tokio channel. Parsing and classification happen in
//! the engine, which drops malformed input.

use anyhow::{anyhow, Context, Result};
use colored::*;
use midir::{MidiInput, MidiInputConnection};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::midi::format_hex;

/// Client name reported to the MIDI backend
const CLIENT_NAME: &str = "MIDI-Page-Turner";

/// Capacity of the event channel
const EVENT_CAPACITY: usize = 1000;

/// Raw MIDI message received from the input port
#[derive(Debug, Clone)]
pub struct MidiEvent {
    pub at: Instant,
    pub data: Vec<u8>,
}

/// Driver for a single MIDI input port
pub struct MidiInputDriver {
    input_conn: Option<MidiInputConnection<()>>,
    event_tx: mpsc::Sender<MidiEvent>,
    event_rx: Option<mpsc::Receiver<MidiEvent>>,
    /// Port name pattern, empty selects the first port
    port_pattern: String,
}

impl MidiInputDriver {
    pub fn new(port_pattern: impl Into<String>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);
        Self {
            input_conn: None,
            event_tx,
            event_rx: Some(event_rx),
            port_pattern: port_pattern.into(),
        }
    }

    /// Connect to the first port matching the pattern, returning its name
    pub fn connect(&mut self) -> Result<String> {
        self.disconnect();

        let midi_in = MidiInput::new(CLIENT_NAME).context("Failed to create MIDI input")?;
        debug!("Found {} MIDI input ports", midi_in.port_count());

        let ports = midi_in.ports();
        let names: Vec<String> = ports
            .iter()
            .map(|port| midi_in.port_name(port).unwrap_or_default())
            .collect();

        let index = find_port(&names, &self.port_pattern).ok_or_else(|| {
            if names.is_empty() {
                anyhow!("No MIDI input ports available")
            } else {
                anyhow!("Input port '{}' not found", self.port_pattern)
            }
        })?;
        let port_name = names[index].clone();

        info!("Connecting to MIDI input port: {}", port_name);

        let event_tx = self.event_tx.clone();
        let input_conn = midi_in
            .connect(
                &ports[index],
                CLIENT_NAME,
                move |_timestamp, data, _| {
                    let at = Instant::now();
                    trace!("MIDI in: [{}]", format_hex(data));

                    // Never block the MIDI callback thread
                    if let Err(e) = event_tx.try_send(MidiEvent { at, data: data.to_vec() }) {
                        warn!("MIDI event dropped: {}", e);
                    }
                },
                (),
            )
            .map_err(|e| anyhow!("Failed to connect to input port '{}': {}", port_name, e))?;

        self.input_conn = Some(input_conn);
        info!("MIDI input connected: {}", port_name);
        Ok(port_name)
    }

    pub fn disconnect(&mut self) {
        if let Some(conn) = self.input_conn.take() {
            conn.close();
            info!("MIDI input disconnected");
        }
    }

    /// Change the port pattern used by the next [`connect`](Self::connect)
    pub fn set_port_pattern(&mut self, pattern: impl Into<String>) {
        self.port_pattern = pattern.into();
    }

    pub fn is_connected(&self) -> bool {
        self.input_conn.is_some()
    }

    /// Take the event receiver (only once)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<MidiEvent>> {
        self.event_rx.take()
    }
}

impl Drop for MidiInputDriver {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Index of the first port whose name contains `pattern`, ignoring case
///
/// An empty pattern selects the first port.
pub fn find_port(names: &[String], pattern: &str) -> Option<usize> {
    let pattern = pattern.trim().to_lowercase();
    if pattern.is_empty() {
        return (!names.is_empty()).then_some(0);
    }
    names
        .iter()
        .position(|name| name.to_lowercase().contains(&pattern))
}

#[derive(Debug, Clone)]
pub struct PortInfo {
    pub index: usize,
    pub name: String,
    pub is_virtual: bool,
}

fn is_virtual_port(name: &str) -> bool {
    name.contains("Virtual") || name.contains("loopMIDI") || name.contains("IAC")
}

/// List available MIDI input ports
pub fn list_input_ports() -> Result<Vec<PortInfo>> {
    let midi_in = MidiInput::new(CLIENT_NAME).context("Failed to create MIDI input")?;

    Ok(midi_in
        .ports()
        .iter()
        .enumerate()
        .filter_map(|(index, port)| {
            midi_in.port_name(port).ok().map(|name| PortInfo {
                index,
                is_virtual: is_virtual_port(&name),
                name,
            })
        })
        .collect())
}

/// Print input ports, marking the one `pattern` would select
pub fn print_ports(pattern: &str) {
    println!("\n{}", "=== MIDI Input Ports ===".bold().cyan());

    let ports = match list_input_ports() {
        Ok(ports) => ports,
        Err(e) => {
            println!("  {}", format!("Failed to list ports: {}", e).red());
            return;
        }
    };

    if ports.is_empty() {
        println!("  {}", "(none)".dimmed());
    }

    let names: Vec<String> = ports.iter().map(|p| p.name.clone()).collect();
    let selected = find_port(&names, pattern);

    for (i, port) in ports.iter().enumerate() {
        let virtual_tag = if port.is_virtual { " [VIRTUAL]".yellow().to_string() } else { String::new() };
        let line = format!("  {}: {}{}", port.index, port.name, virtual_tag);
        if selected == Some(i) {
            println!("{} {}", line.green(), "<- selected".green());
        } else {
            println!("{}", line);
        }
    }
    println!();
}
