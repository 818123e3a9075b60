//! MIDI message types
//!
//! Parses raw MIDI bytes into typed messages for classification.

/// MIDI message types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (1-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Polyphonic Key Pressure: channel (0-15), note (0-127), pressure (0-127)
    PolyPressure { channel: u8, note: u8, pressure: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Program Change: channel (0-15), program (0-127)
    ProgramChange { channel: u8, program: u8 },

    /// Channel Pressure: channel (0-15), pressure (0-127)
    ChannelPressure { channel: u8, pressure: u8 },

    /// Pitch Bend: channel (0-15), value (0-16383, 14-bit)
    PitchBend { channel: u8, value: u16 },

    /// System Exclusive payload (without F0/F7)
    SysEx { data: Vec<u8> },

    /// Any other system common / realtime message, by status byte
    System { status: u8 },
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes
    ///
    /// Running status is not supported; a leading data byte yields `None`.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (&status, rest) = data.split_first()?;

        if status < 0x80 {
            return None;
        }

        // A status byte in a data position is corrupt input, not a value
        let d1 = rest.first().copied().filter(|b| *b < 0x80);
        let d2 = rest.get(1).copied().filter(|b| *b < 0x80);

        if status >= 0xF0 {
            return match status {
                0xF0 => {
                    let end = data.iter().position(|&b| b == 0xF7)?;
                    let payload = &data[1..end];
                    if payload.iter().any(|&b| b >= 0x80) {
                        return None;
                    }
                    Some(MidiMessage::SysEx {
                        data: payload.to_vec(),
                    })
                }
                0xF4 | 0xF5 | 0xF7 | 0xF9 | 0xFD => None,
                _ => Some(MidiMessage::System { status }),
            };
        }

        let channel = status & 0x0F;
        match status & 0xF0 {
            0x80 => Some(MidiMessage::NoteOff {
                channel,
                note: d1?,
                velocity: d2?,
            }),
            0x90 => {
                let (note, velocity) = (d1?, d2?);
                // Note On with velocity 0 is a Note Off
                if velocity == 0 {
                    Some(MidiMessage::NoteOff { channel, note, velocity: 0 })
                } else {
                    Some(MidiMessage::NoteOn { channel, note, velocity })
                }
            }
            0xA0 => Some(MidiMessage::PolyPressure {
                channel,
                note: d1?,
                pressure: d2?,
            }),
            0xB0 => Some(MidiMessage::ControlChange {
                channel,
                cc: d1?,
                value: d2?,
            }),
            0xC0 => Some(MidiMessage::ProgramChange { channel, program: d1? }),
            0xD0 => Some(MidiMessage::ChannelPressure { channel, pressure: d1? }),
            0xE0 => {
                let (lsb, msb) = (d1? as u16, d2? as u16);
                Some(MidiMessage::PitchBend {
                    channel,
                    value: (msb << 7) | lsb,
                })
            }
            _ => None,
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
