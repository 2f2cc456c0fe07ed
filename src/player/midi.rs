//! MIDI channel messages and output sinks.

use std::io::Write;

use serde::{Deserialize, Serialize};

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
}

impl MidiMessage {
    /// MIDI wire encoding
    pub fn to_bytes(self) -> [u8; 3] {
        match self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => [NOTE_ON | (channel & 0x0f), note & 0x7f, velocity & 0x7f],
            MidiMessage::NoteOff { channel, note } => [NOTE_OFF | (channel & 0x0f), note & 0x7f, 0],
        }
    }
}

/// Destination for MIDI events released by the player clock
pub trait MidiOutput: Send {
    /// Write `message`, due at absolute `frame` since the player started.
    fn write(&mut self, frame: u64, message: MidiMessage) -> std::io::Result<()>;

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct MidiRecord<'a> {
    frame: u64,
    bytes: [u8; 3],
    #[serde(flatten)]
    message: &'a MidiMessage,
}

/// Writes one JSON object per MIDI event, newline separated
pub struct JsonLinesOutput<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesOutput<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> MidiOutput for JsonLinesOutput<W> {
    fn write(&mut self, frame: u64, message: MidiMessage) -> std::io::Result<()> {
        let record = MidiRecord {
            frame,
            bytes: message.to_bytes(),
            message: &message,
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}
