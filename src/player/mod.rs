// Player module - the event sink the composer dispatches notes into
//
// The composer only needs "note-on after D1, note-off after D2, both measured
// from now". NoteSink is that contract; MidiPlayer is the frame-clocked
// implementation used by the binary.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod delta_list;
pub mod midi;
pub mod midi_player;

pub use delta_list::DeltaList;
pub use midi::{JsonLinesOutput, MidiMessage, MidiOutput};
pub use midi_player::MidiPlayer;

/// Request to sound one note for a bounded time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteRequest {
    pub note: u8,
    pub velocity: u8,
    pub channel: u8,
    /// Delay from the call until note-on
    pub on_delay: Duration,
    /// Delay from the call until note-off
    pub off_delay: Duration,
}

impl NoteRequest {
    pub fn note_on(&self) -> MidiMessage {
        MidiMessage::NoteOn {
            channel: self.channel,
            note: self.note,
            velocity: self.velocity,
        }
    }

    pub fn note_off(&self) -> MidiMessage {
        MidiMessage::NoteOff {
            channel: self.channel,
            note: self.note,
        }
    }
}

/// Accepts note scheduling requests without blocking the caller.
///
/// Implementations must return promptly; delivery failures are the sink's own
/// concern and are never reported back to the composer.
pub trait NoteSink: Send + Sync {
    fn schedule(&self, request: NoteRequest);
}
