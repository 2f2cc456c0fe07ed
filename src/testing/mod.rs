//! Testability harness utilities.
//!
//! [`RecordingSink`] stands in for the MIDI player in unit and integration
//! tests. It timestamps every request with `tokio::time::Instant`, so tests
//! running on a paused clock can assert exact beat offsets.

use std::sync::Mutex;

use tokio::time::Instant;

use crate::player::{NoteRequest, NoteSink};

/// A note request and the (virtual) time it reached the sink
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedNote {
    pub at: Instant,
    pub request: NoteRequest,
}

/// NoteSink that keeps every request in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    notes: Mutex<Vec<RecordedNote>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every request recorded so far, in dispatch order
    pub fn notes(&self) -> Vec<RecordedNote> {
        self.notes.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Note numbers recorded so far
    pub fn note_numbers(&self) -> Vec<u8> {
        self.notes().iter().map(|note| note.request.note).collect()
    }

    pub fn len(&self) -> usize {
        self.notes.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NoteSink for RecordingSink {
    fn schedule(&self, request: NoteRequest) {
        self.notes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(RecordedNote {
                at: Instant::now(),
                request,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_records_in_order_with_time() {
        let sink = RecordingSink::new();
        let start = Instant::now();
        let request = NoteRequest {
            note: 37,
            velocity: 64,
            channel: 9,
            on_delay: Duration::ZERO,
            off_delay: Duration::from_millis(200),
        };

        sink.schedule(request);
        tokio::time::sleep(Duration::from_millis(800)).await;
        sink.schedule(NoteRequest { note: 45, ..request });

        let notes = sink.notes();
        assert_eq!(sink.note_numbers(), vec![37, 45]);
        assert_eq!(notes[1].at.duration_since(start), Duration::from_millis(800));
    }
}
