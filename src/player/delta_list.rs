//! DeltaList - queue of frame-timed events
//!
//! Each queued event stores its delay relative to the event before it, so
//! advancing the clock only touches the head of the queue. Events with equal
//! delays keep their insertion order.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct DeltaList<E> {
    /// (delay in frames after the previous entry, event)
    events: VecDeque<(u64, E)>,
}

impl<E> DeltaList<E> {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Queue `event` to fire `frame_delay` frames from now.
    pub fn add_event(&mut self, frame_delay: u64, event: E) {
        let mut remaining = frame_delay;
        let mut index = self.events.len();

        for (i, (delta, _)) in self.events.iter_mut().enumerate() {
            if remaining < *delta {
                *delta -= remaining;
                index = i;
                break;
            }
            remaining -= *delta;
        }

        self.events.insert(index, (remaining, event));
    }

    /// Advance the clock by `frames`.
    ///
    /// Returns the events due within this tick, each paired with its offset
    /// from the start of the tick, in firing order.
    pub fn clock_tick(&mut self, frames: u64) -> Vec<(u64, E)> {
        let mut due = Vec::new();
        let mut elapsed = 0u64;

        while let Some((delta, _)) = self.events.front() {
            if elapsed + *delta >= frames {
                break;
            }
            if let Some((delta, event)) = self.events.pop_front() {
                elapsed += delta;
                due.push((elapsed, event));
            }
        }

        if let Some((delta, _)) = self.events.front_mut() {
            *delta -= frames - elapsed;
        }
        due
    }

    /// Remove every queued event, with its delay from now.
    pub fn drain_all(&mut self) -> Vec<(u64, E)> {
        let mut elapsed = 0u64;
        self.events
            .drain(..)
            .map(|(delta, event)| {
                elapsed += delta;
                (elapsed, event)
            })
            .collect()
    }

    /// Queued events with their delays relative to the previous entry
    pub fn iter(&self) -> impl Iterator<Item = (u64, &E)> {
        self.events.iter().map(|(delta, event)| (*delta, event))
    }
}

impl<E> Default for DeltaList<E> {
    fn default() -> Self {
        Self::new()
    }
}
