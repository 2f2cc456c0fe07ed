//! PatternSelector - percussion pattern table
//!
//! Maps each [`DeviationBand`] to a fixed list of hits within one beat.
//! Onsets and durations are fractions of the beat period, so the same table
//! serves any tempo.

use serde::{Deserialize, Serialize};

use crate::analysis::DeviationBand;

/// Full-strength hit velocity
pub const FULL_VELOCITY: u8 = 127;
/// Velocity of the subdued side-stick used below baseline
pub const SOFT_VELOCITY: u8 = 64;

/// General MIDI percussion instruments used by the patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    BassDrum,
    SideStick,
    ClosedHiHat,
    LowTom,
    CrashCymbal,
    HighTom,
}

impl Instrument {
    /// General MIDI note number on the percussion channel
    pub const fn note(self) -> u8 {
        match self {
            Instrument::BassDrum => 36,
            Instrument::SideStick => 37,
            Instrument::ClosedHiHat => 42,
            Instrument::LowTom => 45,
            Instrument::CrashCymbal => 49,
            Instrument::HighTom => 50,
        }
    }
}

/// One hit, positioned relative to the start and length of a beat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternEvent {
    pub instrument: Instrument,
    /// Start of the hit as a fraction of the beat, in [0, 1)
    pub onset: f64,
    /// Length of the hit as a fraction of the beat, > 0
    pub duration: f64,
    pub velocity: u8,
}

impl PatternEvent {
    pub const fn new(instrument: Instrument, onset: f64, duration: f64, velocity: u8) -> Self {
        Self {
            instrument,
            onset,
            duration,
            velocity,
        }
    }

    /// Fraction of the beat at which the hit ends
    pub fn release(&self) -> f64 {
        self.onset + self.duration
    }
}

const STRONG_HIGH: [PatternEvent; 2] = [
    PatternEvent::new(Instrument::LowTom, 0.0, 0.25, FULL_VELOCITY),
    PatternEvent::new(Instrument::CrashCymbal, 0.5, 0.25, FULL_VELOCITY),
];

const MILD_HIGH: [PatternEvent; 2] = [
    PatternEvent::new(Instrument::LowTom, 0.0, 0.25, FULL_VELOCITY),
    PatternEvent::new(Instrument::ClosedHiHat, 0.5, 0.25, FULL_VELOCITY),
];

const NEUTRAL: [PatternEvent; 1] = [PatternEvent::new(Instrument::LowTom, 0.0, 0.25, FULL_VELOCITY)];

const MILD_LOW: [PatternEvent; 1] =
    [PatternEvent::new(Instrument::SideStick, 0.0, 0.25, SOFT_VELOCITY)];

/// Pattern to play for one beat in `band`
pub fn select_pattern(band: DeviationBand) -> &'static [PatternEvent] {
    match band {
        DeviationBand::StrongHigh => &STRONG_HIGH,
        DeviationBand::MildHigh => &MILD_HIGH,
        DeviationBand::Neutral => &NEUTRAL,
        DeviationBand::MildLow => &MILD_LOW,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instruments(band: DeviationBand) -> Vec<Instrument> {
        select_pattern(band).iter().map(|e| e.instrument).collect()
    }

    #[test]
    fn test_pattern_table() {
        assert_eq!(
            instruments(DeviationBand::StrongHigh),
            vec![Instrument::LowTom, Instrument::CrashCymbal]
        );
        assert_eq!(
            instruments(DeviationBand::MildHigh),
            vec![Instrument::LowTom, Instrument::ClosedHiHat]
        );
        assert_eq!(instruments(DeviationBand::Neutral), vec![Instrument::LowTom]);
        assert_eq!(instruments(DeviationBand::MildLow), vec![Instrument::SideStick]);
    }

    #[test]
    fn test_mild_low_is_softer() {
        let pattern = select_pattern(DeviationBand::MildLow);
        assert_eq!(pattern[0].velocity, SOFT_VELOCITY);
        for band in [
            DeviationBand::StrongHigh,
            DeviationBand::MildHigh,
            DeviationBand::Neutral,
        ] {
            assert!(select_pattern(band)
                .iter()
                .all(|event| event.velocity == FULL_VELOCITY));
        }
    }

    #[test]
    fn test_selection_is_deterministic() {
        for band in DeviationBand::ALL {
            assert_eq!(select_pattern(band), select_pattern(band));
        }
    }

    #[test]
    fn test_events_fit_within_one_beat() {
        for band in DeviationBand::ALL {
            for event in select_pattern(band) {
                assert!((0.0..1.0).contains(&event.onset));
                assert!(event.duration > 0.0);
                assert!(event.release() <= 1.0);
            }
        }
    }

    #[test]
    fn test_general_midi_notes() {
        assert_eq!(Instrument::LowTom.note(), 45);
        assert_eq!(Instrument::CrashCymbal.note(), 49);
        assert_eq!(Instrument::ClosedHiHat.note(), 42);
        assert_eq!(Instrument::SideStick.note(), 37);
    }
}
