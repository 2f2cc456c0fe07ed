// Composer module - pattern table and beat scheduling

pub mod pattern;
pub mod scheduler;

pub use pattern::{select_pattern, Instrument, PatternEvent, FULL_VELOCITY, SOFT_VELOCITY};
pub use scheduler::{
    plan_beat, BeatPlan, Composer, ComposerReport, ComposerState, MAX_TEMPO_BPM, MIN_TEMPO_BPM,
};
