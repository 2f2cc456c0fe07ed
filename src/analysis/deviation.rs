//! DeviationClassifier - signed distance of a sample outside its baseline
//!
//! Each new rate is compared against the window *before* it is inserted, so a
//! sample never contributes to its own baseline. The deviation is the signed
//! distance outside a one-variance band around the window mean:
//!
//! - `rate > mean + variance` → `rate - mean - variance` (positive)
//! - `rate < mean - variance` → `-(mean - variance - rate)` (negative)
//! - otherwise → `0.0`
//!
//! With [`MIN_HISTORY`] values or fewer in the window the deviation is always
//! `0.0`.

use serde::{Deserialize, Serialize};

use super::baseline::{BaselineStats, SlidingBaseline};

/// Window length at or below which no deviation is computed
pub const MIN_HISTORY: usize = 5;

/// Deviation above which a sample is a strong high
pub const STRONG_HIGH_THRESHOLD: f64 = 2.0;
/// Deviation above which a sample is a mild high
pub const MILD_HIGH_THRESHOLD: f64 = 0.5;
/// Deviation below which a sample is a mild low
pub const MILD_LOW_THRESHOLD: f64 = -0.5;

/// Discrete classification of a deviation, driving pattern choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationBand {
    StrongHigh,
    MildHigh,
    Neutral,
    MildLow,
}

impl DeviationBand {
    pub const ALL: [DeviationBand; 4] = [
        DeviationBand::StrongHigh,
        DeviationBand::MildHigh,
        DeviationBand::Neutral,
        DeviationBand::MildLow,
    ];

    pub fn from_deviation(deviation: f64) -> Self {
        if deviation > STRONG_HIGH_THRESHOLD {
            DeviationBand::StrongHigh
        } else if deviation > MILD_HIGH_THRESHOLD {
            DeviationBand::MildHigh
        } else if deviation < MILD_LOW_THRESHOLD {
            DeviationBand::MildLow
        } else {
            DeviationBand::Neutral
        }
    }
}

/// Deviation of `rate` against precomputed window statistics.
///
/// Returns `0.0` when the window holds [`MIN_HISTORY`] values or fewer.
pub fn deviation_from_stats(stats: &BaselineStats, rate: f64) -> f64 {
    if stats.len <= MIN_HISTORY {
        return 0.0;
    }

    let upper = stats.mean + stats.variance;
    let lower = stats.mean - stats.variance;
    if rate > upper {
        rate - stats.mean - stats.variance
    } else if rate < lower {
        -(stats.mean - stats.variance - rate)
    } else {
        0.0
    }
}

/// Classifies live samples against a sliding baseline it owns
#[derive(Debug, Clone, Default)]
pub struct DeviationClassifier {
    baseline: SlidingBaseline,
}

impl DeviationClassifier {
    pub fn new(baseline: SlidingBaseline) -> Self {
        Self { baseline }
    }

    /// Classify `rate` against the current window, then insert it.
    pub fn observe(&mut self, rate: f64) -> f64 {
        let deviation = self.peek(rate);
        self.baseline.push(rate);
        deviation
    }

    /// Deviation `rate` would get, without touching the window
    pub fn peek(&self, rate: f64) -> f64 {
        if self.baseline.len() <= MIN_HISTORY {
            return 0.0;
        }
        match self.baseline.stats() {
            Some(stats) => deviation_from_stats(&stats, rate),
            None => 0.0,
        }
    }

    pub fn baseline(&self) -> &SlidingBaseline {
        &self.baseline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Six values with mean 70 and sample variance 4
    fn window_mean_70_var_4() -> SlidingBaseline {
        // Deviations ±sqrt(10/3) around 70 give sum of squares 20 over 6 values
        let d = (10.0f64 / 3.0).sqrt();
        SlidingBaseline::seeded([70.0 + d, 70.0 - d, 70.0 + d, 70.0 - d, 70.0 + d, 70.0 - d])
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {} got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_fixture_window_statistics() {
        let stats = window_mean_70_var_4().stats().unwrap();
        assert_close(stats.mean, 70.0);
        assert_close(stats.variance, 4.0);
    }

    #[test]
    fn test_short_window_always_zero() {
        for len in 0..=MIN_HISTORY {
            let baseline = SlidingBaseline::seeded(std::iter::repeat(70.0).take(len));
            let classifier = DeviationClassifier::new(baseline);
            for rate in [0.0, 40.0, 70.0, 200.0, -10.0] {
                assert_eq!(classifier.peek(rate), 0.0, "len {} rate {}", len, rate);
            }
        }
    }

    #[test]
    fn test_strong_high_sample() {
        let mut classifier = DeviationClassifier::new(window_mean_70_var_4());
        let deviation = classifier.observe(80.0);
        assert_close(deviation, 6.0);
        assert!(deviation > 0.0);
        assert_eq!(DeviationBand::from_deviation(deviation), DeviationBand::StrongHigh);
    }

    #[test]
    fn test_mild_low_sample() {
        let mut classifier = DeviationClassifier::new(window_mean_70_var_4());
        let deviation = classifier.observe(64.0);
        assert_close(deviation, -2.0);
        assert!(deviation < 0.0);
        assert_eq!(DeviationBand::from_deviation(deviation), DeviationBand::MildLow);
    }

    #[test]
    fn test_sample_inside_band_is_neutral() {
        let classifier = DeviationClassifier::new(window_mean_70_var_4());
        assert_eq!(classifier.peek(70.0), 0.0);
        assert_eq!(classifier.peek(73.5), 0.0);
        assert_eq!(classifier.peek(66.5), 0.0);
    }

    #[test]
    fn test_classify_before_insert() {
        // A window of six 70s has zero variance; a 100 sample must be judged
        // against that window, not one that already contains 100.
        let mut classifier = DeviationClassifier::new(SlidingBaseline::seeded([70.0; 6]));
        let deviation = classifier.observe(100.0);
        assert_eq!(deviation, 30.0);
        assert_eq!(classifier.baseline().len(), 7);
        assert_eq!(classifier.baseline().values().last(), Some(100.0));
    }

    #[test]
    fn test_band_thresholds() {
        assert_eq!(DeviationBand::from_deviation(2.01), DeviationBand::StrongHigh);
        assert_eq!(DeviationBand::from_deviation(2.0), DeviationBand::MildHigh);
        assert_eq!(DeviationBand::from_deviation(0.51), DeviationBand::MildHigh);
        assert_eq!(DeviationBand::from_deviation(0.5), DeviationBand::Neutral);
        assert_eq!(DeviationBand::from_deviation(0.0), DeviationBand::Neutral);
        assert_eq!(DeviationBand::from_deviation(-0.5), DeviationBand::Neutral);
        assert_eq!(DeviationBand::from_deviation(-0.51), DeviationBand::MildLow);
        assert_eq!(DeviationBand::from_deviation(-40.0), DeviationBand::MildLow);
    }
}
