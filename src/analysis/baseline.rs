//! SlidingBaseline - bounded window of recent heart rates
//!
//! Holds the most recent [`BASELINE_CAPACITY`] rate values in arrival order
//! and computes mean and sample variance on demand. The window is owned by
//! the ingest loop; the classifier only ever sees read-only [`BaselineStats`].

use std::collections::VecDeque;

/// Number of rate values retained in the window
pub const BASELINE_CAPACITY: usize = 10;

/// Summary statistics of the window at a given instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineStats {
    pub mean: f64,
    /// Sample variance (divisor N-1)
    pub variance: f64,
    pub len: usize,
}

/// Bounded FIFO of recent rate values
#[derive(Debug, Clone)]
pub struct SlidingBaseline {
    values: VecDeque<f64>,
}

impl SlidingBaseline {
    pub fn new() -> Self {
        Self {
            values: VecDeque::with_capacity(BASELINE_CAPACITY),
        }
    }

    /// Build a window pre-seeded from historical rates, oldest first.
    ///
    /// Only the newest [`BASELINE_CAPACITY`] values survive.
    pub fn seeded<I>(history: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut baseline = Self::new();
        for rate in history {
            baseline.push(rate);
        }
        baseline
    }

    /// Append a rate, evicting the oldest value when full.
    pub fn push(&mut self, rate: f64) {
        if self.values.len() == BASELINE_CAPACITY {
            self.values.pop_front();
        }
        self.values.push_back(rate);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in arrival order, oldest first
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let sum: f64 = self.values.iter().sum();
        Some(sum / self.values.len() as f64)
    }

    /// Sample variance of the window; `None` with fewer than two values.
    pub fn variance(&self) -> Option<f64> {
        let n = self.values.len();
        if n < 2 {
            return None;
        }
        let mean = self.mean()?;
        let sum_sq: f64 = self.values.iter().map(|v| (v - mean) * (v - mean)).sum();
        Some(sum_sq / (n - 1) as f64)
    }

    pub fn stats(&self) -> Option<BaselineStats> {
        Some(BaselineStats {
            mean: self.mean()?,
            variance: self.variance()?,
            len: self.values.len(),
        })
    }
}

impl Default for SlidingBaseline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window_has_no_stats() {
        let baseline = SlidingBaseline::new();
        assert!(baseline.is_empty());
        assert_eq!(baseline.mean(), None);
        assert_eq!(baseline.variance(), None);
        assert!(baseline.stats().is_none());
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let mut baseline = SlidingBaseline::new();
        for i in 0..25 {
            baseline.push(i as f64);
            assert!(baseline.len() <= BASELINE_CAPACITY);
        }
        assert_eq!(baseline.len(), BASELINE_CAPACITY);
    }

    #[test]
    fn test_eviction_is_fifo() {
        let baseline = SlidingBaseline::seeded((0..13).map(|i| i as f64));
        let values: Vec<f64> = baseline.values().collect();
        assert_eq!(values, (3..13).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_sample_variance_uses_n_minus_one() {
        let baseline = SlidingBaseline::seeded([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let stats = baseline.stats().unwrap();
        assert_eq!(stats.mean, 5.0);
        // Sum of squared deviations is 32 over 8 values
        assert!((stats.variance - 32.0 / 7.0).abs() < 1e-12);
        assert_eq!(stats.len, 8);
    }

    #[test]
    fn test_constant_window_has_zero_variance() {
        let baseline = SlidingBaseline::seeded([70.0; 6]);
        assert_eq!(baseline.variance(), Some(0.0));
    }
}
