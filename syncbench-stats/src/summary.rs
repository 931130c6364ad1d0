//! Summary Statistics
//!
//! Mean and standard deviation over one timing series. The deviation is the
//! population form (divide by N), computed on the raw second-scale samples;
//! scaling to microseconds is applied afterwards to both figures alike.

use crate::MICROS_PER_SECOND;

/// Mean and spread of one series of durations (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SeriesStats {
    /// Arithmetic mean in seconds
    pub mean: f64,
    /// Population standard deviation in seconds
    pub std_dev: f64,
}

impl SeriesStats {
    /// Mean converted to microseconds
    pub fn mean_us(&self) -> f64 {
        self.mean * MICROS_PER_SECOND
    }

    /// Standard deviation converted to microseconds
    pub fn std_dev_us(&self) -> f64 {
        self.std_dev * MICROS_PER_SECOND
    }
}

/// Compute mean and population standard deviation of `samples`.
///
/// An empty series yields all-zero statistics.
pub fn compute_series_stats(samples: &[f64]) -> SeriesStats {
    if samples.is_empty() {
        return SeriesStats::default();
    }

    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

    SeriesStats {
        mean,
        std_dev: variance.sqrt(),
    }
}
