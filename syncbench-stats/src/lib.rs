#![warn(missing_docs)]
//! SyncBench Statistical Engine
//!
//! Reduces a series of per-iteration durations to the two figures a
//! syncbench report line carries: the arithmetic mean and the population
//! standard deviation.

mod summary;

pub use summary::{SeriesStats, compute_series_stats};

/// Seconds to microseconds
pub const MICROS_PER_SECOND: f64 = 1_000_000.0;
