//! Report Data Structures

use std::fmt;

use syncbench_stats::{SeriesStats, compute_series_stats};
use thiserror::Error;

/// Width the case name is padded to in a report line
pub const DEFAULT_NAME_WIDTH: usize = 20;

/// Spacing between the host and the device series of a dual-timeline line
pub const SERIES_SEPARATOR: &str = "    ";

/// Errors raised while assembling a result record
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReportError {
    /// Host and device series of a dual record differ in length
    #[error("dual-timeline series differ in length: host {host}, device {device}")]
    LengthMismatch {
        /// Host series length
        host: usize,
        /// Device series length
        device: usize,
    },
    /// A duration was negative or not a number
    #[error("invalid duration {value} at sample {index}")]
    InvalidDuration {
        /// Position in the series
        index: usize,
        /// Offending value (seconds)
        value: f64,
    },
}

/// Raw per-iteration durations in seconds, in iteration order
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    /// Host wall-clock only
    Host(Vec<f64>),
    /// Host wall-clock and device-elapsed, pairwise per iteration
    Dual {
        /// Host wall-clock durations
        host: Vec<f64>,
        /// Device-elapsed durations
        device: Vec<f64>,
    },
}

impl Samples {
    /// Number of measured iterations
    pub fn len(&self) -> usize {
        match self {
            Samples::Host(host) | Samples::Dual { host, .. } => host.len(),
        }
    }

    /// Whether no iteration was recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Host wall-clock series
    pub fn host(&self) -> &[f64] {
        match self {
            Samples::Host(host) | Samples::Dual { host, .. } => host,
        }
    }

    /// Device-elapsed series, when recorded
    pub fn device(&self) -> Option<&[f64]> {
        match self {
            Samples::Host(_) => None,
            Samples::Dual { device, .. } => Some(device),
        }
    }

    fn validate(&self) -> Result<(), ReportError> {
        if let Samples::Dual { host, device } = self {
            if host.len() != device.len() {
                return Err(ReportError::LengthMismatch {
                    host: host.len(),
                    device: device.len(),
                });
            }
        }

        let series = std::iter::once(self.host()).chain(self.device());
        for values in series {
            if let Some((index, &value)) = values
                .iter()
                .enumerate()
                .find(|(_, v)| !v.is_finite() || **v < 0.0)
            {
                return Err(ReportError::InvalidDuration { index, value });
            }
        }
        Ok(())
    }
}

/// Statistics of one case, one entry per recorded series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaseStats {
    /// Host wall-clock statistics
    pub host: SeriesStats,
    /// Device-elapsed statistics (dual-timeline mode only)
    pub device: Option<SeriesStats>,
}

/// The outcome of one benchmark case: its name and its raw samples.
///
/// Built once per case run, formatted into a report line, then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseResult {
    name: String,
    samples: Samples,
}

impl CaseResult {
    /// Build a record from samples, checking the record invariants
    pub fn new(name: impl Into<String>, samples: Samples) -> Result<Self, ReportError> {
        samples.validate()?;
        Ok(Self {
            name: name.into(),
            samples,
        })
    }

    /// Host-only record
    pub fn host(name: impl Into<String>, host: Vec<f64>) -> Result<Self, ReportError> {
        Self::new(name, Samples::Host(host))
    }

    /// Dual-timeline record; both series must have equal length
    pub fn dual(
        name: impl Into<String>,
        host: Vec<f64>,
        device: Vec<f64>,
    ) -> Result<Self, ReportError> {
        Self::new(name, Samples::Dual { host, device })
    }

    /// Case name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw samples
    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Mean and population standard deviation per series
    pub fn stats(&self) -> CaseStats {
        CaseStats {
            host: compute_series_stats(self.samples.host()),
            device: self.samples.device().map(compute_series_stats),
        }
    }

    /// Render the report line with the case name padded to `name_width`
    pub fn format_line(&self, name_width: usize) -> String {
        let stats = self.stats();
        let mut line = format!("{:<width$}: ", self.name, width = name_width);
        line.push_str(&format_series(&stats.host));
        if let Some(device) = &stats.device {
            line.push_str(SERIES_SEPARATOR);
            line.push_str(&format_series(device));
        }
        line
    }
}

impl fmt::Display for CaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_line(DEFAULT_NAME_WIDTH))
    }
}

fn format_series(stats: &SeriesStats) -> String {
    format!(
        "{:.3} us   +/- {:.3} us",
        stats.mean_us(),
        stats.std_dev_us()
    )
}
