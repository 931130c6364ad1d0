//! Error Taxonomy
//!
//! Two families: configuration errors, detected while case descriptors are
//! built and before anything runs, and run errors, which abort the suite in
//! progress. Workload and hook errors are never retried.

use std::fmt;

use crate::device::Marker;
use thiserror::Error;

/// Boxed error produced by user workloads and hooks
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Invalid case or run configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Override names a field that does not exist
    #[error("unknown case field `{0}` (expected repetitions, n, warmup or n_warmup)")]
    UnknownField(String),
    /// Repetition count must be at least one
    #[error("repetitions must be positive, got {0}")]
    NonPositiveRepetitions(i64),
    /// Value out of range for the named field
    #[error("invalid value `{value}` for `{field}`")]
    InvalidValue {
        /// Field name
        field: String,
        /// Offending value
        value: String,
    },
}

/// Failure reported by an accelerator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Marker was not created by this device
    #[error("unknown timeline marker {0}")]
    UnknownMarker(Marker),
    /// Marker was waited on or queried before being recorded
    #[error("timeline marker {0} was never recorded")]
    NotRecorded(Marker),
    /// Marker is recorded but the device has not reached it yet
    #[error("timeline marker {0} has not been reached")]
    NotReached(Marker),
    /// The device can no longer execute work
    #[error("device lost: {0}")]
    Lost(String),
}

/// Measurement phase an iteration belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Discarded priming iterations
    Warmup,
    /// Recorded iterations
    Measure,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Warmup => f.write_str("warmup"),
            Phase::Measure => f.write_str("measured"),
        }
    }
}

/// Failure inside the timing loop of one case
#[derive(Debug, Error)]
pub enum LoopError {
    /// The workload returned an error
    #[error("{phase} iteration {iteration} failed: {source}")]
    Workload {
        /// Phase the failing iteration belonged to
        phase: Phase,
        /// Zero-based iteration index within its phase
        iteration: usize,
        /// Error raised by the workload
        #[source]
        source: BoxError,
    },
    /// A synchronization or marker call failed
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Error that aborts a suite (and, under the default policy, the run)
#[derive(Debug, Error)]
pub enum BenchError {
    /// Case descriptors of the suite are invalid
    #[error("suite `{suite}`: {source}")]
    Config {
        /// Suite name
        suite: String,
        /// Underlying configuration error
        #[source]
        source: ConfigError,
    },
    /// `set_up` failed before the case ran
    #[error("`{suite}/{case}` set_up failed: {source}")]
    SetUp {
        /// Suite name
        suite: String,
        /// Case name
        case: String,
        /// Error raised by the hook
        #[source]
        source: BoxError,
    },
    /// The timing loop failed
    #[error("`{suite}/{case}` {source}")]
    Case {
        /// Suite name
        suite: String,
        /// Case name
        case: String,
        /// Loop failure
        #[source]
        source: LoopError,
    },
    /// `tear_down` failed after the case ran
    #[error("`{suite}/{case}` tear_down failed: {source}")]
    TearDown {
        /// Suite name
        suite: String,
        /// Case name
        case: String,
        /// Error raised by the hook
        #[source]
        source: BoxError,
    },
    /// Collected samples violated the result record invariants
    #[error("`{suite}/{case}` produced an invalid record: {source}")]
    Record {
        /// Suite name
        suite: String,
        /// Case name
        case: String,
        /// Record error
        #[source]
        source: syncbench_report::ReportError,
    },
    /// The report sink could not be written
    #[error("failed to emit report line: {0}")]
    Sink(#[from] std::io::Error),
    /// The suite panicked (only caught under the skip-suite policy)
    #[error("suite `{suite}` panicked: {message}")]
    Panicked {
        /// Suite name
        suite: String,
        /// Panic payload, when it was a string
        message: String,
    },
}

impl BenchError {
    /// Name of the suite the error belongs to, when known
    pub fn suite(&self) -> Option<&str> {
        match self {
            BenchError::Config { suite, .. }
            | BenchError::SetUp { suite, .. }
            | BenchError::Case { suite, .. }
            | BenchError::TearDown { suite, .. }
            | BenchError::Record { suite, .. }
            | BenchError::Panicked { suite, .. } => Some(suite),
            BenchError::Sink(_) => None,
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
