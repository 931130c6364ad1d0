#![warn(missing_docs)]
//! SyncBench Report - Result Records and Output
//!
//! Turns the raw samples of one benchmark case into a single fixed-width
//! report line and hands it to a [`ReportSink`]:
//!
//! ```text
//! add                 : 12.345 us   +/- 0.678 us
//! add_huge            : 40.102 us   +/- 2.001 us    38.877 us   +/- 1.950 us
//! ```
//!
//! Host-only records carry one series; dual-timeline records append the
//! device-elapsed series after the host series.

mod report;
mod sink;

pub use report::{
    CaseResult, CaseStats, DEFAULT_NAME_WIDTH, ReportError, SERIES_SEPARATOR, Samples,
};
pub use sink::{ReportSink, StdoutSink, WriterSink};
