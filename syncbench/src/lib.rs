#![warn(missing_docs)]
//! # SyncBench
//!
//! Microbenchmark harness for accelerator workloads whose execution is
//! asynchronous with respect to the host.
//!
//! SyncBench provides:
//! - **Suite Discovery**: every `perf_*` method of a `#[suite]` impl block is a case, run in declaration order
//! - **Per-Case Overrides**: `#[case(repetitions = .., warmup = ..)]` or `CaseAttr` at runtime
//! - **Synchronized Timing**: host wall clock between full device barriers
//! - **Dual Timelines**: host dispatch time alongside device time between queue markers
//! - **Streaming Reports**: one fixed-width line per case, emitted as soon as the case finishes
//!
//! ## Quick Start
//!
//! ```ignore
//! #[derive(Default)]
//! struct Elementwise {
//!     device: Option<syncbench::Device>,
//! }
//!
//! #[syncbench::suite]
//! impl Elementwise {
//!     fn set_up(&mut self, device: &syncbench::Device) {
//!         self.device = Some(device.clone());
//!     }
//!
//!     #[case(repetitions = 1000)]
//!     fn perf_add(&mut self) -> anyhow::Result<()> {
//!         // enqueue kernels on the device
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     syncbench::run()
//! }
//! ```
//!
//! ## Manual Suites
//!
//! ```ignore
//! impl syncbench::CaseSet for Reduce {
//!     fn members() -> Result<Vec<syncbench::Member<Self>>, syncbench::ConfigError> {
//!         Ok(vec![
//!             syncbench::Member::workload("perf_sum", Reduce::perf_sum),
//!             syncbench::Member::case("perf_max", CaseAttr::new().repetitions(10).wrap(Reduce::perf_max)?),
//!         ])
//!     }
//! }
//! impl syncbench::Suite for Reduce {}
//! syncbench::register_suite!(Reduce);
//! ```

// Re-export core types
pub use syncbench_core::{
    Accelerator, BenchError, BoxError, CASE_PREFIX, CaseAttr, CaseDef, CaseFn, CaseInfo,
    CasePlan, CaseSet, CaseSpec, ConfigError, DEFAULT_REPETITIONS, DEFAULT_WARMUP, Device,
    DeviceError, FailurePolicy, HostOnly, IntoCaseResult, LoopError, Marker, Member, Phase,
    RunConfig, RunSummary, Runner, SimulatedDevice, Suite, SuiteContext, SuiteDef, TimingMode,
    Timer, Work, discover_cases, list_cases, list_suites, registered_suites, run_case_loop,
    run_suite,
};

// Re-export macros
pub use syncbench_macros::suite;

// Re-export report types
pub use syncbench_report::{
    CaseResult, CaseStats, DEFAULT_NAME_WIDTH, ReportError, ReportSink, Samples, StdoutSink,
    WriterSink,
};

// Re-export stats
pub use syncbench_stats::{SeriesStats, compute_series_stats};

/// Internal re-exports for macro use
#[doc(hidden)]
pub mod internal {
    pub use anyhow;
    pub use inventory;
    pub use syncbench_core::{list_cases, run_suite};
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CaseAttr, CaseFn, CaseSet, Device, Member, Suite, TimingMode, register_suite, suite,
    };
}

/// Register a suite with a hand-written [`CaseSet`] implementation.
///
/// `#[suite]` registers automatically; this is for suites assembled by hand.
/// The type must implement [`Suite`].
#[macro_export]
macro_rules! register_suite {
    ($ty:ident) => {
        $crate::register_suite!($ty, stringify!($ty));
    };
    ($ty:ty, $name:expr) => {
        $crate::internal::inventory::submit! {
            $crate::SuiteDef {
                name: $name,
                file: file!(),
                line: line!(),
                run_fn: $crate::internal::run_suite::<$ty>,
                list_fn: $crate::internal::list_cases::<$ty>,
            }
        }
    };
}

/// Run the SyncBench CLI harness.
///
/// Call this from your benchmark binary's `main()`:
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     syncbench::run()
/// }
/// ```
pub use syncbench_cli::run;

/// Run the SyncBench CLI harness against a caller-provided device.
pub use syncbench_cli::run_with_device;
