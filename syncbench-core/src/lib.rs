#![warn(missing_docs)]
//! SyncBench Core - Suite Runtime
//!
//! This crate provides the execution environment for accelerator benchmarks:
//! - `CaseDef` / `CaseAttr` for declaring cases and their run parameters
//! - Suite discovery in declaration order
//! - Host and dual (host + device marker) timing protocols
//! - The `Accelerator` seam with host-only and simulated queue devices
//! - A runner that walks registered suites and streams report lines

mod attr;
mod case;
mod device;
mod error;
mod measure;
mod runner;
mod simulated;
mod suite;
mod timing;

pub use attr::CaseAttr;
pub use case::{
    CASE_PREFIX, CaseDef, CaseFn, CaseSpec, DEFAULT_REPETITIONS, DEFAULT_WARMUP, IntoCaseResult,
};
pub use device::{Accelerator, Device, HostOnly, Marker, Work};
pub use error::{BenchError, BoxError, ConfigError, DeviceError, LoopError, Phase};
pub use measure::{Timer, pin_to_cpu};
pub use runner::{
    FailurePolicy, RunConfig, RunSummary, Runner, SuiteDef, list_suites, registered_suites,
};
pub use simulated::SimulatedDevice;
pub use suite::{
    CaseInfo, CaseSet, Member, Suite, SuiteContext, discover_cases, list_cases, run_suite,
};
pub use timing::{CasePlan, TimingMode, run_case_loop};

// Collect all registered suites
inventory::collect!(SuiteDef);

/// Anchor to prevent LTO from stripping inventory entries
#[used]
#[doc(hidden)]
pub static REGISTRY_ANCHOR: fn() = || {
    for _ in inventory::iter::<SuiteDef> {}
};
