//! Suite Runner
//!
//! Suites register themselves through `inventory`; the runner walks them in
//! source order, resolves each case's plan against the run configuration and
//! streams report lines to a sink.

use std::panic::{AssertUnwindSafe, catch_unwind};

use regex::Regex;
use serde::{Deserialize, Serialize};
use syncbench_report::{DEFAULT_NAME_WIDTH, ReportSink};
use tracing::{info, warn};

use crate::attr::CaseAttr;
use crate::case::{CaseDef, DEFAULT_REPETITIONS, DEFAULT_WARMUP};
use crate::device::{Device, HostOnly};
use crate::error::{BenchError, ConfigError, panic_message};
use crate::measure::pin_to_cpu;
use crate::suite::{CaseInfo, Suite, SuiteContext, list_cases, run_suite};
use crate::timing::{CasePlan, TimingMode};

/// What to do when a suite fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop the whole run at the first failure
    #[default]
    Abort,
    /// Log the failure, drop the rest of that suite, continue with the next
    SkipSuite,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(FailurePolicy::Abort),
            "skip-suite" | "skip" => Ok(FailurePolicy::SkipSuite),
            other => Err(format!("Unknown failure policy: {}", other)),
        }
    }
}

/// Run-wide settings
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Timing protocol for every case
    pub mode: TimingMode,
    /// Measured iterations for cases without their own value
    pub repetitions: Option<usize>,
    /// Warmup iterations for cases without their own value
    pub warmup: Option<usize>,
    /// Only run cases whose `suite/case` path matches
    pub filter: Option<Regex>,
    /// Failure handling
    pub on_failure: FailurePolicy,
    /// Pin the measuring thread to this core
    pub pin_cpu: Option<usize>,
    /// Column width of the case name in report lines
    pub name_width: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: TimingMode::default(),
            repetitions: None,
            warmup: None,
            filter: None,
            on_failure: FailurePolicy::default(),
            pin_cpu: None,
            name_width: DEFAULT_NAME_WIDTH,
        }
    }
}

impl RunConfig {
    /// Iteration counts for `case`: its own override, then the run-wide
    /// value, then the built-in default
    pub fn resolve_for_case<S>(&self, case: &CaseDef<S>) -> Result<CasePlan, ConfigError> {
        self.resolve(case.attr())
    }

    /// Iteration counts for a case carrying `attr`
    pub fn resolve(&self, attr: CaseAttr) -> Result<CasePlan, ConfigError> {
        let repetitions = attr
            .repetitions
            .or(self.repetitions)
            .unwrap_or(DEFAULT_REPETITIONS);
        let warmup = attr.warmup.or(self.warmup).unwrap_or(DEFAULT_WARMUP);

        if repetitions == 0 {
            return Err(ConfigError::NonPositiveRepetitions(0));
        }

        Ok(CasePlan {
            repetitions,
            warmup,
        })
    }

    /// Whether the filter admits `suite/case`
    pub fn selects(&self, suite: &str, case: &str) -> bool {
        match &self.filter {
            Some(re) => re.is_match(&format!("{}/{}", suite, case)),
            None => true,
        }
    }
}

/// A registered suite
#[derive(Debug, Clone, Copy)]
pub struct SuiteDef {
    /// Suite name
    pub name: &'static str,
    /// Source file of the registration
    pub file: &'static str,
    /// Source line of the registration
    pub line: u32,
    /// Runs the suite
    pub run_fn: fn(&mut SuiteContext<'_>) -> Result<usize, BenchError>,
    /// Lists the suite's cases
    pub list_fn: fn() -> Result<Vec<CaseInfo>, ConfigError>,
}

impl SuiteDef {
    /// Definition for `S` that is not tied to a registration site
    pub fn of<S: Suite>() -> Self {
        Self {
            name: S::suite_name(),
            file: "",
            line: 0,
            run_fn: run_suite::<S>,
            list_fn: list_cases::<S>,
        }
    }
}

/// All registered suites, in source order
pub fn registered_suites() -> Vec<&'static SuiteDef> {
    let mut suites: Vec<_> = inventory::iter::<SuiteDef>.into_iter().collect();
    suites.sort_by_key(|def| (def.file, def.line));
    suites
}

/// Outcome of a completed run
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Suites that ran to completion
    pub suites_run: usize,
    /// Cases reported across all suites
    pub cases_run: usize,
    /// Suite failures tolerated under [`FailurePolicy::SkipSuite`]
    pub failures: Vec<BenchError>,
}

impl RunSummary {
    /// True when no suite failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives suites against one device
pub struct Runner {
    config: RunConfig,
    device: Device,
}

impl Runner {
    /// Runner over a host-only device
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            device: HostOnly::shared(),
        }
    }

    /// Use `device` for synchronization and markers
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// The run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The device in use
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Run every registered suite
    pub fn run_registered(&self, sink: &mut dyn ReportSink) -> Result<RunSummary, BenchError> {
        self.run_suites(&registered_suites(), sink)
    }

    /// Run `suites` in the given order
    pub fn run_suites(
        &self,
        suites: &[&SuiteDef],
        sink: &mut dyn ReportSink,
    ) -> Result<RunSummary, BenchError> {
        if let Some(cpu) = self.config.pin_cpu {
            if let Err(e) = pin_to_cpu(cpu) {
                warn!(cpu, error = %e, "failed to pin measuring thread");
            }
        }

        info!(
            suites = suites.len(),
            device = self.device.name(),
            mode = ?self.config.mode,
            "starting run"
        );

        let mut summary = RunSummary::default();
        for def in suites {
            let mut ctx = SuiteContext {
                device: &self.device,
                config: &self.config,
                sink: &mut *sink,
            };

            let outcome = match self.config.on_failure {
                FailurePolicy::Abort => (def.run_fn)(&mut ctx),
                FailurePolicy::SkipSuite => catch_unwind(AssertUnwindSafe(|| (def.run_fn)(&mut ctx)))
                    .unwrap_or_else(|payload| {
                        Err(BenchError::Panicked {
                            suite: def.name.to_string(),
                            message: panic_message(payload.as_ref()),
                        })
                    }),
            };

            match outcome {
                Ok(cases) => {
                    summary.suites_run += 1;
                    summary.cases_run += cases;
                }
                Err(err) if self.config.on_failure == FailurePolicy::SkipSuite => {
                    warn!(suite = def.name, error = %err, "suite failed, skipping");
                    summary.failures.push(err);
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            suites = summary.suites_run,
            cases = summary.cases_run,
            failures = summary.failures.len(),
            "run complete"
        );
        Ok(summary)
    }
}

/// List `suites` as `(suite name, cases)` pairs
pub fn list_suites(
    suites: &[&SuiteDef],
) -> Result<Vec<(&'static str, Vec<CaseInfo>)>, BenchError> {
    suites
        .iter()
        .map(|def| {
            (def.list_fn)()
                .map(|cases| (def.name, cases))
                .map_err(|source| BenchError::Config {
                    suite: def.name.to_string(),
                    source,
                })
        })
        .collect()
}
