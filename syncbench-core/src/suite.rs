//! Benchmark Suites
//!
//! A suite is a type whose `perf_*` methods are benchmark cases. The
//! [`CaseSet`] half lists those members (normally generated by
//! `#[syncbench::suite]`); the [`Suite`] half holds the per-case hooks.
//!
//! Per case, in discovery order:
//!
//! ```text
//! set_up ─ warmup ─ measure ─ tear_down ─ emit report line
//! ```
//!
//! The first error aborts the suite. Nothing is reported for the failing
//! case.

use syncbench_report::CaseResult;
use tracing::{debug, info};

use crate::attr::CaseAttr;
use crate::case::{CASE_PREFIX, CaseDef, CaseFn, CaseSpec, DEFAULT_REPETITIONS, DEFAULT_WARMUP};
use crate::device::Device;
use crate::error::{BenchError, ConfigError};
use crate::runner::RunConfig;
use crate::timing::{CasePlan, run_case_loop};

/// A declared suite member: its identifier and the case it resolves to
pub struct Member<S> {
    ident: &'static str,
    case: CaseDef<S>,
}

impl<S> Member<S> {
    /// Member from a workload or configured case, resolved immediately
    pub fn new(ident: &'static str, spec: CaseSpec<S>) -> Self {
        Self {
            ident,
            case: spec.resolve(),
        }
    }

    /// Member from a plain workload with default parameters
    pub fn workload(ident: &'static str, func: CaseFn<S>) -> Self {
        Self::new(ident, CaseSpec::Raw(func))
    }

    /// Member from an already-configured case
    pub fn case(ident: &'static str, case: CaseDef<S>) -> Self {
        Self::new(ident, CaseSpec::Configured(case))
    }

    /// Declared identifier
    pub fn ident(&self) -> &'static str {
        self.ident
    }
}

/// The declared members of a suite type
pub trait CaseSet: Sized + 'static {
    /// Suite name used in logs, filters and listings
    fn suite_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Every candidate member, built in declaration order
    fn members() -> Result<Vec<Member<Self>>, ConfigError>;
}

/// Per-case hooks of a suite
///
/// A fresh instance is built with `Default` for every suite run.
pub trait Suite: CaseSet + Default {
    /// Prepare workload state for the next case
    fn set_up(&mut self, _device: &Device) -> anyhow::Result<()> {
        Ok(())
    }

    /// Release workload state after a case
    fn tear_down(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Listing entry for one discovered case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseInfo {
    /// Case name
    pub name: String,
    /// Overrides declared on the case
    pub attr: CaseAttr,
}

impl CaseInfo {
    /// Declared measured iterations, or the built-in default
    pub fn repetitions(&self) -> usize {
        self.attr.repetitions.unwrap_or(DEFAULT_REPETITIONS)
    }

    /// Declared warmup iterations, or the built-in default
    pub fn warmup(&self) -> usize {
        self.attr.warmup.unwrap_or(DEFAULT_WARMUP)
    }
}

/// Everything a suite run needs from its runner
pub struct SuiteContext<'a> {
    /// Device used for synchronization and markers
    pub device: &'a Device,
    /// Run configuration
    pub config: &'a RunConfig,
    /// Destination of report lines
    pub sink: &'a mut dyn syncbench_report::ReportSink,
}

/// Collect the eligible members of `S` in declaration order.
///
/// Members whose identifier lacks [`CASE_PREFIX`] are ignored; the prefix is
/// stripped to form the case name.
pub fn discover_cases<S: CaseSet>() -> Result<Vec<CaseDef<S>>, ConfigError> {
    let mut cases: Vec<CaseDef<S>> = S::members()?
        .into_iter()
        .filter_map(|member| {
            let name = member.ident.strip_prefix(CASE_PREFIX)?;
            Some(member.case.named(name))
        })
        .collect();

    cases.sort_by_key(|case| case.order());
    Ok(cases)
}

/// Describe the cases of `S` without running them
pub fn list_cases<S: CaseSet>() -> Result<Vec<CaseInfo>, ConfigError> {
    Ok(discover_cases::<S>()?
        .into_iter()
        .map(|case| CaseInfo {
            name: case.name().to_string(),
            attr: case.attr(),
        })
        .collect())
}

/// Run every selected case of `S`, emitting one line per case.
///
/// Returns the number of cases run.
pub fn run_suite<S: Suite>(ctx: &mut SuiteContext<'_>) -> Result<usize, BenchError> {
    let suite_name = S::suite_name();
    let config_error = |source| BenchError::Config {
        suite: suite_name.to_string(),
        source,
    };

    // Resolve every plan up front so a bad configuration runs nothing.
    let cases = discover_cases::<S>().map_err(config_error)?;
    let plans = cases
        .iter()
        .map(|case| ctx.config.resolve_for_case(case))
        .collect::<Result<Vec<_>, _>>()
        .map_err(config_error)?;

    info!(
        suite = suite_name,
        cases = cases.len(),
        mode = ?ctx.config.mode,
        device = ctx.device.name(),
        "running suite"
    );

    let mut suite = S::default();
    let mut ran = 0;
    for (case, plan) in cases.iter().zip(plans) {
        if !ctx.config.selects(suite_name, case.name()) {
            debug!(suite = suite_name, case = case.name(), "filtered out");
            continue;
        }

        let result = run_case(&mut suite, case, plan, ctx, suite_name)?;
        ctx.sink
            .emit(&result.format_line(ctx.config.name_width))?;
        ran += 1;
    }

    Ok(ran)
}

fn run_case<S: Suite>(
    suite: &mut S,
    case: &CaseDef<S>,
    plan: CasePlan,
    ctx: &SuiteContext<'_>,
    suite_name: &str,
) -> Result<CaseResult, BenchError> {
    debug!(
        suite = suite_name,
        case = case.name(),
        repetitions = plan.repetitions,
        warmup = plan.warmup,
        "starting case"
    );

    suite
        .set_up(ctx.device)
        .map_err(|source| BenchError::SetUp {
            suite: suite_name.to_string(),
            case: case.name().to_string(),
            source: source.into(),
        })?;

    let func = case.func();
    let samples = run_case_loop(&**ctx.device, ctx.config.mode, plan, || {
        func(&mut *suite)
    })
    .map_err(|source| BenchError::Case {
        suite: suite_name.to_string(),
        case: case.name().to_string(),
        source,
    })?;

    suite.tear_down().map_err(|source| BenchError::TearDown {
        suite: suite_name.to_string(),
        case: case.name().to_string(),
        source: source.into(),
    })?;

    CaseResult::new(case.name(), samples).map_err(|source| BenchError::Record {
        suite: suite_name.to_string(),
        case: case.name().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HostOnly;
    use crate::error::LoopError;
    use crate::timing::TimingMode;

    #[derive(Default)]
    struct Ordered {
        log: Vec<&'static str>,
    }

    impl Ordered {
        fn perf_b(&mut self) -> anyhow::Result<()> {
            self.log.push("b");
            Ok(())
        }

        fn perf_a(&mut self) -> anyhow::Result<()> {
            self.log.push("a");
            Ok(())
        }

        fn helper(&mut self) -> anyhow::Result<()> {
            self.log.push("helper");
            Ok(())
        }
    }

    impl CaseSet for Ordered {
        fn members() -> Result<Vec<Member<Self>>, ConfigError> {
            Ok(vec![
                Member::workload("perf_b", Ordered::perf_b),
                Member::case("perf_a", CaseAttr::new().repetitions(2).wrap(Ordered::perf_a)?),
                Member::workload("helper", Ordered::helper),
            ])
        }
    }

    impl Suite for Ordered {}

    #[derive(Default)]
    struct Lifecycle {
        events: Vec<String>,
        fail_at: Option<usize>,
        measured: usize,
    }

    thread_local! {
        static EVENTS: std::cell::RefCell<Vec<String>> = const { std::cell::RefCell::new(Vec::new()) };
    }

    impl Lifecycle {
        fn perf_work(&mut self) -> anyhow::Result<()> {
            self.measured += 1;
            if Some(self.measured) == self.fail_at {
                anyhow::bail!("workload fault");
            }
            Ok(())
        }
    }

    impl CaseSet for Lifecycle {
        fn members() -> Result<Vec<Member<Self>>, ConfigError> {
            Ok(vec![
                Member::case(
                    "perf_first",
                    CaseAttr::new().repetitions(3).warmup(1).wrap(Lifecycle::perf_work)?,
                ),
                Member::case(
                    "perf_second",
                    CaseAttr::new().repetitions(2).warmup(0).wrap(Lifecycle::perf_work)?,
                ),
            ])
        }
    }

    impl Suite for Lifecycle {
        fn set_up(&mut self, _device: &Device) -> anyhow::Result<()> {
            self.events.push(format!("set_up@{}", self.measured));
            // second case fails on its second call
            if self.measured == 4 {
                self.fail_at = Some(6);
            }
            Ok(())
        }

        fn tear_down(&mut self) -> anyhow::Result<()> {
            self.events.push(format!("tear_down@{}", self.measured));
            let events = self.events.clone();
            EVENTS.with(|e| *e.borrow_mut() = events);
            Ok(())
        }
    }

    fn quick_config() -> RunConfig {
        RunConfig {
            repetitions: Some(1),
            warmup: Some(0),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_discovery_follows_declaration_order() {
        let cases = discover_cases::<Ordered>().unwrap();
        let names: Vec<_> = cases.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(cases[1].repetitions(), 2);
        assert_eq!(cases[0].repetitions(), 10_000);
    }

    #[test]
    fn test_list_cases() {
        let listing = list_cases::<Ordered>().unwrap();
        assert_eq!(listing[1].name, "a");
        assert_eq!(listing[1].attr, CaseAttr::new().repetitions(2));
        assert_eq!(listing[1].repetitions(), 2);
        assert_eq!(listing[1].warmup(), 10);
        assert_eq!(listing[0].repetitions(), 10_000);
    }

    #[test]
    fn test_suite_name_defaults_to_type_name() {
        assert_eq!(Ordered::suite_name(), "Ordered");
    }

    #[test]
    fn test_run_suite_emits_lines_in_order() {
        let device = HostOnly::shared();
        let config = quick_config();
        let mut sink: Vec<String> = Vec::new();
        let mut ctx = SuiteContext {
            device: &device,
            config: &config,
            sink: &mut sink,
        };

        let ran = run_suite::<Ordered>(&mut ctx).unwrap();
        assert_eq!(ran, 2);
        assert_eq!(sink.len(), 2);
        assert!(sink[0].starts_with("b                   : "));
        assert!(sink[1].starts_with("a                   : "));
        assert!(sink.iter().all(|l| l.contains(" us   +/- ")));
    }

    #[test]
    fn test_hooks_wrap_each_case() {
        let device = HostOnly::shared();
        let config = RunConfig::default();
        let mut sink: Vec<String> = Vec::new();
        let mut ctx = SuiteContext {
            device: &device,
            config: &config,
            sink: &mut sink,
        };

        let err = run_suite::<Lifecycle>(&mut ctx).unwrap_err();
        // first case: 1 warmup + 3 measured; second case fails on its 2nd call
        match err {
            BenchError::Case {
                case,
                source: LoopError::Workload { iteration, .. },
                ..
            } => {
                assert_eq!(case, "second");
                assert_eq!(iteration, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sink.len(), 1, "failed case must not be reported");
        assert!(sink[0].starts_with("first"));

        let events = EVENTS.with(|e| e.borrow().clone());
        assert_eq!(events, vec!["set_up@0", "tear_down@4"]);
    }

    #[test]
    fn test_filter_skips_cases() {
        let device = HostOnly::shared();
        let config = RunConfig {
            filter: Some(regex::Regex::new("Ordered/a$").unwrap()),
            ..quick_config()
        };
        let mut sink: Vec<String> = Vec::new();
        let mut ctx = SuiteContext {
            device: &device,
            config: &config,
            sink: &mut sink,
        };

        assert_eq!(run_suite::<Ordered>(&mut ctx).unwrap(), 1);
        assert!(sink[0].starts_with("a "));
    }

    #[test]
    fn test_invalid_global_config_runs_nothing() {
        let device = HostOnly::shared();
        let config = RunConfig {
            repetitions: Some(0),
            ..RunConfig::default()
        };
        let mut sink: Vec<String> = Vec::new();
        let mut ctx = SuiteContext {
            device: &device,
            config: &config,
            sink: &mut sink,
        };

        // `b` has no explicit repetitions and picks up the invalid global value
        let err = run_suite::<Ordered>(&mut ctx).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Config {
                source: ConfigError::NonPositiveRepetitions(0),
                ..
            }
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_dual_mode_line_has_two_series() {
        let device = HostOnly::shared();
        let config = RunConfig {
            mode: TimingMode::Dual,
            ..quick_config()
        };
        let mut sink: Vec<String> = Vec::new();
        let mut ctx = SuiteContext {
            device: &device,
            config: &config,
            sink: &mut sink,
        };

        run_suite::<Ordered>(&mut ctx).unwrap();
        assert_eq!(sink[0].matches("+/-").count(), 2);
        assert!(sink[0].ends_with("    0.000 us   +/- 0.000 us"));
    }
}
