//! Integration tests for SyncBench
//!
//! These tests verify the end-to-end behavior of suite declaration,
//! discovery, timing and reporting. Suites here are not registered; each
//! test runs them explicitly through `SuiteDef::of`.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use regex::Regex;
use syncbench::{
    BenchError, CaseAttr, CaseFn, CaseSet, ConfigError, Device, FailurePolicy, LoopError, Member,
    Phase, RunConfig, Runner, SimulatedDevice, Suite, SuiteDef, TimingMode, discover_cases,
    list_cases,
};

/// Parse a report line into (name, host mean, host std, optional device pair)
fn parse_line(line: &str) -> (String, f64, f64, Option<(f64, f64)>) {
    let re = Regex::new(
        r"^(\S+) *: (\d+\.\d{3}) us   \+/- (\d+\.\d{3}) us(?:    (\d+\.\d{3}) us   \+/- (\d+\.\d{3}) us)?$",
    )
    .unwrap();
    let caps = re
        .captures(line)
        .unwrap_or_else(|| panic!("malformed report line: {line:?}"));
    let num = |i: usize| caps[i].parse::<f64>().unwrap();
    let device = caps.get(4).map(|_| (num(4), num(5)));
    (caps[1].to_string(), num(2), num(3), device)
}

fn run(def: SuiteDef, config: RunConfig) -> (Result<syncbench::RunSummary, BenchError>, Vec<String>) {
    let mut sink: Vec<String> = Vec::new();
    let result = Runner::new(config).run_suites(&[&def], &mut sink);
    (result, sink)
}

fn run_on(
    def: SuiteDef,
    config: RunConfig,
    device: Device,
) -> (Result<syncbench::RunSummary, BenchError>, Vec<String>) {
    let mut sink: Vec<String> = Vec::new();
    let result = Runner::new(config)
        .with_device(device)
        .run_suites(&[&def], &mut sink);
    (result, sink)
}

fn quick() -> RunConfig {
    RunConfig {
        repetitions: Some(3),
        warmup: Some(0),
        ..RunConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Declared;

#[syncbench::suite(register = false)]
impl Declared {
    fn perf_b(&mut self) {}

    fn helper(&mut self) -> usize {
        42
    }

    #[case(repetitions = 2)]
    fn perf_a(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    // configured, but not a case
    #[case(n = 3)]
    fn configured_helper(&mut self) {}

    fn perf_io(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Cases run in declaration order, not alphabetical order
#[test]
fn test_discovery_in_declaration_order() {
    let names: Vec<_> = discover_cases::<Declared>()
        .unwrap()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(names, vec!["b", "a", "io"]);
    assert_eq!(Declared::suite_name(), "Declared");

    let (result, lines) = run(SuiteDef::of::<Declared>(), quick());
    let summary = result.unwrap();
    assert_eq!(summary.cases_run, 3);
    let reported: Vec<_> = lines.iter().map(|l| parse_line(l).0).collect();
    assert_eq!(reported, vec!["b", "a", "io"]);
    // helper methods are untouched
    assert_eq!(Declared.helper(), 42);
}

/// Names are padded to the configured width
#[test]
fn test_report_line_layout() {
    let (result, lines) = run(SuiteDef::of::<Declared>(), quick());
    result.unwrap();
    assert!(lines[0].starts_with("b                   : "));
    assert_eq!(lines[0].find(':'), Some(20));

    let config = RunConfig {
        name_width: 4,
        ..quick()
    };
    let (_, lines) = run(SuiteDef::of::<Declared>(), config);
    assert!(lines[0].starts_with("b   : "));
}

// ---------------------------------------------------------------------------
// Iteration counts
// ---------------------------------------------------------------------------

static COUNTED_CALLS: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
struct Counted;

#[syncbench::suite(register = false)]
impl Counted {
    #[case(repetitions = 5, warmup = 3)]
    fn perf_count(&mut self) {
        COUNTED_CALLS.fetch_add(1, Ordering::SeqCst);
    }
}

/// Warmup calls happen but are not recorded
#[test]
fn test_warmup_plus_repetitions_calls() {
    let (result, lines) = run(SuiteDef::of::<Counted>(), RunConfig::default());
    result.unwrap();
    assert_eq!(COUNTED_CALLS.load(Ordering::SeqCst), 8);
    assert_eq!(lines.len(), 1);

    let (name, mean, std, device) = parse_line(&lines[0]);
    assert_eq!(name, "count");
    assert!(mean >= 0.0);
    assert!(std >= 0.0);
    assert!(device.is_none());
}

#[derive(Default)]
struct Stacked;

#[syncbench::suite(register = false)]
impl Stacked {
    #[case(n = 4)]
    #[case(n_warmup = 0)]
    fn perf_partial(&mut self) {}

    #[case(repetitions = 4, warmup = 1)]
    #[case(repetitions = 6)]
    fn perf_overridden(&mut self) {}
}

/// Repeated overrides accumulate and the last writer wins
#[test]
fn test_case_attributes_accumulate() {
    let listing = list_cases::<Stacked>().unwrap();
    assert_eq!((listing[0].repetitions(), listing[0].warmup()), (4, 0));
    assert_eq!((listing[1].repetitions(), listing[1].warmup()), (6, 1));
}

#[derive(Default)]
struct Manual;

impl Manual {
    fn perf_work(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl CaseSet for Manual {
    fn members() -> Result<Vec<Member<Self>>, ConfigError> {
        let base = CaseAttr::new().warmup(0).wrap(Manual::perf_work)?;
        let layered = CaseAttr::new().repetitions(5).apply(base)?;
        Ok(vec![Member::case("perf_work", layered)])
    }
}

impl Suite for Manual {}

/// Runtime overrides layer onto an existing case
#[test]
fn test_runtime_attr_layering() {
    let cases = discover_cases::<Manual>().unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].repetitions(), 5);
    assert_eq!(cases[0].warmup(), 0);

    let attr = CaseAttr::from_fields([("n", 2), ("n_warmup", 1)]).unwrap();
    let case = attr.apply(cases[0].clone()).unwrap();
    assert_eq!((case.repetitions(), case.warmup()), (2, 1));
    assert_eq!(case.order(), cases[0].order());

    let err = CaseAttr::from_fields([("iterations", 2)]).unwrap_err();
    assert_eq!(err, ConfigError::UnknownField("iterations".to_string()));

    let raw: CaseFn<Manual> = Manual::perf_work;
    assert!(CaseAttr::new().repetitions(0).wrap(raw).is_err());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

static FLAKY_CALLS: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
struct Flaky;

#[syncbench::suite(register = false)]
impl Flaky {
    #[case(repetitions = 10, warmup = 2)]
    fn perf_flaky(&mut self) -> anyhow::Result<()> {
        let n = FLAKY_CALLS.fetch_add(1, Ordering::SeqCst) + 1;
        if n == 2 + 3 {
            anyhow::bail!("launch failed");
        }
        Ok(())
    }

    fn perf_never(&mut self) {}
}

/// A failing measured iteration aborts the run with no report line
#[test]
fn test_error_in_measured_iteration() {
    let (result, lines) = run(SuiteDef::of::<Flaky>(), RunConfig::default());
    let err = result.unwrap_err();

    match &err {
        BenchError::Case {
            suite,
            case,
            source:
                LoopError::Workload {
                    phase, iteration, ..
                },
        } => {
            assert_eq!(suite, "Flaky");
            assert_eq!(case, "flaky");
            assert_eq!(*phase, Phase::Measure);
            assert_eq!(*iteration, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        err.to_string(),
        "`Flaky/flaky` measured iteration 2 failed: launch failed"
    );
    assert!(lines.is_empty());
    assert_eq!(FLAKY_CALLS.load(Ordering::SeqCst), 5);
}

#[derive(Default)]
struct Broken;

#[syncbench::suite(register = false)]
impl Broken {
    fn perf_broken(&mut self) -> anyhow::Result<()> {
        anyhow::bail!("out of device memory")
    }
}

/// Skip-suite keeps going after a failing suite
#[test]
fn test_skip_suite_policy() {
    let config = RunConfig {
        on_failure: FailurePolicy::SkipSuite,
        ..quick()
    };
    let broken = SuiteDef::of::<Broken>();
    let declared = SuiteDef::of::<Declared>();
    let mut sink: Vec<String> = Vec::new();

    let summary = Runner::new(config)
        .run_suites(&[&broken, &declared], &mut sink)
        .unwrap();
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].suite(), Some("Broken"));
    assert_eq!(summary.suites_run, 1);
    assert_eq!(sink.len(), 3);
}

// ---------------------------------------------------------------------------
// Hooks and devices
// ---------------------------------------------------------------------------

static BAD_SETUP_CALLS: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
struct BadSetUp;

#[syncbench::suite(register = false)]
impl BadSetUp {
    fn set_up(&mut self, _device: &Device) -> anyhow::Result<()> {
        anyhow::bail!("alloc failed")
    }

    fn perf_x(&mut self) {
        BAD_SETUP_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    fn perf_y(&mut self) {
        BAD_SETUP_CALLS.fetch_add(1, Ordering::SeqCst);
    }
}

/// A failing set_up aborts the suite before the workload runs
#[test]
fn test_set_up_error_aborts_suite() {
    let (result, lines) = run(SuiteDef::of::<BadSetUp>(), quick());
    let err = result.unwrap_err();

    assert!(
        matches!(&err, BenchError::SetUp { suite, case, .. } if suite == "BadSetUp" && case == "x"),
        "unexpected error: {err}"
    );
    assert_eq!(err.to_string(), "`BadSetUp/x` set_up failed: alloc failed");
    assert!(lines.is_empty());
    assert_eq!(BAD_SETUP_CALLS.load(Ordering::SeqCst), 0);
}

static BAD_TEAR_DOWN_CALLS: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
struct BadTearDown;

#[syncbench::suite(register = false)]
impl BadTearDown {
    fn tear_down(&mut self) -> anyhow::Result<()> {
        anyhow::bail!("free failed")
    }

    fn perf_x(&mut self) {
        BAD_TEAR_DOWN_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    fn perf_y(&mut self) {
        BAD_TEAR_DOWN_CALLS.fetch_add(1, Ordering::SeqCst);
    }
}

/// A failing tear_down drops the measured case and stops the suite
#[test]
fn test_tear_down_error_aborts_suite() {
    let (result, lines) = run(SuiteDef::of::<BadTearDown>(), quick());
    let err = result.unwrap_err();

    assert!(
        matches!(&err, BenchError::TearDown { suite, case, .. } if suite == "BadTearDown" && case == "x"),
        "unexpected error: {err}"
    );
    assert_eq!(err.to_string(), "`BadTearDown/x` tear_down failed: free failed");
    assert!(lines.is_empty());
    // only the first case ran its three measured iterations
    assert_eq!(BAD_TEAR_DOWN_CALLS.load(Ordering::SeqCst), 3);
}

static HOOK_LOG: Mutex<Vec<String>> = Mutex::new(Vec::new());

#[derive(Default)]
struct Kernels {
    device: Option<Device>,
}

#[syncbench::suite(register = false)]
impl Kernels {
    fn set_up(&mut self, device: &Device) {
        HOOK_LOG.lock().unwrap().push(format!("set_up:{}", device.name()));
        self.device = Some(device.clone());
    }

    fn tear_down(&mut self) -> anyhow::Result<()> {
        HOOK_LOG.lock().unwrap().push("tear_down".to_string());
        Ok(())
    }

    #[case(repetitions = 4, warmup = 1)]
    fn perf_kernel(&mut self) -> anyhow::Result<()> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("set_up did not run"))?;
        device.enqueue(Box::new(|| std::thread::sleep(Duration::from_millis(2))))?;
        Ok(())
    }

    #[case(repetitions = 2, warmup = 0)]
    fn perf_launch_only(&mut self) {}
}

/// Dual mode reports a device series next to the host series
#[test]
fn test_dual_mode_on_simulated_device() {
    let config = RunConfig {
        mode: TimingMode::Dual,
        ..RunConfig::default()
    };
    let device = SimulatedDevice::shared().unwrap();
    let (result, lines) = run_on(SuiteDef::of::<Kernels>(), config, device);
    result.unwrap();
    assert_eq!(lines.len(), 2);

    let (name, host_mean, _, device) = parse_line(&lines[0]);
    assert_eq!(name, "kernel");
    let (device_mean, _) = device.unwrap();
    assert!(device_mean >= 2000.0, "device mean {device_mean} us");
    assert!(host_mean < device_mean);

    let (name, _, _, device) = parse_line(&lines[1]);
    assert_eq!(name, "launch_only");
    assert!(device.is_some());

    let log = HOOK_LOG.lock().unwrap().clone();
    assert_eq!(log, vec!["set_up:sim0", "tear_down", "set_up:sim0", "tear_down"]);
}

static HOST_KERNEL_SEEN: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
struct HostKernels {
    device: Option<Device>,
}

#[syncbench::suite(register = false)]
impl HostKernels {
    fn set_up(&mut self, device: &Device) {
        self.device = Some(device.clone());
    }

    #[case(repetitions = 3, warmup = 0)]
    fn perf_kernel(&mut self) -> anyhow::Result<()> {
        if let Some(device) = &self.device {
            device.enqueue(Box::new(|| {
                std::thread::sleep(Duration::from_millis(2));
                HOST_KERNEL_SEEN.fetch_add(1, Ordering::SeqCst);
            }))?;
        }
        Ok(())
    }
}

/// Host mode drains the queue around every call, so each kernel completes
/// within its own iteration
#[test]
fn test_host_mode_includes_device_work() {
    let device = SimulatedDevice::shared().unwrap();
    let (result, lines) = run_on(SuiteDef::of::<HostKernels>(), RunConfig::default(), device);
    result.unwrap();

    let (_, host_mean, _, device) = parse_line(&lines[0]);
    assert!(device.is_none());
    // the timer stops before the trailing drain; the call itself only enqueues
    assert!(host_mean < 2000.0);
    assert_eq!(HOST_KERNEL_SEEN.load(Ordering::SeqCst), 3);
}
