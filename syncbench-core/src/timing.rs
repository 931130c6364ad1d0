//! Timing Protocol
//!
//! Warmup, then exactly `repetitions` measured calls. Two modes reconcile
//! host wall-clock time with the device's asynchronous queue:
//!
//! ```text
//! Host:  drain ─ start ─ workload ─ stop ─ drain              → host[i]
//! Dual:  record A ─ start ─ workload ─ stop ─ record B ─ wait B → host[i], device[i] = B - A
//! ```
//!
//! In host mode the leading drain keeps leftover work of the previous call
//! out of the interval and the trailing drain guarantees nothing the call
//! enqueued is still running when the next iteration starts. In dual mode
//! the host interval covers dispatch cost only, and the marker pair covers
//! what the device executed between the two records.

use serde::{Deserialize, Serialize};
use syncbench_report::Samples;

use crate::device::{Accelerator, Marker};
use crate::error::{LoopError, Phase};
use crate::measure::Timer;

/// How each measured iteration is timed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimingMode {
    /// Host wall-clock between two full device barriers
    #[default]
    Host,
    /// Host wall-clock plus device-elapsed time between two markers
    Dual,
}

impl std::str::FromStr for TimingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "host" | "cpu" => Ok(TimingMode::Host),
            "dual" | "device" | "gpu" => Ok(TimingMode::Dual),
            other => Err(format!("Unknown timing mode: {}", other)),
        }
    }
}

/// Resolved iteration counts for one case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CasePlan {
    /// Measured iterations (always positive)
    pub repetitions: usize,
    /// Discarded warmup iterations
    pub warmup: usize,
}

/// Run warmup and measurement for one workload.
///
/// Any workload or device error aborts the loop; samples collected so far
/// are dropped with it.
pub fn run_case_loop<F>(
    device: &dyn Accelerator,
    mode: TimingMode,
    plan: CasePlan,
    mut workload: F,
) -> Result<Samples, LoopError>
where
    F: FnMut() -> anyhow::Result<()>,
{
    debug_assert!(plan.repetitions > 0, "plans are validated before running");

    for iteration in 0..plan.warmup {
        call(&mut workload, Phase::Warmup, iteration)?;
    }
    // Warmup may leave work queued; it must not spill into the first sample.
    device.drain()?;

    match mode {
        TimingMode::Host => measure_host(device, plan.repetitions, workload),
        TimingMode::Dual => measure_dual(device, plan.repetitions, workload),
    }
}

fn measure_host<F>(
    device: &dyn Accelerator,
    repetitions: usize,
    mut workload: F,
) -> Result<Samples, LoopError>
where
    F: FnMut() -> anyhow::Result<()>,
{
    let mut host = Vec::with_capacity(repetitions);

    for iteration in 0..repetitions {
        device.drain()?;
        let timer = Timer::start();

        call(&mut workload, Phase::Measure, iteration)?;

        let elapsed = timer.stop();
        device.drain()?;
        host.push(elapsed.as_secs_f64());
    }

    Ok(Samples::Host(host))
}

fn measure_dual<F>(
    device: &dyn Accelerator,
    repetitions: usize,
    mut workload: F,
) -> Result<Samples, LoopError>
where
    F: FnMut() -> anyhow::Result<()>,
{
    let start = device.create_marker()?;
    let end = match device.create_marker() {
        Ok(end) => end,
        Err(e) => {
            let _ = device.release_marker(start);
            return Err(e.into());
        }
    };

    let outcome = dual_iterations(device, start, end, repetitions, &mut workload);
    let released = device
        .release_marker(start)
        .and(device.release_marker(end));
    let samples = outcome?;
    released?;
    Ok(samples)
}

fn dual_iterations<F>(
    device: &dyn Accelerator,
    start: Marker,
    end: Marker,
    repetitions: usize,
    workload: &mut F,
) -> Result<Samples, LoopError>
where
    F: FnMut() -> anyhow::Result<()>,
{
    let mut host = Vec::with_capacity(repetitions);
    let mut elapsed_device = Vec::with_capacity(repetitions);

    for iteration in 0..repetitions {
        device.record_marker(start)?;
        let timer = Timer::start();

        call(workload, Phase::Measure, iteration)?;

        let elapsed = timer.stop();
        device.record_marker(end)?;
        device.wait_for_marker(end)?;

        host.push(elapsed.as_secs_f64());
        elapsed_device.push(device.elapsed_between(start, end)?.as_secs_f64());
    }

    Ok(Samples::Dual {
        host,
        device: elapsed_device,
    })
}

#[inline]
fn call<F>(workload: &mut F, phase: Phase, iteration: usize) -> Result<(), LoopError>
where
    F: FnMut() -> anyhow::Result<()>,
{
    workload().map_err(|source| LoopError::Workload {
        phase,
        iteration,
        source: source.into(),
    })
}
