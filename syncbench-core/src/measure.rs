//! Host Timing
//!
//! Wall-clock timer for the host side of a measurement, backed by the
//! monotonic `std::time::Instant`.

use std::time::{Duration, Instant};

/// Timer for one measured call
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed host time since `start`
    #[inline(always)]
    pub fn stop(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Set CPU affinity to pin the current thread to a specific core
///
/// Keeps the measuring thread off core migrations for steadier timings.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<(), std::io::Error> {
    use std::mem::MaybeUninit;

    if cpu >= libc::CPU_SETSIZE as usize {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("cpu {} is outside the affinity set", cpu),
        ));
    }

    // SAFETY: `cpu_set_t` is plain data; zeroed is a valid empty set and the
    // pointer handed to sched_setaffinity lives for the duration of the call.
    unsafe {
        let mut set = MaybeUninit::<libc::cpu_set_t>::zeroed();
        let set_ref = set.assume_init_mut();

        libc::CPU_ZERO(set_ref);
        libc::CPU_SET(cpu, set_ref);

        let result = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), set_ref);

        if result == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }
}

/// CPU pinning is only supported on Linux; elsewhere this is a no-op
#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> Result<(), std::io::Error> {
    Ok(())
}
