//! Accelerator Capability
//!
//! The harness treats the device as an opaque asynchronous queue. It needs
//! exactly five things from it: create a timeline marker, record it, block
//! until it is reached, drain the whole queue, and read the device time
//! between two reached markers. `enqueue` is what workloads use to put work
//! on the queue; the harness itself never calls it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::DeviceError;

/// A unit of device work
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Shared handle to the accelerator a run measures against
pub type Device = Arc<dyn Accelerator>;

/// Opaque timeline marker handle, only meaningful to the device that made it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Marker(u64);

impl Marker {
    /// Wrap a device-assigned identifier
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Device-assigned identifier
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Asynchronous execution queue with timeline markers.
///
/// Blocking calls (`wait_for_marker`, `drain`) are the only points at which
/// the harness yields to the device.
pub trait Accelerator: Send + Sync {
    /// Human-readable device name
    fn name(&self) -> &str;

    /// Queue `work` for asynchronous execution
    fn enqueue(&self, work: Work) -> Result<(), DeviceError>;

    /// Allocate a new, unrecorded marker
    fn create_marker(&self) -> Result<Marker, DeviceError>;

    /// Place `marker` at the current end of the queue
    fn record_marker(&self, marker: Marker) -> Result<(), DeviceError>;

    /// Block until the device has reached `marker`
    fn wait_for_marker(&self, marker: Marker) -> Result<(), DeviceError>;

    /// Block until all queued work has completed
    fn drain(&self) -> Result<(), DeviceError>;

    /// Device time between two reached markers
    fn elapsed_between(&self, start: Marker, end: Marker) -> Result<Duration, DeviceError>;

    /// Free a marker that will not be used again
    fn release_marker(&self, _marker: Marker) -> Result<(), DeviceError> {
        Ok(())
    }
}

/// Host-only stand-in for benchmarking CPU code.
///
/// Work runs inline on the calling thread, synchronization is a no-op and
/// device-elapsed time is always zero.
#[derive(Debug, Default)]
pub struct HostOnly {
    next_marker: AtomicU64,
}

impl HostOnly {
    /// Create the stub
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the stub behind a shared [`Device`] handle
    pub fn shared() -> Device {
        Arc::new(Self::new())
    }

    fn check(&self, marker: Marker) -> Result<(), DeviceError> {
        if marker.id() < self.next_marker.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(DeviceError::UnknownMarker(marker))
        }
    }
}

impl Accelerator for HostOnly {
    fn name(&self) -> &str {
        "host"
    }

    fn enqueue(&self, work: Work) -> Result<(), DeviceError> {
        work();
        Ok(())
    }

    fn create_marker(&self) -> Result<Marker, DeviceError> {
        Ok(Marker(self.next_marker.fetch_add(1, Ordering::Relaxed)))
    }

    fn record_marker(&self, marker: Marker) -> Result<(), DeviceError> {
        self.check(marker)
    }

    fn wait_for_marker(&self, marker: Marker) -> Result<(), DeviceError> {
        self.check(marker)
    }

    fn drain(&self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn elapsed_between(&self, start: Marker, end: Marker) -> Result<Duration, DeviceError> {
        self.check(start)?;
        self.check(end)?;
        Ok(Duration::ZERO)
    }
}
