//! Simulated Accelerator
//!
//! A single in-order queue executed by a dedicated worker thread. Markers are
//! timestamped by the worker when it reaches them, so elapsed time between
//! two markers is device-side time in the same sense as a GPU event pair:
//! it includes queued work and any idle gap between the two records. A
//! workload that only keeps the host busy therefore still shows its duration
//! as device time, whereas [`HostOnly`](crate::HostOnly) reports zero.
//!
//! Used by the test suite and the demos as a real asynchronous device.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use crate::device::{Accelerator, Device, Marker, Work};
use crate::error::{DeviceError, panic_message};

enum Command {
    Run(Work),
    Reach { id: u64, position: u64 },
}

#[derive(Debug, Default)]
struct MarkerState {
    position: Option<u64>,
    reached_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct QueueState {
    submitted: u64,
    completed: u64,
    markers: HashMap<u64, MarkerState>,
    lost: Option<String>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<QueueState>,
    progress: Condvar,
}

/// Thread-backed asynchronous device
pub struct SimulatedDevice {
    name: String,
    shared: Arc<Shared>,
    sender: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
    next_marker: AtomicU64,
}

impl SimulatedDevice {
    /// Start the device worker thread
    pub fn new() -> Result<Self, DeviceError> {
        Self::with_name("sim0")
    }

    /// Start a device with a custom name
    pub fn with_name(name: impl Into<String>) -> Result<Self, DeviceError> {
        let name = name.into();
        let shared = Arc::new(Shared::default());
        let (sender, receiver) = crossbeam_channel::unbounded();
        let worker = {
            let shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name(format!("syncbench-{name}-queue"))
                .spawn(move || worker_loop(shared, receiver))
                .map_err(|e| DeviceError::Lost(e.to_string()))?
        };
        Ok(Self {
            name,
            shared,
            sender: Some(sender),
            worker: Some(worker),
            next_marker: AtomicU64::new(0),
        })
    }

    /// Start a device behind a shared [`Device`] handle
    pub fn shared() -> Result<Device, DeviceError> {
        Ok(Arc::new(Self::new()?))
    }

    /// Markers created and not yet released
    pub fn live_markers(&self) -> usize {
        self.shared.state.lock().markers.len()
    }

    /// Queue entries submitted but not yet completed
    pub fn pending(&self) -> u64 {
        let state = self.shared.state.lock();
        state.submitted - state.completed
    }

    fn submit(&self, state: &mut QueueState, command: Command) -> Result<u64, DeviceError> {
        if let Some(reason) = &state.lost {
            return Err(DeviceError::Lost(reason.clone()));
        }
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| DeviceError::Lost("queue closed".to_string()))?;
        state.submitted += 1;
        sender
            .send(command)
            .map_err(|_| DeviceError::Lost("queue worker exited".to_string()))?;
        Ok(state.submitted)
    }
}

impl Accelerator for SimulatedDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn enqueue(&self, work: Work) -> Result<(), DeviceError> {
        let mut state = self.shared.state.lock();
        self.submit(&mut state, Command::Run(work))?;
        Ok(())
    }

    fn create_marker(&self) -> Result<Marker, DeviceError> {
        let id = self.next_marker.fetch_add(1, Ordering::Relaxed);
        self.shared
            .state
            .lock()
            .markers
            .insert(id, MarkerState::default());
        Ok(Marker::from_raw(id))
    }

    fn record_marker(&self, marker: Marker) -> Result<(), DeviceError> {
        let mut state = self.shared.state.lock();
        if !state.markers.contains_key(&marker.id()) {
            return Err(DeviceError::UnknownMarker(marker));
        }
        let position = state.submitted + 1;
        self.submit(
            &mut state,
            Command::Reach {
                id: marker.id(),
                position,
            },
        )?;
        if let Some(entry) = state.markers.get_mut(&marker.id()) {
            entry.position = Some(position);
            entry.reached_at = None;
        }
        Ok(())
    }

    fn wait_for_marker(&self, marker: Marker) -> Result<(), DeviceError> {
        let mut state = self.shared.state.lock();
        let position = state
            .markers
            .get(&marker.id())
            .ok_or(DeviceError::UnknownMarker(marker))?
            .position
            .ok_or(DeviceError::NotRecorded(marker))?;
        while state.completed < position && state.lost.is_none() {
            self.shared.progress.wait(&mut state);
        }
        match &state.lost {
            Some(reason) => Err(DeviceError::Lost(reason.clone())),
            None => Ok(()),
        }
    }

    fn drain(&self) -> Result<(), DeviceError> {
        let mut state = self.shared.state.lock();
        let target = state.submitted;
        while state.completed < target && state.lost.is_none() {
            self.shared.progress.wait(&mut state);
        }
        match &state.lost {
            Some(reason) => Err(DeviceError::Lost(reason.clone())),
            None => Ok(()),
        }
    }

    fn elapsed_between(&self, start: Marker, end: Marker) -> Result<Duration, DeviceError> {
        let state = self.shared.state.lock();
        let reached = |marker: Marker| -> Result<Instant, DeviceError> {
            let entry = state
                .markers
                .get(&marker.id())
                .ok_or(DeviceError::UnknownMarker(marker))?;
            if entry.position.is_none() {
                return Err(DeviceError::NotRecorded(marker));
            }
            entry.reached_at.ok_or(DeviceError::NotReached(marker))
        };
        let start_at = reached(start)?;
        let end_at = reached(end)?;
        Ok(end_at.saturating_duration_since(start_at))
    }

    fn release_marker(&self, marker: Marker) -> Result<(), DeviceError> {
        // A pending Reach for this id finds no entry and only advances the queue.
        self.shared
            .state
            .lock()
            .markers
            .remove(&marker.id())
            .map(|_| ())
            .ok_or(DeviceError::UnknownMarker(marker))
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop once the queue is empty.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: Arc<Shared>, receiver: Receiver<Command>) {
    for command in receiver.iter() {
        match command {
            Command::Run(work) => {
                let outcome = panic::catch_unwind(AssertUnwindSafe(work));
                let mut state = shared.state.lock();
                if let Err(payload) = outcome {
                    if state.lost.is_none() {
                        state.lost = Some(panic_message(payload.as_ref()));
                    }
                }
                state.completed += 1;
            }
            Command::Reach { id, position } => {
                let now = Instant::now();
                let mut state = shared.state.lock();
                if let Some(entry) = state.markers.get_mut(&id) {
                    if entry.position == Some(position) {
                        entry.reached_at = Some(now);
                    }
                }
                state.completed += 1;
            }
        }
        shared.progress.notify_all();
    }
}
