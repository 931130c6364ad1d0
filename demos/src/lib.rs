//! SyncBench Demos
//!
//! Runnable demonstrations of SyncBench. This crate is not published; it
//! hosts the examples plus a toy device-array library they benchmark.
//!
//! Run any example with:
//! ```sh
//! cargo run --example <name> -p syncbench-demos --release
//! ```
//!
//! | Example | Scenario |
//! |---------|----------|
//! | `elementwise` | Reductions and elementwise kernels on the simulated device, tiny vs huge arrays |
//! | `host_only` | CPU-only suite on the host-only device |

use std::sync::Arc;

use parking_lot::Mutex;
use syncbench::Device;

/// Shape of the small arrays
pub const SHAPE_TINY: (usize, usize) = (2, 3);

/// Shape of the large arrays
pub const SHAPE_HUGE: (usize, usize) = (2000, 300);

/// A float32 array resident on a device
///
/// Element data sits behind a lock shared with the device queue, so kernels
/// run on the queue worker while the host keeps a handle.
#[derive(Clone)]
pub struct DeviceArray {
    device: Device,
    data: Arc<Mutex<Vec<f32>>>,
}

impl DeviceArray {
    /// Array of `shape` filled with ones
    pub fn ones(device: &Device, shape: (usize, usize)) -> Self {
        Self::filled(device, shape.0 * shape.1, 1.0)
    }

    fn filled(device: &Device, len: usize, value: f32) -> Self {
        Self {
            device: Arc::clone(device),
            data: Arc::new(Mutex::new(vec![value; len])),
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// True when the array has no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the elements back to the host, waiting for queued kernels first
    pub fn to_host(&self) -> anyhow::Result<Vec<f32>> {
        self.device.drain()?;
        Ok(self.data.lock().clone())
    }

    /// Enqueue a reduction; the result is a one-element array
    pub fn sum(&self) -> anyhow::Result<DeviceArray> {
        let out = Self::filled(&self.device, 1, 0.0);
        let (src, dst) = (Arc::clone(&self.data), Arc::clone(&out.data));
        self.device.enqueue(Box::new(move || {
            let total: f32 = src.lock().iter().sum();
            dst.lock()[0] = total;
        }))?;
        Ok(out)
    }

    /// Enqueue `self + other` into a freshly allocated array
    pub fn add(&self, other: &DeviceArray) -> anyhow::Result<DeviceArray> {
        let out = Self::filled(&self.device, self.len(), 0.0);
        self.add_out(other, &out)?;
        Ok(out)
    }

    /// Enqueue `self + other` into `out`
    pub fn add_out(&self, other: &DeviceArray, out: &DeviceArray) -> anyhow::Result<()> {
        ElementwiseKernel::new("add", |a, b| a + b).launch(self, other, out)
    }
}

/// A user-defined binary elementwise kernel
pub struct ElementwiseKernel {
    name: &'static str,
    op: fn(f32, f32) -> f32,
}

impl ElementwiseKernel {
    /// Kernel applying `op` to each pair of elements
    pub fn new(name: &'static str, op: fn(f32, f32) -> f32) -> Self {
        Self { name, op }
    }

    /// Kernel name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Enqueue `out[i] = op(a[i], b[i])`
    pub fn launch(&self, a: &DeviceArray, b: &DeviceArray, out: &DeviceArray) -> anyhow::Result<()> {
        let len = a.len();
        if b.len() != len || out.len() != len {
            anyhow::bail!(
                "kernel `{}`: shape mismatch ({} / {} / {})",
                self.name,
                len,
                b.len(),
                out.len()
            );
        }

        let op = self.op;
        let (a, b, out_data) = (
            Arc::clone(&a.data),
            Arc::clone(&b.data),
            Arc::clone(&out.data),
        );
        out.device.enqueue(Box::new(move || {
            // operands may alias the output
            let lhs = a.lock().clone();
            let rhs = b.lock().clone();
            let mut dst = out_data.lock();
            for ((d, x), y) in dst.iter_mut().zip(lhs).zip(rhs) {
                *d = op(x, y);
            }
        }))?;
        Ok(())
    }
}
