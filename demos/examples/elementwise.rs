//! Elementwise Kernels: tiny vs huge arrays on an asynchronous queue
//!
//! Each case enqueues one kernel and returns without waiting. Host mode
//! drains the queue around every call; `--mode dual` additionally reports
//! the time the queue spent between two markers, separating dispatch cost
//! from execution cost.
//!
//! Run with: cargo run --example elementwise -p syncbench-demos --release -- --mode dual

use std::hint::black_box;

use syncbench::{Device, SimulatedDevice};
use syncbench_demos::{DeviceArray, ElementwiseKernel, SHAPE_HUGE, SHAPE_TINY};

#[derive(Default)]
struct Elementwise {
    arrays: Option<Arrays>,
}

struct Arrays {
    a: DeviceArray,
    b: DeviceArray,
    c: DeviceArray,
    a_huge: DeviceArray,
    b_huge: DeviceArray,
    c_huge: DeviceArray,
}

impl Elementwise {
    fn arrays(&self) -> anyhow::Result<&Arrays> {
        self.arrays
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("arrays not allocated"))
    }
}

#[syncbench::suite]
impl Elementwise {
    fn set_up(&mut self, device: &Device) {
        self.arrays = Some(Arrays {
            a: DeviceArray::ones(device, SHAPE_TINY),
            b: DeviceArray::ones(device, SHAPE_TINY),
            c: DeviceArray::ones(device, SHAPE_TINY),
            a_huge: DeviceArray::ones(device, SHAPE_HUGE),
            b_huge: DeviceArray::ones(device, SHAPE_HUGE),
            c_huge: DeviceArray::ones(device, SHAPE_HUGE),
        });
    }

    fn tear_down(&mut self) {
        self.arrays = None;
    }

    fn perf_sum(&mut self) -> anyhow::Result<()> {
        black_box(self.arrays()?.a.sum()?);
        Ok(())
    }

    #[case(repetitions = 1000)]
    fn perf_sum_huge(&mut self) -> anyhow::Result<()> {
        black_box(self.arrays()?.a_huge.sum()?);
        Ok(())
    }

    fn perf_add(&mut self) -> anyhow::Result<()> {
        let arrays = self.arrays()?;
        black_box(arrays.a.add(&arrays.b)?);
        Ok(())
    }

    fn perf_add_out(&mut self) -> anyhow::Result<()> {
        let arrays = self.arrays()?;
        arrays.a.add_out(&arrays.b, &arrays.c)
    }

    #[case(repetitions = 1000)]
    fn perf_add_out_huge(&mut self) -> anyhow::Result<()> {
        let arrays = self.arrays()?;
        arrays.a_huge.add_out(&arrays.b_huge, &arrays.c_huge)
    }

    // Kernel construction is part of the measured call
    fn perf_userkernel(&mut self) -> anyhow::Result<()> {
        let arrays = self.arrays()?;
        let kernel = ElementwiseKernel::new("test_kernel", |a, b| a + b);
        kernel.launch(&arrays.a, &arrays.b, &arrays.c)
    }

    #[case(n = 1000, n_warmup = 5)]
    fn perf_userkernel_huge(&mut self) -> anyhow::Result<()> {
        let arrays = self.arrays()?;
        let kernel = ElementwiseKernel::new("test_kernel", |a, b| a + b);
        kernel.launch(&arrays.a_huge, &arrays.b_huge, &arrays.c_huge)
    }
}

fn main() -> anyhow::Result<()> {
    syncbench::run_with_device(SimulatedDevice::shared()?)
}
