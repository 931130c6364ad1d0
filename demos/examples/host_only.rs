//! Host-Only Benchmarks: CPU work with no accelerator
//!
//! Without a device every barrier is a no-op and device-elapsed time is
//! zero, so `--mode dual` reports `0.000 us` in the second column.
//!
//! Run with: cargo run --example host_only -p syncbench-demos --release

use std::hint::black_box;

#[derive(Default)]
struct Collections {
    data: Vec<u32>,
}

#[syncbench::suite(name = "collections")]
impl Collections {
    fn set_up(&mut self) {
        self.data = (0..10_000).rev().collect();
    }

    fn perf_sum(&mut self) {
        black_box(self.data.iter().map(|&x| x as u64).sum::<u64>());
    }

    // set_up runs once per case, so each call after the first sorts sorted input
    #[case(repetitions = 200, warmup = 1)]
    fn perf_sort(&mut self) {
        self.data.sort_unstable();
        black_box(self.data.len());
    }

    #[case(repetitions = 500)]
    fn perf_format(&mut self) -> std::fmt::Result {
        use std::fmt::Write;
        let mut out = String::new();
        for x in self.data.iter().take(100) {
            write!(out, "{x},")?;
        }
        black_box(out);
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    syncbench::run()
}
