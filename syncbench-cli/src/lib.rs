#![warn(missing_docs)]
//! SyncBench CLI Library
//!
//! This module provides the CLI infrastructure for benchmark binaries.
//! Use `syncbench::run()` (or `syncbench_cli::run()`) in your main function to run
//! every registered suite with command-line and `syncbench.toml` settings.
//!
//! # Example
//!
//! ```ignore
//! #[derive(Default)]
//! struct Elementwise;
//!
//! #[syncbench::suite]
//! impl Elementwise {
//!     fn perf_sum(&mut self) { ... }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     syncbench::run()
//! }
//! ```

mod config;

pub use config::*;

use clap::{Parser, Subcommand};
use regex::Regex;
use std::path::PathBuf;
use syncbench_core::{
    Device, FailurePolicy, RunConfig, Runner, SuiteDef, TimingMode, list_suites, registered_suites,
};
use syncbench_report::StdoutSink;
use tracing_subscriber::EnvFilter;

/// SyncBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "syncbench")]
#[command(author, version, about = "SyncBench - accelerator microbenchmark harness")]
pub struct Cli {
    /// Optional subcommand (List, Run, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Only run cases whose `suite/case` path matches this regex
    pub filter: Option<String>,

    /// Timing mode: host or dual
    #[arg(long)]
    pub mode: Option<TimingMode>,

    /// Measured iterations for cases without their own value
    #[arg(long, short = 'n')]
    pub repetitions: Option<usize>,

    /// Warmup iterations for cases without their own value
    #[arg(long)]
    pub warmup: Option<usize>,

    /// On suite failure: abort or skip-suite
    #[arg(long)]
    pub on_failure: Option<FailurePolicy>,

    /// Device backing the run: host-only or simulated
    #[arg(long)]
    pub device: Option<DeviceKind>,

    /// Pin the measuring thread to this core
    #[arg(long)]
    pub pin_cpu: Option<usize>,

    /// Column width of case names
    #[arg(long)]
    pub name_width: Option<usize>,

    /// Configuration file (default: discover syncbench.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Internal: Absorb cargo bench's --bench flag
    #[arg(long, hide = true)]
    pub bench: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all discovered suites and cases
    List,
    /// Run suites (default)
    Run,
    /// Print a default syncbench.toml
    Init,
}

/// Run the SyncBench CLI with the given arguments.
/// This is the main entry point for benchmark binaries.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli, None)
}

/// Run the SyncBench CLI against a caller-provided device.
///
/// The device replaces whatever `--device` or `syncbench.toml` select.
pub fn run_with_device(device: Device) -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli, Some(device))
}

/// Run the SyncBench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli, device: Option<Device>) -> anyhow::Result<()> {
    init_logging(cli.verbose);

    if let Some(Commands::Init) = cli.command {
        print!("{}", SyncConfig::default_toml());
        return Ok(());
    }

    // Discover syncbench.toml configuration (CLI flags override)
    let file_config = match &cli.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::discover()?.unwrap_or_default(),
    };
    let run_config = build_run_config(&cli, &file_config)?;

    match cli.command {
        Some(Commands::List) => list(&run_config),
        Some(Commands::Run) | None => {
            let device = match device {
                Some(device) => device,
                None => resolve_device(&cli, &file_config)?,
            };
            run_suites(run_config, device, &registered_suites())
        }
        Some(Commands::Init) => Ok(()),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "syncbench=debug"
    } else {
        "syncbench=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Report lines own stdout; logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Build a RunConfig by layering: syncbench.toml defaults → CLI overrides.
pub fn build_run_config(cli: &Cli, file: &SyncConfig) -> anyhow::Result<RunConfig> {
    let mut config = file.run_config()?;

    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(n) = cli.repetitions {
        if n == 0 {
            anyhow::bail!("--repetitions must be positive");
        }
        config.repetitions = Some(n);
    }
    if let Some(n) = cli.warmup {
        config.warmup = Some(n);
    }
    if let Some(policy) = cli.on_failure {
        config.on_failure = policy;
    }
    if let Some(cpu) = cli.pin_cpu {
        config.pin_cpu = Some(cpu);
    }
    if let Some(width) = cli.name_width {
        if width == 0 {
            anyhow::bail!("--name-width must be positive");
        }
        config.name_width = width;
    }
    if let Some(pattern) = &cli.filter {
        config.filter = Some(Regex::new(pattern)?);
    }

    Ok(config)
}

fn resolve_device(cli: &Cli, file: &SyncConfig) -> anyhow::Result<Device> {
    let mut device = file.device.clone();
    if let Some(kind) = cli.device {
        device.kind = kind;
    }
    device.build()
}

fn list(config: &RunConfig) -> anyhow::Result<()> {
    println!("SyncBench Plan:");

    let suites = registered_suites();
    let mut total = 0;
    for (def, (name, cases)) in suites.iter().zip(list_suites(&suites)?) {
        let selected: Vec<_> = cases
            .iter()
            .filter(|case| config.selects(name, &case.name))
            .collect();
        if selected.is_empty() {
            continue;
        }

        println!("├── suite: {} ({}:{})", name, def.file, def.line);
        for case in selected {
            let plan = config.resolve(case.attr)?;
            println!(
                "│   ├── {} (repetitions: {}, warmup: {})",
                case.name, plan.repetitions, plan.warmup
            );
            total += 1;
        }
    }

    println!("{} cases found.", total);
    Ok(())
}

fn run_suites(config: RunConfig, device: Device, suites: &[&SuiteDef]) -> anyhow::Result<()> {
    if suites.is_empty() {
        println!("No suites found.");
        return Ok(());
    }

    let runner = Runner::new(config).with_device(device);
    let mut sink = StdoutSink;
    let summary = runner.run_suites(suites, &mut sink)?;

    if !summary.is_success() {
        for failure in &summary.failures {
            eprintln!("error: {}", failure);
        }
        anyhow::bail!("{} suite(s) failed", summary.failures.len());
    }

    Ok(())
}
