//! Configuration loading from syncbench.toml
//!
//! SyncBench configuration can be specified in a `syncbench.toml` file in the project root.
//! The configuration is automatically discovered by walking up from the current directory.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use syncbench_core::{Device, FailurePolicy, HostOnly, RunConfig, SimulatedDevice, TimingMode};

/// SyncBench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Device configuration
    #[serde(default)]
    pub device: DeviceConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Runner configuration for suite execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Timing mode: "host" or "dual"
    #[serde(default)]
    pub mode: TimingMode,
    /// Measured iterations for cases without their own value
    #[serde(default)]
    pub repetitions: Option<usize>,
    /// Warmup iterations for cases without their own value
    #[serde(default)]
    pub warmup: Option<usize>,
    /// Failure handling: "abort" or "skip-suite"
    #[serde(default)]
    pub on_failure: FailurePolicy,
    /// Pin the measuring thread to this core
    #[serde(default)]
    pub pin_cpu: Option<usize>,
}

/// Which device backs the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceKind {
    /// Synchronous host execution, device times are zero
    #[default]
    HostOnly,
    /// In-process asynchronous queue with timestamped markers
    Simulated,
}

impl std::str::FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host-only" | "host" => Ok(DeviceKind::HostOnly),
            "simulated" | "sim" => Ok(DeviceKind::Simulated),
            other => Err(format!("Unknown device kind: {}", other)),
        }
    }
}

/// Device configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device kind: "host-only" or "simulated"
    #[serde(default)]
    pub kind: DeviceKind,
}

impl DeviceConfig {
    /// Construct the configured device
    pub fn build(&self) -> anyhow::Result<Device> {
        match self.kind {
            DeviceKind::HostOnly => Ok(HostOnly::shared()),
            DeviceKind::Simulated => Ok(SimulatedDevice::shared()?),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Column width of case names in report lines
    #[serde(default = "default_name_width")]
    pub name_width: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            name_width: default_name_width(),
        }
    }
}

fn default_name_width() -> usize {
    syncbench_report::DEFAULT_NAME_WIDTH
}

impl SyncConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> anyhow::Result<Option<Self>> {
        Self::discover_from(std::env::current_dir()?)
    }

    /// Walk up from `start` and load the first `syncbench.toml` found
    ///
    /// A file that exists but does not parse is an error.
    pub fn discover_from(start: impl AsRef<Path>) -> anyhow::Result<Option<Self>> {
        let mut dir = start.as_ref().to_path_buf();
        loop {
            let config_path = dir.join("syncbench.toml");
            if config_path.exists() {
                tracing::debug!(path = %config_path.display(), "loading config");
                let config = Self::load(&config_path)
                    .with_context(|| format!("invalid config {}", config_path.display()))?;
                return Ok(Some(config));
            }
            if !dir.pop() {
                return Ok(None);
            }
        }
    }

    /// Run configuration described by this file, before CLI overrides
    pub fn run_config(&self) -> anyhow::Result<RunConfig> {
        if self.runner.repetitions == Some(0) {
            anyhow::bail!("runner.repetitions must be positive");
        }
        if self.output.name_width == 0 {
            anyhow::bail!("output.name_width must be positive");
        }

        Ok(RunConfig {
            mode: self.runner.mode,
            repetitions: self.runner.repetitions,
            warmup: self.runner.warmup,
            filter: None,
            on_failure: self.runner.on_failure,
            pin_cpu: self.runner.pin_cpu,
            name_width: self.output.name_width,
        })
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# SyncBench Configuration

[runner]
# Timing mode: "host" (wall clock between device barriers)
# or "dual" (host dispatch time plus device time between markers)
mode = "host"
# Measured iterations for cases without their own value (uncomment to enable)
# repetitions = 1000
# Warmup iterations for cases without their own value (uncomment to enable)
# warmup = 10
# On suite failure: "abort" the run or "skip-suite" and continue
on_failure = "abort"
# Pin the measuring thread to a core (uncomment to enable)
# pin_cpu = 0

[device]
# Device backing the run: "host-only" or "simulated"
kind = "host-only"

[output]
# Column width of case names
name_width = 20
"#
        .to_string()
    }
}
