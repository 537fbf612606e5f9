//! Watchdog configuration

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use watchdog_lib::fleet::{CpuAlertConfig, WatchConfig};

/// Watchdog configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WatchdogConfig {
    /// Host identifier attached to every log entry
    #[serde(default = "default_host_name")]
    pub host_name: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Path to the Docker Engine socket
    #[serde(default = "default_docker_socket")]
    pub docker_socket: String,

    /// Reconciliation cadence in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// CPU percentage above which a container is in violation
    #[serde(default = "default_cpu_threshold")]
    pub cpu_threshold_percent: f64,

    /// How long the threshold must stay exceeded before alerting, ms
    #[serde(default = "default_cpu_sustain")]
    pub cpu_sustain_ms: u64,

    /// Startup-hang check cadence in milliseconds
    #[serde(default = "default_hang_check_interval")]
    pub hang_check_interval_ms: u64,

    /// Max time a container may sit in a pending state, ms
    #[serde(default = "default_hang_max_age")]
    pub hang_max_age_ms: u64,

    /// Per-container CPU overrides keyed by container id
    #[serde(default)]
    pub container_overrides: HashMap<String, CpuOverride>,
}

/// CPU settings for one specific container
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CpuOverride {
    pub threshold_percent: f64,
    pub sustain_ms: u64,
}

fn default_host_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_docker_socket() -> String {
    "/var/run/docker.sock".to_string()
}

fn default_poll_interval() -> u64 {
    5_000
}

fn default_cpu_threshold() -> f64 {
    75.0
}

fn default_cpu_sustain() -> u64 {
    60_000
}

fn default_hang_check_interval() -> u64 {
    30_000
}

fn default_hang_max_age() -> u64 {
    120_000
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            host_name: default_host_name(),
            api_port: default_api_port(),
            docker_socket: default_docker_socket(),
            poll_interval_ms: default_poll_interval(),
            cpu_threshold_percent: default_cpu_threshold(),
            cpu_sustain_ms: default_cpu_sustain(),
            hang_check_interval_ms: default_hang_check_interval(),
            hang_max_age_ms: default_hang_max_age(),
            container_overrides: HashMap::new(),
        }
    }
}

impl WatchdogConfig {
    /// Load configuration from the `WATCHDOG_` environment, with an
    /// optional config file (`WATCHDOG_CONFIG_FILE`) supplying values the
    /// environment cannot express well, such as per-container overrides.
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var("WATCHDOG_CONFIG_FILE") {
            builder = builder.add_source(config::File::with_name(&path));
        }
        let cfg = builder
            .add_source(config::Environment::with_prefix("WATCHDOG"))
            .build()?;

        Ok(cfg.try_deserialize().unwrap_or_default())
    }

    /// Watch settings applied to containers without an override
    pub fn default_watch_config(&self) -> WatchConfig {
        WatchConfig {
            cpu: Some(CpuAlertConfig {
                threshold_percent: self.cpu_threshold_percent,
                sustain: Duration::from_millis(self.cpu_sustain_ms),
            }),
        }
    }

    /// Per-container watch settings keyed by container id
    pub fn watch_overrides(&self) -> HashMap<String, WatchConfig> {
        self.container_overrides
            .iter()
            .map(|(id, cpu)| {
                (
                    id.clone(),
                    WatchConfig {
                        cpu: Some(CpuAlertConfig {
                            threshold_percent: cpu.threshold_percent,
                            sustain: Duration::from_millis(cpu.sustain_ms),
                        }),
                    },
                )
            })
            .collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn hang_check_interval(&self) -> Duration {
        Duration::from_millis(self.hang_check_interval_ms)
    }

    pub fn hang_max_age(&self) -> Duration {
        Duration::from_millis(self.hang_max_age_ms)
    }
}
