//! Fleet watching
//!
//! Per-container stream watchers and the reconciliation that keeps the
//! set of active watchers consistent with the live container list.

mod reconciler;
mod watcher;


pub use reconciler::FleetReconciler;
pub use watcher::{ContainerWatcher, WatcherHandle};

use std::time::Duration;

/// CPU alert settings for one container watch
#[derive(Debug, Clone, Copy)]
pub struct CpuAlertConfig {
    pub threshold_percent: f64,
    /// How long the threshold must stay exceeded before an alert fires
    pub sustain: Duration,
}

impl Default for CpuAlertConfig {
    fn default() -> Self {
        Self {
            threshold_percent: 75.0,
            sustain: Duration::from_secs(60),
        }
    }
}

/// Configuration for one container watch, per resource dimension.
///
/// `None` disables a dimension. Only CPU is implemented; the shape leaves
/// room for memory and network settings alongside it.
#[derive(Debug, Clone, Copy)]
pub struct WatchConfig {
    pub cpu: Option<CpuAlertConfig>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            cpu: Some(CpuAlertConfig::default()),
        }
    }
}
