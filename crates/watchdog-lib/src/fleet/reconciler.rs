//! Fleet reconciliation
//!
//! Re-derives the set of containers that should be watched from the
//! runtime's container list and applies the minimal diff to the watcher
//! registry. The reconciler is the registry's only writer; watchers never
//! remove themselves.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;

use super::watcher::{ContainerWatcher, WatcherHandle};
use super::WatchConfig;
use crate::alert::{AlertSink, WatchEvent};
use crate::error::{Error, Result};
use crate::observability::WatchdogMetrics;
use crate::runtime::RuntimeClient;

/// Keeps the watcher registry consistent with the live container list.
///
/// The repeating cadence belongs to the driving process; the reconciler
/// only exposes triggered passes.
pub struct FleetReconciler {
    runtime: Arc<dyn RuntimeClient>,
    sink: Arc<dyn AlertSink>,
    watchers: DashMap<String, WatcherHandle>,
    default_config: WatchConfig,
    overrides: HashMap<String, WatchConfig>,
    metrics: WatchdogMetrics,
}

impl FleetReconciler {
    pub fn new(
        runtime: Arc<dyn RuntimeClient>,
        sink: Arc<dyn AlertSink>,
        default_config: WatchConfig,
    ) -> Self {
        Self {
            runtime,
            sink,
            watchers: DashMap::new(),
            default_config,
            overrides: HashMap::new(),
            metrics: WatchdogMetrics::new(),
        }
    }

    /// Set per-container watch settings keyed by container id; containers
    /// without an entry use the default configuration.
    pub fn with_overrides(mut self, overrides: HashMap<String, WatchConfig>) -> Self {
        self.overrides = overrides;
        self
    }

    /// One reconciliation pass against the current container list.
    ///
    /// # Errors
    ///
    /// A listing failure aborts the pass before any diff is applied and
    /// surfaces as [`Error::ListContainers`]; per-container stream
    /// failures are reported through the sink and skipped.
    pub async fn reconcile_once(&self) -> Result<()> {
        // `all: true`: stopped containers are needed to observe stop
        // transitions.
        let descriptors = self
            .runtime
            .list_containers(true)
            .await
            .map_err(Error::ListContainers)?;

        for descriptor in &descriptors {
            if !descriptor.is_up() {
                continue;
            }

            // A watcher whose stream already ended is disposed here and
            // replaced with a fresh one below; watchers only report
            // termination upward, they never remove themselves.
            let dead = self
                .watchers
                .get(&descriptor.id)
                .map(|handle| handle.is_finished())
                .unwrap_or(false);
            if dead {
                if let Some((_, handle)) = self.watchers.remove(&descriptor.id) {
                    handle.stop();
                }
            }
            if self.watchers.contains_key(&descriptor.id) {
                continue;
            }

            match self.runtime.open_stats_stream(&descriptor.id).await {
                Ok(stream) => {
                    let config = self
                        .overrides
                        .get(&descriptor.id)
                        .copied()
                        .unwrap_or(self.default_config);
                    let handle = ContainerWatcher::spawn(
                        descriptor.id.clone(),
                        stream,
                        Arc::clone(&self.sink),
                        config,
                    );
                    self.watchers.insert(descriptor.id.clone(), handle);
                    self.sink.emit(&WatchEvent::ContainerUp {
                        container_id: descriptor.id.clone(),
                        status: descriptor.status.clone(),
                    });
                }
                Err(err) => {
                    self.sink.emit(&WatchEvent::StreamAcquisitionFailed {
                        container_id: descriptor.id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let up: HashSet<&str> = descriptors
            .iter()
            .filter(|descriptor| descriptor.is_up())
            .map(|descriptor| descriptor.id.as_str())
            .collect();
        self.watchers.retain(|container_id, handle| {
            if up.contains(container_id.as_str()) {
                return true;
            }
            handle.stop();
            self.sink.emit(&WatchEvent::ContainerDown {
                container_id: container_id.clone(),
            });
            false
        });

        self.metrics.set_containers_watched(self.watchers.len() as i64);
        Ok(())
    }

    /// Perform the initial pass.
    pub async fn start_all(&self) -> Result<()> {
        self.reconcile_once().await
    }

    /// Stop every active watcher and clear the registry.
    pub fn stop_all(&self) {
        self.watchers.retain(|_, handle| {
            handle.stop();
            false
        });
        self.metrics.set_containers_watched(0);
    }

    /// Number of containers currently watched
    pub fn watched(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_watching(&self, container_id: &str) -> bool {
        self.watchers.contains_key(container_id)
    }
}
