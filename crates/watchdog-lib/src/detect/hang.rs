//! Startup hang detection
//!
//! Flags containers stuck in a pending runtime state past a configured max
//! age. The alert fires once per container and the container is no longer
//! polled; there is no exit transition. The check itself is a pure
//! triggered operation; the driving process owns the cadence.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::alert::{AlertSink, WatchEvent};
use crate::error::{Error, Result};
use crate::runtime::RuntimeClient;

/// Inspect statuses treated as "still starting up"
const PENDING_STATES: &[&str] = &["created", "restarting"];

/// A fire-once startup hang
#[derive(Debug, Clone, PartialEq)]
pub struct HangAlert {
    pub container_id: String,
    pub status: String,
    pub age_millis: u64,
}

/// Tracks first-seen times for containers in a pending state.
///
/// Pure state machine; the async plumbing lives in [`HangMonitor`].
#[derive(Debug)]
pub struct StartupHangDetector {
    max_age: Duration,
    /// container id -> first observed pending, millis
    pending: HashMap<String, i64>,
    /// Containers that already fired; not polled again while they stay in
    /// the same pending lifecycle
    fired: HashSet<String>,
}

impl StartupHangDetector {
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            pending: HashMap::new(),
            fired: HashSet::new(),
        }
    }

    /// Fold one inspect observation into the tracking state.
    ///
    /// Returns an alert the first time a container has been pending past
    /// the max age. The container then moves to the fired set and cannot
    /// alert again until it leaves the pending state.
    pub fn observe(&mut self, container_id: &str, status: &str, now_millis: i64) -> Option<HangAlert> {
        if !PENDING_STATES.contains(&status) {
            self.pending.remove(container_id);
            self.fired.remove(container_id);
            return None;
        }

        if self.fired.contains(container_id) {
            return None;
        }

        let first_seen = *self
            .pending
            .entry(container_id.to_string())
            .or_insert(now_millis);
        let age_millis = now_millis - first_seen;

        if age_millis > self.max_age.as_millis() as i64 {
            self.pending.remove(container_id);
            self.fired.insert(container_id.to_string());
            return Some(HangAlert {
                container_id: container_id.to_string(),
                status: status.to_string(),
                age_millis: age_millis as u64,
            });
        }
        None
    }

    /// Drop state for containers not observed pending this pass (started,
    /// removed, or otherwise moved on).
    pub fn retain_pending(&mut self, seen: &HashSet<String>) {
        self.pending.retain(|id, _| seen.contains(id));
        self.fired.retain(|id| seen.contains(id));
    }

    /// Containers currently tracked toward the max age
    pub fn tracked(&self) -> usize {
        self.pending.len()
    }
}

/// Drives the hang detector against the runtime on each check tick.
pub struct HangMonitor {
    runtime: Arc<dyn RuntimeClient>,
    sink: Arc<dyn AlertSink>,
    detector: StartupHangDetector,
}

impl HangMonitor {
    pub fn new(runtime: Arc<dyn RuntimeClient>, sink: Arc<dyn AlertSink>, max_age: Duration) -> Self {
        Self {
            runtime,
            sink,
            detector: StartupHangDetector::new(max_age),
        }
    }

    /// One hang-check pass.
    ///
    /// Candidates are containers the runtime lists in a non-Up state; each
    /// candidate is inspected for its authoritative status. Inspect
    /// failures are scoped to the one container and retried next tick; a
    /// listing failure aborts the pass.
    pub async fn check_once(&mut self) -> Result<()> {
        let descriptors = self
            .runtime
            .list_containers(true)
            .await
            .map_err(Error::ListContainers)?;
        let now_millis = chrono::Utc::now().timestamp_millis();

        let mut seen_pending = HashSet::new();
        for descriptor in descriptors.iter().filter(|d| !d.is_up()) {
            let state = match self.runtime.inspect(&descriptor.id).await {
                Ok(state) => state,
                Err(err) => {
                    debug!(
                        container_id = %descriptor.id,
                        error = %err,
                        "inspect failed during hang check"
                    );
                    // Transient: keep whatever tracking exists for this id.
                    seen_pending.insert(descriptor.id.clone());
                    continue;
                }
            };

            if PENDING_STATES.contains(&state.status.as_str()) {
                seen_pending.insert(descriptor.id.clone());
            }
            if let Some(alert) = self.detector.observe(&descriptor.id, &state.status, now_millis) {
                self.sink.emit(&WatchEvent::ContainerHanged {
                    container_id: alert.container_id,
                    status: alert.status,
                    age_millis: alert.age_millis,
                });
            }
        }

        self.detector.retain_pending(&seen_pending);
        Ok(())
    }

    pub fn tracked(&self) -> usize {
        self.detector.tracked()
    }
}
