//! Observability for the watchdog
//!
//! - Prometheus metrics (containers watched, alerts fired, frame counters)
//! - The production alert sink, mapping watch events onto structured
//!   tracing entries tagged with the host identifier

use prometheus::{register_int_counter, register_int_gauge, IntCounter, IntGauge};
use std::sync::OnceLock;
use tracing::{error, info, warn};

use crate::alert::{AlertSink, WatchEvent};

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<WatchdogMetricsInner> = OnceLock::new();

struct WatchdogMetricsInner {
    containers_watched: IntGauge,
    alerts_fired: IntCounter,
    frames_processed: IntCounter,
    decode_errors: IntCounter,
    reconcile_errors: IntCounter,
}

impl WatchdogMetricsInner {
    fn new() -> Self {
        Self {
            containers_watched: register_int_gauge!(
                "watchdog_containers_watched",
                "Number of containers currently being watched"
            )
            .expect("Failed to register containers_watched"),

            alerts_fired: register_int_counter!(
                "watchdog_alerts_fired_total",
                "Total number of threshold alerts fired"
            )
            .expect("Failed to register alerts_fired"),

            frames_processed: register_int_counter!(
                "watchdog_frames_processed_total",
                "Total number of stats frames decoded and evaluated"
            )
            .expect("Failed to register frames_processed"),

            decode_errors: register_int_counter!(
                "watchdog_decode_errors_total",
                "Total number of malformed stats frames dropped"
            )
            .expect("Failed to register decode_errors"),

            reconcile_errors: register_int_counter!(
                "watchdog_reconcile_errors_total",
                "Total number of failed reconciliation passes"
            )
            .expect("Failed to register reconcile_errors"),
        }
    }
}

/// Watchdog metrics for Prometheus exposition.
///
/// A lightweight handle to the global instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct WatchdogMetrics {
    _private: (),
}

impl Default for WatchdogMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchdogMetrics {
    /// Create a metrics handle, initializing the global instance on first use.
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(WatchdogMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &'static WatchdogMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn set_containers_watched(&self, count: i64) {
        self.inner().containers_watched.set(count);
    }

    pub fn inc_alerts_fired(&self) {
        self.inner().alerts_fired.inc();
    }

    pub fn inc_frames_processed(&self) {
        self.inner().frames_processed.inc();
    }

    pub fn inc_decode_errors(&self) {
        self.inner().decode_errors.inc();
    }

    pub fn inc_reconcile_errors(&self) {
        self.inner().reconcile_errors.inc();
    }
}

/// Production alert sink: every watch event becomes one structured tracing
/// entry, with severity carried by the log level and the host identifier
/// attached as a constant field.
#[derive(Clone)]
pub struct StructuredLogger {
    host_name: String,
}

impl StructuredLogger {
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
        }
    }
}

impl AlertSink for StructuredLogger {
    fn emit(&self, event: &WatchEvent) {
        match event {
            WatchEvent::WatchStarted { container_id } => info!(
                event = "watch_started",
                host = %self.host_name,
                container_id = %container_id,
                "Launching watcher"
            ),
            WatchEvent::WatchStopped { container_id } => info!(
                event = "watch_stopped",
                host = %self.host_name,
                container_id = %container_id,
                "Watcher stopped"
            ),
            WatchEvent::ContainerUp {
                container_id,
                status,
            } => info!(
                event = "container_up",
                host = %self.host_name,
                container_id = %container_id,
                status = %status,
                "Container is now up"
            ),
            WatchEvent::ContainerDown { container_id } => warn!(
                event = "container_down",
                host = %self.host_name,
                container_id = %container_id,
                "Container is no longer up"
            ),
            WatchEvent::ViolationEntered {
                container_id,
                dimension,
                threshold_percent,
                sustain_millis,
            } => warn!(
                event = "violation_entered",
                host = %self.host_name,
                container_id = %container_id,
                dimension = %dimension,
                threshold_percent = threshold_percent,
                sustain_millis = sustain_millis,
                "Usage above threshold past the sustain duration"
            ),
            WatchEvent::ViolationExited {
                container_id,
                dimension,
            } => info!(
                event = "violation_exited",
                host = %self.host_name,
                container_id = %container_id,
                dimension = %dimension,
                "Usage returned to normal"
            ),
            WatchEvent::ContainerHanged {
                container_id,
                status,
                age_millis,
            } => warn!(
                event = "container_hanged",
                host = %self.host_name,
                container_id = %container_id,
                status = %status,
                age_millis = age_millis,
                "Container stuck in a pending state"
            ),
            WatchEvent::DecodeFailed {
                container_id,
                reason,
            } => warn!(
                event = "decode_failed",
                host = %self.host_name,
                container_id = %container_id,
                reason = %reason,
                "Dropping malformed stats frame"
            ),
            WatchEvent::StreamEnded { container_id } => info!(
                event = "stream_ended",
                host = %self.host_name,
                container_id = %container_id,
                "Stats stream ended"
            ),
            WatchEvent::StreamAcquisitionFailed {
                container_id,
                reason,
            } => warn!(
                event = "stream_acquisition_failed",
                host = %self.host_name,
                container_id = %container_id,
                reason = %reason,
                "Could not open stats stream, will retry next pass"
            ),
            WatchEvent::ReconcileFailed { reason } => error!(
                event = "reconcile_failed",
                host = %self.host_name,
                reason = %reason,
                "Reconciliation pass failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handle() {
        let metrics = WatchdogMetrics::new();

        metrics.set_containers_watched(3);
        metrics.inc_alerts_fired();
        metrics.inc_frames_processed();
        metrics.inc_decode_errors();
        metrics.inc_reconcile_errors();
    }

    #[test]
    fn test_structured_logger_emits_without_panicking() {
        let logger = StructuredLogger::new("host-1");

        logger.emit(&WatchEvent::WatchStarted {
            container_id: "abc".into(),
        });
        logger.emit(&WatchEvent::ViolationEntered {
            container_id: "abc".into(),
            dimension: "cpu",
            threshold_percent: 75.0,
            sustain_millis: 60_000,
        });
        logger.emit(&WatchEvent::ReconcileFailed {
            reason: "listing unavailable".into(),
        });
    }
}
