//! Alert events and the emission seam
//!
//! Everything the core reports (lifecycle transitions, threshold alerts,
//! per-frame failures) flows through one `AlertSink` capability. The
//! production sink maps events onto structured tracing entries
//! ([`crate::observability::StructuredLogger`]); tests substitute a
//! recording sink.

/// Events emitted by watchers, detectors, and the reconciler
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// A watcher was launched for a container
    WatchStarted { container_id: String },
    /// A watcher was disposed
    WatchStopped { container_id: String },
    /// A container transitioned into the Up state and is now watched
    ContainerUp { container_id: String, status: String },
    /// A previously watched container left the Up state
    ContainerDown { container_id: String },
    /// CPU stayed above threshold past the sustain duration
    ViolationEntered {
        container_id: String,
        dimension: &'static str,
        threshold_percent: f64,
        sustain_millis: u64,
    },
    /// CPU returned to normal after an active alert
    ViolationExited {
        container_id: String,
        dimension: &'static str,
    },
    /// A container stayed in a pending state past the configured max age
    ContainerHanged {
        container_id: String,
        status: String,
        age_millis: u64,
    },
    /// A stream payload could not be decoded; the frame was dropped
    DecodeFailed {
        container_id: String,
        reason: String,
    },
    /// The stats stream ended or broke; the reconciler re-acquires on a
    /// later pass if the container still lists as Up
    StreamEnded { container_id: String },
    /// Acquiring one container's stats stream failed
    StreamAcquisitionFailed {
        container_id: String,
        reason: String,
    },
    /// A reconciliation pass failed before producing a diff
    ReconcileFailed { reason: String },
}

/// Capability the core uses to report events.
///
/// Emission is fire-and-forget: implementations must not block the caller
/// meaningfully and must not fail.
pub trait AlertSink: Send + Sync {
    fn emit(&self, event: &WatchEvent);
}
