//! Per-container stream watching
//!
//! One tokio task per container serializes everything that touches that
//! container's detector state: frame decode, detector updates, and the
//! stop signal all pass through the task's select loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use super::WatchConfig;
use crate::alert::{AlertSink, WatchEvent};
use crate::detect::{AlertEvent, ViolationDetector};
use crate::observability::WatchdogMetrics;
use crate::runtime::StatsStream;

const CPU_DIMENSION: &str = "cpu";

/// Watches a single container's stats stream
pub struct ContainerWatcher {
    container_id: String,
    config: WatchConfig,
    cpu: Option<ViolationDetector>,
    sink: Arc<dyn AlertSink>,
    metrics: WatchdogMetrics,
}

impl ContainerWatcher {
    /// Build the watcher state and announce that the watch has begun.
    pub fn new(container_id: impl Into<String>, sink: Arc<dyn AlertSink>, config: WatchConfig) -> Self {
        let container_id = container_id.into();
        sink.emit(&WatchEvent::WatchStarted {
            container_id: container_id.clone(),
        });

        let cpu = config
            .cpu
            .map(|cpu| ViolationDetector::new(cpu.threshold_percent, cpu.sustain));

        Self {
            container_id,
            config,
            cpu,
            sink,
            metrics: WatchdogMetrics::new(),
        }
    }

    /// Handle one raw stream payload.
    ///
    /// A malformed payload is reported and dropped; it never terminates
    /// the watch and never touches detector state.
    pub fn consume(&mut self, payload: &[u8]) {
        let frame: crate::models::StatsFrame = match serde_json::from_slice(payload) {
            Ok(frame) => frame,
            Err(err) => {
                self.emit_decode_failure(err.to_string());
                return;
            }
        };
        let sample = match frame.cpu_sample() {
            Ok(sample) => sample,
            Err(err) => {
                self.emit_decode_failure(err.to_string());
                return;
            }
        };
        self.metrics.inc_frames_processed();

        let now_millis = chrono::Utc::now().timestamp_millis();
        if let (Some(detector), Some(cpu)) = (self.cpu.as_mut(), self.config.cpu) {
            detector.update(&sample, now_millis);
            match detector.evaluate() {
                Some(AlertEvent::EnteredViolation) => {
                    self.metrics.inc_alerts_fired();
                    self.sink.emit(&WatchEvent::ViolationEntered {
                        container_id: self.container_id.clone(),
                        dimension: CPU_DIMENSION,
                        threshold_percent: cpu.threshold_percent,
                        sustain_millis: cpu.sustain.as_millis() as u64,
                    });
                }
                Some(AlertEvent::ExitedViolation) => {
                    self.sink.emit(&WatchEvent::ViolationExited {
                        container_id: self.container_id.clone(),
                        dimension: CPU_DIMENSION,
                    });
                }
                None => {}
            }
        }
    }

    fn emit_decode_failure(&self, reason: String) {
        self.metrics.inc_decode_errors();
        self.sink.emit(&WatchEvent::DecodeFailed {
            container_id: self.container_id.clone(),
            reason,
        });
    }

    /// Launch the watcher task over an already-open stats stream.
    pub fn spawn(
        container_id: impl Into<String>,
        mut stream: StatsStream,
        sink: Arc<dyn AlertSink>,
        config: WatchConfig,
    ) -> WatcherHandle {
        let mut watcher = ContainerWatcher::new(container_id, Arc::clone(&sink), config);
        let container_id = watcher.container_id.clone();
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    frame = stream.recv() => match frame {
                        Some(payload) => watcher.consume(&payload),
                        None => {
                            watcher.sink.emit(&WatchEvent::StreamEnded {
                                container_id: watcher.container_id.clone(),
                            });
                            break;
                        }
                    },
                    _ = stop_rx.changed() => break,
                }
            }
        });

        WatcherHandle {
            container_id,
            stop_tx,
            stopped: AtomicBool::new(false),
            sink,
            task,
        }
    }
}

/// Handle to a running watch; owned by the reconciler's registry.
pub struct WatcherHandle {
    container_id: String,
    stop_tx: watch::Sender<bool>,
    stopped: AtomicBool,
    sink: Arc<dyn AlertSink>,
    task: tokio::task::JoinHandle<()>,
}

impl WatcherHandle {
    /// Stop the watch: the task drops the stream receiver and all
    /// detector state on its next loop turn. Idempotent: the second and
    /// later calls are no-ops with no duplicate log entries.
    ///
    /// Safe to call while a frame is in flight: frame handling contains
    /// no await points, so the task observes the signal between frames.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.stop_tx.send(true);
        self.sink.emit(&WatchEvent::WatchStopped {
            container_id: self.container_id.clone(),
        });
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// The task finishes on stop or end-of-stream.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
