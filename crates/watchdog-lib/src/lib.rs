//! Core library for the container watchdog
//!
//! This crate provides the pieces the watchdog agent is assembled from:
//! - The container runtime boundary (list, stats streams, inspect) and its
//!   Docker Engine implementation
//! - Hysteresis-based violation detection and startup-hang detection
//! - Per-container stream watchers
//! - Fleet reconciliation against the live container list
//! - The alert sink seam, structured logging, metrics, and health checks

pub mod alert;
pub mod detect;
pub mod error;
pub mod fleet;
pub mod health;
pub mod models;
pub mod observability;
pub mod runtime;

pub use alert::{AlertSink, WatchEvent};
pub use error::{Error, Result};
pub use fleet::{CpuAlertConfig, FleetReconciler, WatchConfig};
pub use models::*;
pub use observability::{StructuredLogger, WatchdogMetrics};
