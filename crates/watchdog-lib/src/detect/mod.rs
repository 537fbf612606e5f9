//! Violation detection for container resource usage
//!
//! - Hysteresis detection for sustained threshold violations (CPU)
//! - Startup-hang detection for containers stuck in a pending state

mod hang;
mod violation;

pub use hang::{HangAlert, HangMonitor, StartupHangDetector};
pub use violation::{cpu_percent, AlertEvent, ViolationDetector};
