//! Core data models for the watchdog

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Snapshot of one container from a runtime list query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    pub id: String,
    pub name: String,
    /// Free-form status text; the substring "Up" is the liveness signal
    pub status: String,
}

impl ContainerDescriptor {
    /// Whether the runtime reports this container as running
    pub fn is_up(&self) -> bool {
        self.status.contains("Up")
    }
}

/// Inspect snapshot, reduced to the fields the watchdog reads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerState {
    pub status: String,
}

/// One decoded payload from a container stats stream
///
/// Unknown fields in the payload are ignored; only the CPU accounting the
/// watchdog evaluates is modeled.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsFrame {
    /// RFC3339 timestamp of the snapshot
    pub read: String,
    pub cpu_stats: CpuStats,
    pub precpu_stats: CpuStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuStats {
    #[serde(default)]
    pub cpu_usage: CpuUsage,
    /// Absent on the first frame after stream start
    pub system_cpu_usage: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuUsage {
    #[serde(default)]
    pub total_usage: u64,
}

/// A CPU usage sample derived from two consecutive stats snapshots
#[derive(Debug, Clone, Copy)]
pub struct CpuSample {
    pub timestamp_millis: i64,
    pub cpu_delta: u64,
    pub system_delta: u64,
}

impl StatsFrame {
    /// Derive the CPU sample for this frame.
    ///
    /// A missing `system_cpu_usage` on either side of the delta yields a
    /// zero system delta, which detectors treat as a degenerate sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the `read` timestamp is not RFC3339.
    pub fn cpu_sample(&self) -> Result<CpuSample, chrono::ParseError> {
        let read = DateTime::parse_from_rfc3339(&self.read)?;

        let cpu_delta = self
            .cpu_stats
            .cpu_usage
            .total_usage
            .saturating_sub(self.precpu_stats.cpu_usage.total_usage);

        let system_delta = match (
            self.cpu_stats.system_cpu_usage,
            self.precpu_stats.system_cpu_usage,
        ) {
            (Some(current), Some(previous)) => current.saturating_sub(previous),
            _ => 0,
        };

        Ok(CpuSample {
            timestamp_millis: read.timestamp_millis(),
            cpu_delta,
            system_delta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_liveness() {
        let up = ContainerDescriptor {
            id: "abc".into(),
            name: "web".into(),
            status: "Up 2 minutes".into(),
        };
        let down = ContainerDescriptor {
            id: "def".into(),
            name: "db".into(),
            status: "Exited (0) 5 seconds ago".into(),
        };

        assert!(up.is_up());
        assert!(!down.is_up());
    }

    #[test]
    fn test_decode_frame_ignores_unknown_fields() {
        let payload = r#"{
            "read": "2016-08-12T19:35:33.134871873-05:00",
            "num_procs": 0,
            "cpu_stats": {
                "cpu_usage": {"total_usage": 503589280517, "usage_in_kernelmode": 25920000000},
                "system_cpu_usage": 91145990000000,
                "throttling_data": {"periods": 0}
            },
            "precpu_stats": {
                "cpu_usage": {"total_usage": 503583300894},
                "system_cpu_usage": 91145010000000
            }
        }"#;

        let frame: StatsFrame = serde_json::from_str(payload).unwrap();
        let sample = frame.cpu_sample().unwrap();

        assert_eq!(sample.cpu_delta, 5_979_623);
        assert_eq!(sample.system_delta, 980_000_000);
        assert_eq!(sample.timestamp_millis, 1_471_048_533_134);
    }

    #[test]
    fn test_decode_frame_missing_system_usage() {
        // First frame after stream start: precpu side is empty.
        let payload = r#"{
            "read": "2016-08-12T19:35:33.134871873-05:00",
            "cpu_stats": {
                "cpu_usage": {"total_usage": 100},
                "system_cpu_usage": 91145990000000
            },
            "precpu_stats": {"cpu_usage": {"total_usage": 0}}
        }"#;

        let frame: StatsFrame = serde_json::from_str(payload).unwrap();
        let sample = frame.cpu_sample().unwrap();

        assert_eq!(sample.system_delta, 0);
    }

    #[test]
    fn test_decode_frame_bad_timestamp() {
        let payload = r#"{
            "read": "not-a-timestamp",
            "cpu_stats": {"cpu_usage": {"total_usage": 1}, "system_cpu_usage": 2},
            "precpu_stats": {"cpu_usage": {"total_usage": 0}, "system_cpu_usage": 1}
        }"#;

        let frame: StatsFrame = serde_json::from_str(payload).unwrap();
        assert!(frame.cpu_sample().is_err());
    }
}
