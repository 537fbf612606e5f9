//! CPU violation detection with hysteresis
//!
//! Converts a stream of usage samples into edge-triggered alerts: a
//! violation must persist past the sustain duration before it is reported,
//! and must cease before recovery is reported. Noisy single samples below
//! the sustain duration never fire.

use std::time::Duration;

use crate::models::CpuSample;

/// Edge emitted by [`ViolationDetector::evaluate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEvent {
    EnteredViolation,
    ExitedViolation,
}

/// Percentage of host CPU consumed between two stats snapshots.
///
/// A zero system delta carries no information and yields `None`; the
/// sample is skipped rather than producing a meaningless ratio.
pub fn cpu_percent(sample: &CpuSample) -> Option<f64> {
    if sample.system_delta == 0 {
        return None;
    }
    Some(sample.cpu_delta as f64 / sample.system_delta as f64 * 100.0)
}

/// Tracks how long a metric has continuously exceeded its threshold and
/// fires at most one entered/exited edge per state transition.
#[derive(Debug)]
pub struct ViolationDetector {
    threshold_percent: f64,
    sustain: Duration,
    /// Sample timestamp of the first above-threshold observation; `None`
    /// iff the most recent sample was at-or-below threshold
    violation_started_at: Option<i64>,
    time_in_violation_millis: i64,
    alert_active: bool,
}

impl ViolationDetector {
    pub fn new(threshold_percent: f64, sustain: Duration) -> Self {
        Self {
            threshold_percent,
            sustain,
            violation_started_at: None,
            time_in_violation_millis: 0,
            alert_active: false,
        }
    }

    /// Fold one sample into the violation state.
    ///
    /// `now_millis` is the evaluation clock: time in violation is measured
    /// from it, not from sample timestamps, so detection latency tracks
    /// the stats cadence. Degenerate samples (zero system delta) are
    /// skipped and leave all state untouched.
    pub fn update(&mut self, sample: &CpuSample, now_millis: i64) {
        let Some(percent) = cpu_percent(sample) else {
            return;
        };

        if percent > self.threshold_percent {
            let started = *self
                .violation_started_at
                .get_or_insert(sample.timestamp_millis);
            self.time_in_violation_millis = now_millis - started;
        } else {
            self.violation_started_at = None;
            self.time_in_violation_millis = 0;
        }
    }

    /// Report the edge crossed by the latest update, if any.
    ///
    /// Repeated steady-state calls never re-fire: entered and exited
    /// events strictly alternate, enforced by the active flag.
    pub fn evaluate(&mut self) -> Option<AlertEvent> {
        let sustain_millis = self.sustain.as_millis() as i64;

        if self.time_in_violation_millis > sustain_millis && !self.alert_active {
            self.alert_active = true;
            return Some(AlertEvent::EnteredViolation);
        }
        if self.time_in_violation_millis <= sustain_millis && self.alert_active {
            self.alert_active = false;
            return Some(AlertEvent::ExitedViolation);
        }
        None
    }

    pub fn is_alert_active(&self) -> bool {
        self.alert_active
    }

    pub fn time_in_violation(&self) -> Duration {
        Duration::from_millis(self.time_in_violation_millis.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp_millis: i64, cpu_delta: u64, system_delta: u64) -> CpuSample {
        CpuSample {
            timestamp_millis,
            cpu_delta,
            system_delta,
        }
    }

    #[test]
    fn test_below_threshold_never_fires() {
        let mut detector = ViolationDetector::new(50.0, Duration::from_millis(100));

        for t in (0..10_000).step_by(500) {
            // 10% usage, well under the 50% threshold
            detector.update(&sample(t, 10, 100), t);
            assert_eq!(detector.evaluate(), None);
        }
        assert!(!detector.is_alert_active());
    }

    #[test]
    fn test_hysteresis_enter_and_exit() {
        // threshold 0%, sustain 1000ms
        let mut detector = ViolationDetector::new(0.0, Duration::from_millis(1000));

        // t=0: above threshold, duration 0 -> no alert yet
        detector.update(&sample(0, 5, 100), 0);
        assert_eq!(detector.evaluate(), None);

        // t=1500: still above, duration 1500 > 1000 -> fires once
        detector.update(&sample(1500, 5, 100), 1500);
        assert_eq!(detector.evaluate(), Some(AlertEvent::EnteredViolation));
        assert!(detector.is_alert_active());

        // t=2000: back to 0% -> exits once
        detector.update(&sample(2000, 0, 100), 2000);
        assert_eq!(detector.evaluate(), Some(AlertEvent::ExitedViolation));
        assert!(!detector.is_alert_active());
    }

    #[test]
    fn test_steady_state_does_not_refire() {
        let mut detector = ViolationDetector::new(0.0, Duration::from_millis(1000));

        detector.update(&sample(0, 5, 100), 0);
        assert_eq!(detector.evaluate(), None);
        detector.update(&sample(2000, 5, 100), 2000);
        assert_eq!(detector.evaluate(), Some(AlertEvent::EnteredViolation));

        // Still in violation: no further events while steady
        for t in (3000..8000).step_by(1000) {
            detector.update(&sample(t, 5, 100), t);
            assert_eq!(detector.evaluate(), None);
        }
    }

    #[test]
    fn test_fires_only_past_sustain_boundary() {
        let mut detector = ViolationDetector::new(0.0, Duration::from_millis(1000));

        detector.update(&sample(0, 5, 100), 0);
        assert_eq!(detector.evaluate(), None);

        // Exactly at the sustain duration: not past it, no alert
        detector.update(&sample(1000, 5, 100), 1000);
        assert_eq!(detector.evaluate(), None);

        detector.update(&sample(1001, 5, 100), 1001);
        assert_eq!(detector.evaluate(), Some(AlertEvent::EnteredViolation));
    }

    #[test]
    fn test_short_spike_resets() {
        let mut detector = ViolationDetector::new(0.0, Duration::from_millis(1000));

        // Spike shorter than the sustain duration
        detector.update(&sample(0, 5, 100), 0);
        assert_eq!(detector.evaluate(), None);
        detector.update(&sample(500, 0, 100), 500);
        assert_eq!(detector.evaluate(), None);

        // A later violation measures from its own start, not the spike's
        detector.update(&sample(5000, 5, 100), 5000);
        assert_eq!(detector.evaluate(), None);
        assert_eq!(detector.time_in_violation(), Duration::ZERO);
    }

    #[test]
    fn test_events_alternate() {
        let mut detector = ViolationDetector::new(0.0, Duration::from_millis(100));
        let mut events = Vec::new();

        // Alternate long violations with recoveries
        for cycle in 0..3i64 {
            let base = cycle * 10_000;
            detector.update(&sample(base, 5, 100), base);
            events.extend(detector.evaluate());
            detector.update(&sample(base + 500, 5, 100), base + 500);
            events.extend(detector.evaluate());
            detector.update(&sample(base + 600, 0, 100), base + 600);
            events.extend(detector.evaluate());
        }

        assert_eq!(events.len(), 6);
        for pair in events.chunks(2) {
            assert_eq!(pair[0], AlertEvent::EnteredViolation);
            assert_eq!(pair[1], AlertEvent::ExitedViolation);
        }
    }

    #[test]
    fn test_degenerate_denominator_skipped() {
        let mut detector = ViolationDetector::new(0.0, Duration::from_millis(1000));

        detector.update(&sample(0, 5, 100), 0);
        assert_eq!(detector.evaluate(), None);
        let before = detector.time_in_violation();

        // Zero system delta: no new information, state untouched
        detector.update(&sample(1500, 5, 0), 1500);
        assert_eq!(detector.evaluate(), None);
        assert_eq!(detector.time_in_violation(), before);
        assert!(!detector.is_alert_active());
    }

    #[test]
    fn test_cpu_percent() {
        assert_eq!(cpu_percent(&sample(0, 5, 100)), Some(5.0));
        assert_eq!(cpu_percent(&sample(0, 100, 100)), Some(100.0));
        assert_eq!(cpu_percent(&sample(0, 5, 0)), None);
    }
}
