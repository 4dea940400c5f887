//! Two-phase fall detector.
//!
//! Phase 1 is near-weightlessness: the calibrated vertical component close to
//! zero. Phase 2 is an impact: a sharp spike past the impact threshold, which
//! only counts when it arrives within the phase window of the latest phase 1
//! tick. A slow tilt never goes weightless and an isolated bump has no
//! preceding free fall, so neither fires.

use crate::sensors::InertialReading;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorConfig {
    /// |z| below this (g) arms the free-fall candidate
    pub near_zero_g: f64,
    /// z below this (g) counts as an impact
    pub impact_g: f64,
    /// Max ms from the candidate tick to the impact
    pub phase_window_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            near_zero_g: 0.1,
            impact_g: -1.0,
            phase_window_ms: 2000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorMode {
    Monitoring,
    /// Latched. Only a restart clears it.
    Alerting,
}

/// A detected fall
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FallEvent {
    pub tick_ms: u64,
    pub free_fall_tick_ms: u64,
    pub reading: InertialReading,
}

impl FallEvent {
    pub fn free_fall_to_impact_ms(&self) -> u64 {
        self.tick_ms.saturating_sub(self.free_fall_tick_ms)
    }
}

pub struct FallDetector {
    config: DetectorConfig,
    mode: DetectorMode,
    candidate_tick: Option<u64>,
}

impl FallDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            mode: DetectorMode::Monitoring,
            candidate_tick: None,
        }
    }

    pub fn mode(&self) -> DetectorMode {
        self.mode
    }

    pub fn is_alerting(&self) -> bool {
        self.mode == DetectorMode::Alerting
    }

    /// Tick of the latest near-zero reading, if any was seen
    pub fn candidate_tick(&self) -> Option<u64> {
        self.candidate_tick
    }

    /// Feed one calibrated reading taken at `now_ms`.
    ///
    /// Returns the event on the tick the detector latches into alerting.
    pub fn update(&mut self, now_ms: u64, reading: &InertialReading) -> Option<FallEvent> {
        if self.mode == DetectorMode::Alerting {
            return None;
        }

        let z = reading.accel.z;
        if z.abs() < self.config.near_zero_g {
            // Re-arm on every weightless tick, not just the first
            self.candidate_tick = Some(now_ms);
            log::trace!("Free-fall candidate at {}ms (z={:.3})", now_ms, z);
            return None;
        }

        if z < self.config.impact_g {
            let candidate = self.candidate_tick?;
            let elapsed = now_ms.saturating_sub(candidate);
            if elapsed < self.config.phase_window_ms {
                self.mode = DetectorMode::Alerting;
                return Some(FallEvent {
                    tick_ms: now_ms,
                    free_fall_tick_ms: candidate,
                    reading: *reading,
                });
            }
            log::trace!(
                "Impact at {}ms ignored, free fall {}ms ago is stale",
                now_ms,
                elapsed
            );
        }

        None
    }
}

impl Default for FallDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::Vec3;

    fn z(value: f64) -> InertialReading {
        InertialReading::new(Vec3::new(0.05, -0.02, value), Vec3::new(0.1, 0.2, 0.3))
    }

    /// Feed (tick, z) pairs and collect every event
    fn feed(detector: &mut FallDetector, samples: &[(u64, f64)]) -> Vec<FallEvent> {
        samples
            .iter()
            .filter_map(|(tick, value)| detector.update(*tick, &z(*value)))
            .collect()
    }

    #[test]
    fn test_initial_state() {
        let detector = FallDetector::default();
        assert_eq!(detector.mode(), DetectorMode::Monitoring);
        assert_eq!(detector.candidate_tick(), None);
    }

    #[test]
    fn test_free_fall_then_impact_detected() {
        let mut detector = FallDetector::default();
        let events = feed(
            &mut detector,
            &[(0, -1.0), (80, -1.0), (160, 0.02), (240, -0.6), (1500, -1.5)],
        );

        assert_eq!(events.len(), 1);
        let event = events[0];
        assert_eq!(event.tick_ms, 1500);
        assert_eq!(event.free_fall_tick_ms, 160);
        assert_eq!(event.free_fall_to_impact_ms(), 1340);
        assert_eq!(event.reading.accel.z, -1.5);
        assert_eq!(event.reading.gyro, Vec3::new(0.1, 0.2, 0.3));
        assert_eq!(detector.mode(), DetectorMode::Alerting);
    }

    #[test]
    fn test_impact_just_inside_window() {
        let mut detector = FallDetector::default();
        let events = feed(&mut detector, &[(1000, 0.0), (2999, -1.5)]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_impact_at_window_edge_ignored() {
        let mut detector = FallDetector::default();
        let events = feed(&mut detector, &[(1000, 0.0), (3000, -1.5)]);
        assert!(events.is_empty());
        assert_eq!(detector.mode(), DetectorMode::Monitoring);
    }

    #[test]
    fn test_stale_candidate_ignored() {
        let mut detector = FallDetector::default();
        let events = feed(&mut detector, &[(0, 0.05), (2500, -1.5), (4000, -2.0)]);
        assert!(events.is_empty());
        // Stale candidates are left in place, not cleared
        assert_eq!(detector.candidate_tick(), Some(0));
    }

    #[test]
    fn test_impact_without_free_fall_ignored() {
        let mut detector = FallDetector::default();
        let events = feed(
            &mut detector,
            &[(0, -1.0), (80, -0.8), (160, -0.5), (240, -1.5), (320, -3.0)],
        );
        assert!(events.is_empty());
        assert_eq!(detector.candidate_tick(), None);
    }

    #[test]
    fn test_impact_at_boot_without_candidate_ignored() {
        // Tick 0 must not act as an implicit candidate
        let mut detector = FallDetector::default();
        let events = feed(&mut detector, &[(10, -1.5)]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_repeated_weightlessness_rearms_window() {
        let mut detector = FallDetector::default();
        let events = feed(&mut detector, &[(0, 0.01), (1500, 0.03), (3000, -1.5)]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].free_fall_tick_ms, 1500);
    }

    #[test]
    fn test_threshold_boundaries_are_strict() {
        let mut detector = FallDetector::default();
        // |z| == 0.1 does not arm, z == -1.0 is not an impact
        let events = feed(&mut detector, &[(0, 0.1), (100, -1.0)]);
        assert!(events.is_empty());
        assert_eq!(detector.candidate_tick(), None);

        feed(&mut detector, &[(200, -0.09)]);
        assert_eq!(detector.candidate_tick(), Some(200));
        assert!(feed(&mut detector, &[(300, -1.0)]).is_empty());
    }

    #[test]
    fn test_alerting_is_latched() {
        let mut detector = FallDetector::default();
        assert_eq!(feed(&mut detector, &[(0, 0.0), (100, -1.5)]).len(), 1);

        let later = feed(
            &mut detector,
            &[(200, 0.0), (300, -1.5), (400, 0.0), (500, -2.5)],
        );
        assert!(later.is_empty());
        assert!(detector.is_alerting());
        assert_eq!(detector.candidate_tick(), Some(0));
    }

    #[test]
    fn test_nan_sample_changes_nothing() {
        let mut detector = FallDetector::default();
        feed(&mut detector, &[(0, 0.0)]);
        assert!(feed(&mut detector, &[(50, f64::NAN)]).is_empty());
        assert_eq!(detector.candidate_tick(), Some(0));
    }

    #[test]
    fn test_custom_thresholds() {
        let mut detector = FallDetector::new(DetectorConfig {
            near_zero_g: 0.3,
            impact_g: -2.0,
            phase_window_ms: 500,
        });

        assert!(feed(&mut detector, &[(0, 0.25), (100, -1.5)]).is_empty());
        assert!(feed(&mut detector, &[(700, -2.5)]).is_empty());
        assert_eq!(feed(&mut detector, &[(800, 0.2), (1200, -2.5)]).len(), 1);
    }
}
