//! Saccade and blink detection over gaze kinematics.
//!
//! A thresholded consensus state machine: consecutive samples inside the
//! candidate speed band advance a counter, and a saccade is declared once
//! the counter reaches the minimum AND at least one of the last three
//! speeds/accelerations cleared the respective "once" threshold. Blinks
//! are edge-triggered on both-eyes-closed and gate the saccade machinery
//! through a post-blink break timer.

use tracing::{debug, info};

use crate::gaze::signal::GazeKinematics;

// ── Events ──────────────────────────────────────────────────

/// Detector output, drained by the session once per frame and forwarded
/// to subscribers (audio, logging, instantaneous redirection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GazeEvent {
    SaccadeOccurred,
    SaccadeIsOver,
    BlinkOccurred,
    BlinkIsOver,
}

impl GazeEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SaccadeOccurred => "saccade-occurred",
            Self::SaccadeIsOver => "saccade-is-over",
            Self::BlinkOccurred => "blink-occurred",
            Self::BlinkIsOver => "blink-is-over",
        }
    }
}

// ── Configuration ───────────────────────────────────────────

/// Detection thresholds. Defaults are the tuned values from the toolkit's
/// user studies.
#[derive(Debug, Clone, Copy)]
pub struct SaccadeConfig {
    /// Require both eyes to satisfy the candidate condition independently,
    /// instead of using the combined gaze track.
    pub separate_eye: bool,
    /// Candidate band lower bound, deg/s. Sensible range 50–400.
    pub speed_threshold: f32,
    /// Must be exceeded by at least one of the last 3 speeds, deg/s.
    /// Range 0–500.
    pub speed_threshold_once: f32,
    /// Samples at or above this speed are tracker noise and do not advance
    /// the counter, deg/s. Range 400–1000.
    pub speed_noise_threshold: f32,
    /// Must be exceeded by at least one of the last 3 accelerations,
    /// deg/s². Range 0–30000.
    pub acceleration_threshold_once: f32,
    /// Consecutive candidate samples required. Range 0–5.
    pub minimum_samples: u32,
    /// Seconds after a blink during which no saccade is detected.
    /// Range 0.0–0.2.
    pub break_timer_s: f32,
    /// An eye with openness below this is considered closed. Openness is
    /// 0.0 (closed) to 1.0 (open); range 0.1–0.5.
    pub closed_eye_threshold: f32,
}

impl Default for SaccadeConfig {
    fn default() -> Self {
        Self {
            separate_eye: false,
            speed_threshold: 80.0,
            speed_threshold_once: 130.0,
            speed_noise_threshold: 800.0,
            acceleration_threshold_once: 1000.0,
            minimum_samples: 2,
            break_timer_s: 0.007,
            closed_eye_threshold: 0.2,
        }
    }
}

// ── Once-in-range ring buffer ───────────────────────────────

/// Last-3 window for the "once" criteria. Speed and acceleration share one
/// write index, advanced once per stored sample.
#[derive(Debug, Default)]
struct OnceWindow {
    speeds: [f32; 3],
    accelerations: [f32; 3],
    index: usize,
}

impl OnceWindow {
    fn store(&mut self, speed: f32, acceleration: f32) {
        self.speeds[self.index] = speed;
        self.accelerations[self.index] = acceleration;
        self.index = (self.index + 1) % 3;
    }

    fn any_speed_above(&self, threshold: f32) -> bool {
        self.speeds.iter().any(|&s| s > threshold)
    }

    fn any_acceleration_above(&self, threshold: f32) -> bool {
        self.accelerations.iter().any(|&a| a > threshold)
    }
}

// ── Detector ────────────────────────────────────────────────

/// The saccade/blink state machine. Sole owner of the gaze-derived flags;
/// one `update` per consumed sample.
#[derive(Debug)]
pub struct SaccadeDetector {
    config: SaccadeConfig,
    /// True while a saccade episode is active; guards re-firing the
    /// occurred event within one episode.
    saccade: bool,
    /// True while both eyes are closed.
    blink: bool,
    /// Consecutive samples satisfying the candidate condition.
    sample_counter: u32,
    /// Seconds since both eyes were last seen open; must exceed the break
    /// timer before detection re-arms after a blink.
    blocked_timer_s: f32,
    window: OnceWindow,
}

impl SaccadeDetector {
    pub fn new(config: SaccadeConfig) -> Self {
        Self {
            config,
            saccade: false,
            blink: false,
            sample_counter: 0,
            blocked_timer_s: 0.0,
            window: OnceWindow::default(),
        }
    }

    pub fn config(&self) -> &SaccadeConfig {
        &self.config
    }

    /// Whether a saccade episode is currently active.
    pub fn saccade_active(&self) -> bool {
        self.saccade
    }

    /// Whether the eyes are currently closed.
    pub fn blink_active(&self) -> bool {
        self.blink
    }

    /// Feed one tick of kinematics. Returns the events that fired, in
    /// order; a blink that interrupts a saccade yields `SaccadeIsOver`
    /// before `BlinkOccurred`.
    pub fn update(&mut self, kin: &GazeKinematics) -> Vec<GazeEvent> {
        let mut events = Vec::new();

        self.blocked_timer_s += kin.delta_s;
        self.eye_status(kin, &mut events);

        if kin.valid {
            self.store_window(kin);
            self.check_saccade(kin, &mut events);
        }

        events
    }

    // ── Blink sub-machine ──

    fn eye_status(&mut self, kin: &GazeKinematics, events: &mut Vec<GazeEvent>) {
        let both_closed = kin.openness_left < self.config.closed_eye_threshold
            && kin.openness_right < self.config.closed_eye_threshold;
        let both_open = kin.openness_left >= self.config.closed_eye_threshold
            && kin.openness_right >= self.config.closed_eye_threshold;

        if both_closed && !self.blink {
            info!(timestamp_ms = kin.timestamp_ms, "blink detected");
            // a running saccade ends before the blink is announced
            if self.saccade {
                self.saccade = false;
                events.push(GazeEvent::SaccadeIsOver);
            }
            self.blink = true;
            events.push(GazeEvent::BlinkOccurred);
        } else if !both_closed && self.blink {
            self.blink = false;
            events.push(GazeEvent::BlinkIsOver);
        }

        if !both_open {
            // partial or full closure pauses detection and restarts the
            // post-blink cool-down
            self.blocked_timer_s = 0.0;
            self.sample_counter = 0;
        }
    }

    // ── Saccade machine ──

    fn store_window(&mut self, kin: &GazeKinematics) {
        if self.config.separate_eye {
            // conservative: only the lower of the two eyes' readings can
            // satisfy the once criteria
            self.window.store(
                kin.left.speed.min(kin.right.speed),
                kin.left.acceleration.min(kin.right.acceleration),
            );
        } else {
            self.window
                .store(kin.combined.speed, kin.combined.acceleration);
        }
    }

    fn check_saccade(&mut self, kin: &GazeKinematics, events: &mut Vec<GazeEvent>) {
        let both_open = kin.openness_left >= self.config.closed_eye_threshold
            && kin.openness_right >= self.config.closed_eye_threshold;

        if !(both_open && self.blocked_timer_s > self.config.break_timer_s) {
            self.saccade_ended(events);
            return;
        }

        if self.candidate_condition(kin) {
            self.sample_counter += 1;
            if self.sample_counter >= self.config.minimum_samples
                && self
                    .window
                    .any_acceleration_above(self.config.acceleration_threshold_once)
                && self.window.any_speed_above(self.config.speed_threshold_once)
            {
                self.saccade_occurred(kin.timestamp_ms, events);
            }
        } else if self.no_saccade_condition(kin) {
            self.saccade_ended(events);
        }
        // speeds at or above the noise threshold fall through: the counter
        // neither advances nor resets
    }

    fn candidate_condition(&self, kin: &GazeKinematics) -> bool {
        let in_band = |speed: f32| {
            speed >= self.config.speed_threshold && speed < self.config.speed_noise_threshold
        };
        if self.config.separate_eye {
            in_band(kin.left.speed) && in_band(kin.right.speed)
        } else {
            in_band(kin.combined.speed)
        }
    }

    fn no_saccade_condition(&self, kin: &GazeKinematics) -> bool {
        if self.config.separate_eye {
            kin.left.speed < self.config.speed_threshold
                && kin.right.speed < self.config.speed_threshold
        } else {
            kin.combined.speed < self.config.speed_threshold
        }
    }

    fn saccade_occurred(&mut self, timestamp_ms: i64, events: &mut Vec<GazeEvent>) {
        if self.saccade {
            return;
        }
        info!(timestamp_ms, "saccade detected");
        self.saccade = true;
        events.push(GazeEvent::SaccadeOccurred);
    }

    fn saccade_ended(&mut self, events: &mut Vec<GazeEvent>) {
        if self.saccade {
            debug!("saccade over");
            events.push(GazeEvent::SaccadeIsOver);
        }
        self.saccade = false;
        self.sample_counter = 0;
    }
}

// ── Tests ────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaze::signal::TrackKinematics;

    fn kin(ts: i64, speed: f32, acceleration: f32) -> GazeKinematics {
        let track = TrackKinematics {
            angle_deg: 0.0,
            speed,
            acceleration,
        };
        GazeKinematics {
            timestamp_ms: ts,
            delta_s: 0.01,
            valid: true,
            combined: track,
            left: track,
            right: track,
            openness_left: 1.0,
            openness_right: 1.0,
        }
    }

    fn kin_closed(ts: i64) -> GazeKinematics {
        let mut k = kin(ts, 0.0, 0.0);
        k.openness_left = 0.05;
        k.openness_right = 0.05;
        k
    }

    fn detector() -> SaccadeDetector {
        SaccadeDetector::new(SaccadeConfig::default())
    }

    #[test]
    fn test_slow_samples_never_trigger() {
        let mut det = detector();
        for i in 0..20 {
            let events = det.update(&kin(i * 10, 40.0, 2000.0));
            assert!(events.is_empty(), "tick {i}: {events:?}");
        }
        assert!(!det.saccade_active());
    }

    #[test]
    fn test_scenario_fires_on_second_tick() {
        // speeds [90, 140, 95], accelerations [50, 1200, 50]:
        // counter reaches 2 on tick 2 with 140 > 130 and 1200 > 1000 in
        // the window, so the event fires there and only there.
        let mut det = detector();

        assert!(det.update(&kin(0, 90.0, 50.0)).is_empty());
        assert_eq!(
            det.update(&kin(10, 140.0, 1200.0)),
            vec![GazeEvent::SaccadeOccurred]
        );
        // still in the same episode: no re-fire
        assert!(det.update(&kin(20, 95.0, 50.0)).is_empty());
        assert!(det.saccade_active());
    }

    #[test]
    fn test_saccade_ends_when_speed_drops() {
        let mut det = detector();
        det.update(&kin(0, 150.0, 1500.0));
        det.update(&kin(10, 150.0, 1500.0));
        assert!(det.saccade_active());

        let events = det.update(&kin(20, 30.0, 0.0));
        assert_eq!(events, vec![GazeEvent::SaccadeIsOver]);
        assert!(!det.saccade_active());
    }

    #[test]
    fn test_noise_speed_does_not_advance_counter() {
        let mut det = detector();
        // above the noise threshold: not a candidate, but also not a reset
        det.update(&kin(0, 900.0, 5000.0));
        det.update(&kin(10, 900.0, 5000.0));
        det.update(&kin(20, 900.0, 5000.0));
        assert!(!det.saccade_active());

        // needs the full minimum_samples run after the noise
        assert!(det.update(&kin(30, 150.0, 1500.0)).is_empty());
        assert_eq!(
            det.update(&kin(40, 150.0, 1500.0)),
            vec![GazeEvent::SaccadeOccurred]
        );
    }

    #[test]
    fn test_blink_ends_saccade_first() {
        let mut det = detector();
        det.update(&kin(0, 150.0, 1500.0));
        det.update(&kin(10, 150.0, 1500.0));
        assert!(det.saccade_active());

        let events = det.update(&kin_closed(20));
        assert_eq!(
            events,
            vec![GazeEvent::SaccadeIsOver, GazeEvent::BlinkOccurred]
        );
        assert!(!det.saccade_active());
        assert!(det.blink_active());

        let events = det.update(&kin(30, 0.0, 0.0));
        assert_eq!(events, vec![GazeEvent::BlinkIsOver]);
        assert!(!det.blink_active());
    }

    #[test]
    fn test_break_timer_blocks_detection_after_blink() {
        let mut config = SaccadeConfig::default();
        config.break_timer_s = 0.05;
        let mut det = SaccadeDetector::new(config);
        det.update(&kin_closed(0));
        assert_eq!(
            det.update(&kin(10, 150.0, 1500.0)),
            vec![GazeEvent::BlinkIsOver]
        );
        // 10 ms ticks: detection stays blocked until the timer clears the
        // 50 ms break, then two candidate samples are needed from scratch
        let mut fired_at = None;
        for i in 2..12 {
            let events = det.update(&kin(i * 10, 150.0, 1500.0));
            if events.contains(&GazeEvent::SaccadeOccurred) {
                fired_at = Some(i);
                break;
            }
        }
        assert_eq!(fired_at, Some(7));
    }

    #[test]
    fn test_partial_closure_resets_counter() {
        let mut det = detector();
        det.update(&kin(0, 150.0, 1500.0));

        // one eye droops below the closed threshold: counter resets,
        // no blink (only one eye)
        let mut k = kin(10, 150.0, 1500.0);
        k.openness_left = 0.1;
        let events = det.update(&k);
        assert!(events.is_empty());

        // needs minimum_samples from scratch again
        assert!(det.update(&kin(20, 150.0, 1500.0)).is_empty());
    }

    #[test]
    fn test_separate_eye_requires_both() {
        let mut config = SaccadeConfig::default();
        config.separate_eye = true;
        let mut det = SaccadeDetector::new(config);

        // right eye never reaches the candidate band
        let mut k = kin(0, 150.0, 1500.0);
        k.right.speed = 20.0;
        det.update(&k);
        let mut k = kin(10, 150.0, 1500.0);
        k.right.speed = 20.0;
        let events = det.update(&k);
        assert!(events.is_empty());
        assert!(!det.saccade_active());

        // both eyes in band: the lower eye's values fill the window, which
        // still satisfies the once thresholds here
        det.update(&kin(20, 150.0, 1500.0));
        let events = det.update(&kin(30, 150.0, 1500.0));
        assert_eq!(events, vec![GazeEvent::SaccadeOccurred]);
    }

    #[test]
    fn test_invalid_tick_holds_state() {
        let mut det = detector();
        det.update(&kin(0, 150.0, 1500.0));
        det.update(&kin(10, 150.0, 1500.0));
        assert!(det.saccade_active());

        let mut k = kin(10, 0.0, 0.0);
        k.valid = false;
        k.delta_s = 0.0;
        let events = det.update(&k);
        assert!(events.is_empty());
        assert!(det.saccade_active());
    }
}
