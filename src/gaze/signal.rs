//! Gaze kinematics — angular speed and acceleration from consecutive
//! samples, for the combined track and each eye independently.
//!
//! Typical saccades run at 300–400 deg/s with accelerations above
//! 1000 deg/s², occur every 300–400 ms and last 20–200 ms; the detector's
//! thresholds are calibrated against the values computed here.

use tracing::{debug, warn};

use crate::gaze::sample::GazeSample;
use crate::math::Vec3;

// ── Kinematics output ───────────────────────────────────────

/// Speed/acceleration for one gaze track.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackKinematics {
    /// Angular distance to the previous sample, degrees [0, 180].
    pub angle_deg: f32,
    /// deg/s.
    pub speed: f32,
    /// deg/s².
    pub acceleration: f32,
}

/// Per-sample kinematics for all tracks, plus the openness values carried
/// through for the detector's eligibility checks.
#[derive(Debug, Clone, Copy)]
pub struct GazeKinematics {
    pub timestamp_ms: i64,
    /// Seconds since the previous sample.
    pub delta_s: f32,
    /// False when the speed computation had to be skipped for this tick
    /// (first sample, or a repeated/non-monotonic timestamp). Consumers
    /// must not treat the speed fields as meaningful then.
    pub valid: bool,
    pub combined: TrackKinematics,
    pub left: TrackKinematics,
    pub right: TrackKinematics,
    pub openness_left: f32,
    pub openness_right: f32,
}

// ── Per-track state ─────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct TrackState {
    prev_direction: Vec3,
    prev_speed: f32,
}

impl TrackState {
    fn advance(&mut self, direction: Vec3, delta_s: f32) -> TrackKinematics {
        let angle_deg = direction.angle_to(self.prev_direction);
        let speed = angle_deg / delta_s;
        let acceleration = (speed - self.prev_speed) / delta_s;
        self.prev_direction = direction;
        self.prev_speed = speed;
        TrackKinematics {
            angle_deg,
            speed,
            acceleration,
        }
    }

    /// Update direction history without computing speeds (invalid tick).
    fn hold(&mut self, direction: Vec3) {
        self.prev_direction = direction;
    }
}

// ── Processor ───────────────────────────────────────────────

/// Converts consecutive `GazeSample`s into angular speed and acceleration.
/// Pure given its inputs, apart from the previous-sample state it carries
/// forward between calls.
#[derive(Debug)]
pub struct GazeSignalProcessor {
    prev_timestamp_ms: Option<i64>,
    combined: TrackState,
    left: TrackState,
    right: TrackState,
}

impl Default for GazeSignalProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl GazeSignalProcessor {
    pub fn new() -> Self {
        let initial = TrackState {
            prev_direction: Vec3::ZERO,
            prev_speed: 0.0,
        };
        Self {
            prev_timestamp_ms: None,
            combined: initial,
            left: initial,
            right: initial,
        }
    }

    /// Process one sample. A zero or backwards time delta never divides:
    /// the tick is returned with `valid == false` and previous speeds held,
    /// so NaN/Inf cannot reach the detector or the warp math.
    pub fn process(&mut self, sample: &GazeSample) -> GazeKinematics {
        let invalid = |processor: &mut Self, delta_s: f32| {
            processor.combined.hold(sample.combined.direction);
            processor.left.hold(sample.left.direction);
            processor.right.hold(sample.right.direction);
            processor.prev_timestamp_ms = Some(sample.timestamp_ms);
            GazeKinematics {
                timestamp_ms: sample.timestamp_ms,
                delta_s,
                valid: false,
                combined: TrackKinematics::default(),
                left: TrackKinematics::default(),
                right: TrackKinematics::default(),
                openness_left: sample.left.openness,
                openness_right: sample.right.openness,
            }
        };

        let Some(prev_ts) = self.prev_timestamp_ms else {
            debug!(timestamp_ms = sample.timestamp_ms, "first gaze sample");
            return invalid(self, 0.0);
        };

        let delta_ms = sample.timestamp_ms - prev_ts;
        if delta_ms <= 0 {
            warn!(
                timestamp_ms = sample.timestamp_ms,
                prev_timestamp_ms = prev_ts,
                "timestamp did not advance, skipping speed update"
            );
            return invalid(self, 0.0);
        }
        let delta_s = delta_ms as f32 / 1000.0;

        let combined = self.combined.advance(sample.combined.direction, delta_s);
        let left = self.left.advance(sample.left.direction, delta_s);
        let right = self.right.advance(sample.right.direction, delta_s);
        self.prev_timestamp_ms = Some(sample.timestamp_ms);

        GazeKinematics {
            timestamp_ms: sample.timestamp_ms,
            delta_s,
            valid: true,
            combined,
            left,
            right,
            openness_left: sample.left.openness,
            openness_right: sample.right.openness,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
