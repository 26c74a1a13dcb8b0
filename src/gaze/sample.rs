//! Raw gaze samples and the cross-thread handoff slot.
//!
//! Eye trackers deliver data on their own callback thread; the frame loop
//! consumes at most one sample per frame. `GazeMailbox` is the single-slot
//! latest-wins buffer between the two — no queue, by design: a backlog
//! would only add latency to detection.

use std::sync::Mutex;

use crate::math::{Ray, Vec3};

// ── Sample records ──────────────────────────────────────────

/// Per-eye gaze data: local origin/direction plus eyelid openness.
#[derive(Debug, Clone, Copy)]
pub struct EyeGaze {
    pub origin: Vec3,
    pub direction: Vec3,
    /// 0.0 = fully closed, 1.0 = fully open.
    pub openness: f32,
}

impl EyeGaze {
    pub fn new(origin: Vec3, direction: Vec3, openness: f32) -> Self {
        Self {
            origin,
            direction,
            openness,
        }
    }
}

/// One tracker update: combined (binocular) ray plus both eyes.
///
/// Directions are in the head's local frame, the way the tracker reports
/// them; the intersection tracker transforms to world space with the
/// current head pose.
#[derive(Debug, Clone, Copy)]
pub struct GazeSample {
    /// Tracker timestamp, monotonic milliseconds.
    pub timestamp_ms: i64,
    pub combined: Ray,
    pub left: EyeGaze,
    pub right: EyeGaze,
}

impl GazeSample {
    /// Convenience constructor with both eyes mirroring the combined ray.
    pub fn combined_only(timestamp_ms: i64, origin: Vec3, direction: Vec3, openness: f32) -> Self {
        Self {
            timestamp_ms,
            combined: Ray::new(origin, direction),
            left: EyeGaze::new(origin, direction, openness),
            right: EyeGaze::new(origin, direction, openness),
        }
    }
}

// ── Mailbox ─────────────────────────────────────────────────

/// Single-slot sample handoff between the tracker callback thread and the
/// frame loop. `publish` overwrites whatever is pending (latest wins);
/// `take` drains the slot at most once, so a sample is never processed
/// twice and stale data is never re-observed.
#[derive(Debug, Default)]
pub struct GazeMailbox {
    slot: Mutex<Option<GazeSample>>,
}

impl GazeMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new sample, replacing any unconsumed one.
    pub fn publish(&self, sample: GazeSample) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(sample);
    }

    /// Remove and return the pending sample, if any.
    pub fn take(&self) -> Option<GazeSample> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.take()
    }

    /// Whether a sample is waiting.
    pub fn has_pending(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

// ── Tests ────────────────────────────────────────────────────
