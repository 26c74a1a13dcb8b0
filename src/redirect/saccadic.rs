//! Saccadic hand redirection: Cheng's continuous warp plus instantaneous
//! jumps hidden inside saccades and blinks.
//!
//! The continuous part is plain Cheng. When the detector reports a saccade
//! the remaining target offset is jumped by at most the detection
//! threshold for the measured saccade direction; blinks allow a fixed jump
//! magnitude. Each jump is folded into Cheng's warp baseline and the warp
//! origin is rebased to the current hand position, so the continuous warp
//! carries on without a seam.

use tracing::{debug, info, warn};

use crate::math::Vec3;
use crate::redirect::body::{self, ChengConfig, ChengState};
use crate::redirect::{InitContext, StateKind, WarpState};
use crate::threshold::DetectionThresholdModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpTrigger {
    Saccade,
    Blink,
}

#[derive(Debug, Clone)]
pub struct SaccadicConfig {
    pub cheng: ChengConfig,
    /// Apply instantaneous offsets on saccades.
    pub use_saccades: bool,
    /// Apply instantaneous offsets on blinks.
    pub use_blinks: bool,
    /// Fixed jump magnitude for blinks, meters (offset length, not per
    /// axis).
    pub blink_threshold_m: f32,
    /// Threshold model for saccade jumps.
    pub model: DetectionThresholdModel,
}

impl Default for SaccadicConfig {
    fn default() -> Self {
        Self {
            cheng: ChengConfig::default(),
            use_saccades: true,
            use_blinks: true,
            blink_threshold_m: 0.05,
            model: DetectionThresholdModel::order2_unconstrained(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SaccadicState {
    pub(crate) cheng: ChengState,
    /// Jumps applied so far, also seeds the simulated offset angle.
    jump_count: u32,
}

pub(crate) fn init(_config: &SaccadicConfig, ctx: &InitContext) -> StateKind {
    StateKind::Saccadic(SaccadicState {
        cheng: body::new_cheng_state(ctx),
        jump_count: 0,
    })
}

/// Jump the virtual hand by as much of the remaining target offset as the
/// trigger's threshold allows. Returns the new virtual hand position, or
/// None when the trigger kind is disabled.
///
/// `measured_angle_deg` is the angle between the saccade direction and the
/// remaining offset in the view plane; without an intersection plane a
/// deterministic pseudo-random angle stands in.
pub(crate) fn instantaneous_jump(
    config: &SaccadicConfig,
    state: &mut WarpState,
    trigger: JumpTrigger,
    real_hand: Vec3,
    measured_angle_deg: Option<f32>,
) -> Option<Vec3> {
    let StateKind::Saccadic(sac) = &mut state.kind else {
        warn!("instantaneous jump requested without saccadic state");
        return None;
    };

    let threshold = match trigger {
        JumpTrigger::Saccade => {
            if !config.use_saccades {
                return None;
            }
            let angle = measured_angle_deg.unwrap_or_else(|| {
                let simulated = simulated_offset_angle(sac.jump_count);
                debug!(angle = simulated, "simulated saccade offset angle");
                simulated
            });
            config.model.approximate_threshold(angle)
        }
        JumpTrigger::Blink => {
            if !config.use_blinks {
                return None;
            }
            config.blink_threshold_m
        }
    };

    let warp = sac.cheng.last_warp;
    let remaining = sac.cheng.t - warp;
    let offset = remaining.normalize() * remaining.length().min(threshold);

    // fold the jump into the continuous warp and restart progress from the
    // current hand position
    sac.cheng.t0 = warp + offset;
    state.warp_origin = real_hand;
    sac.jump_count += 1;

    info!(
        trigger = ?trigger,
        offset_m = offset.length(),
        "instantaneous redirection applied"
    );
    Some(real_hand + warp + offset)
}

/// Stand-in offset angle when no gaze intersection plane is configured.
/// Deterministic but well spread over [0, 180).
fn simulated_offset_angle(seed: u32) -> f32 {
    ((seed as f32 + 1.0) * 61.8034).sin().abs() * 180.0
}

// ── Tests ────────────────────────────────────────────────────
