//! World-warping techniques.
//!
//! Instead of offsetting the hand, these scale the user's own head motion
//! and inject only the extra increment as a shift of the whole virtual
//! world, following the redirected-walking gain model of Azmandian et al.
//! The host applies the returned [`WorldShift`]; the state accumulates the
//! shifts it has requested so convergence is measured against the moved
//! world rather than the configured poses.

use crate::math::{Quat, Vec3};
use crate::redirect::{ApplyContext, InitContext, PosePair, StateKind, WarpOutcome, WorldShift};

/// A head turn faster than this is tracker noise, deg/s.
const MAX_POSSIBLE_HEAD_ROTATION: f32 = 180.0;
/// Head turns slower than this do not count as rotating, deg/s.
const HEAD_ROTATION_TRIGGER_THRESHOLD: f32 = 20.0;
/// Forward vectors closer than this are aligned, degrees.
const ROTATION_ALIGNED_THRESHOLD: f32 = 0.1;

/// A head move larger than this per frame is tracker noise, meters.
const MAX_POSSIBLE_HEAD_TRANSLATION: f32 = 0.1;
/// Head moves smaller than this do not count as moving, meters.
const HEAD_TRANSLATION_TRIGGER_THRESHOLD: f32 = 0.0005;
/// Target positions closer than this are aligned, meters.
const TRANSLATION_ALIGNED_THRESHOLD: f32 = 0.01;

/// Asymmetric motion gains. The empirical redirected-walking bounds are
/// +49%/-20% for rotation and +26%/-14% for translation.
#[derive(Debug, Clone, Copy)]
pub struct WorldWarpConfig {
    /// Gain for head rotation towards the required direction, up to 1.49.
    pub rotation_gain_towards: f32,
    /// Gain for head rotation away from it, down to 0.80.
    pub rotation_gain_away: f32,
    /// Gain for head translation towards the target, up to 1.26.
    pub translation_gain_towards: f32,
    /// Gain for head translation away from it, down to 0.86.
    pub translation_gain_away: f32,
}

impl Default for WorldWarpConfig {
    fn default() -> Self {
        Self {
            rotation_gain_towards: 1.49,
            rotation_gain_away: 0.80,
            translation_gain_towards: 1.26,
            translation_gain_away: 0.86,
        }
    }
}

// ── Rotational ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub(crate) struct WorldRotationState {
    prev_head_forward: Vec3,
    /// Total world yaw requested so far, degrees.
    accumulated_deg: f32,
}

pub(crate) fn init_rotation(ctx: &InitContext) -> StateKind {
    StateKind::WorldRotation(WorldRotationState {
        prev_head_forward: ctx.head.forward(),
        accumulated_deg: 0.0,
    })
}

/// Forward vector of the virtual target after the world yaw accumulated
/// so far.
fn shifted_virtual_forward(pair: &PosePair, accumulated_deg: f32) -> Vec3 {
    Quat::from_axis_angle(Vec3::UP, accumulated_deg).rotate(pair.virtual_pose.forward())
}

/// One rotational step. Returns the world yaw to apply this frame, or
/// None when aligned or not rotating.
fn rotation_step(
    config: &WorldWarpConfig,
    state: &mut WorldRotationState,
    ctx: &ApplyContext,
) -> (Option<f32>, bool) {
    let pair = &ctx.pairs[0];
    let virtual_forward = shifted_virtual_forward(pair, state.accumulated_deg);
    let needed = virtual_forward.signed_angle_about(pair.real.forward(), Vec3::UP);

    if needed.abs() < ROTATION_ALIGNED_THRESHOLD {
        return (None, true);
    }

    let current_forward = ctx.head.forward();
    let frame_rotation = state
        .prev_head_forward
        .signed_angle_about(current_forward, Vec3::UP);
    state.prev_head_forward = current_forward;

    if ctx.delta_s <= 0.0 {
        return (None, false);
    }
    let deg_per_s = frame_rotation / ctx.delta_s;
    if deg_per_s.abs() > MAX_POSSIBLE_HEAD_ROTATION {
        return (None, false);
    }
    if deg_per_s.abs() < HEAD_ROTATION_TRIGGER_THRESHOLD {
        return (None, false);
    }

    // only the scaled-minus-unscaled increment is injected
    let towards = (needed > 0.0) == (frame_rotation > 0.0);
    let gain = if towards {
        config.rotation_gain_towards
    } else {
        config.rotation_gain_away
    };
    let extra = frame_rotation * gain - frame_rotation;

    // never rotate past alignment
    let step = if needed < 0.0 {
        extra.max(needed)
    } else {
        extra.min(needed)
    };

    state.accumulated_deg += step;
    (Some(step), false)
}

pub(crate) fn apply_rotation(
    config: &WorldWarpConfig,
    state: &mut WorldRotationState,
    ctx: &ApplyContext,
) -> WarpOutcome {
    let (step, aligned) = rotation_step(config, state, ctx);
    WarpOutcome {
        virtual_hand: ctx.real_hand.position,
        world_shift: step.map(|deg| WorldShift {
            rotate_about_head_deg: deg,
            translate: Vec3::ZERO,
        }),
        aligned,
    }
}

// ── Translational ───────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub(crate) struct WorldTranslationState {
    prev_head_position: Vec3,
    prev_head_target_distance: f32,
    /// Total world translation requested so far.
    accumulated: Vec3,
}

pub(crate) fn init_translation(ctx: &InitContext) -> StateKind {
    StateKind::WorldTranslation(new_translation_state(ctx.head.position, ctx.pairs))
}

fn new_translation_state(head: Vec3, pairs: &[PosePair]) -> WorldTranslationState {
    WorldTranslationState {
        prev_head_position: head,
        prev_head_target_distance: head.distance(pairs[0].virtual_pose.position),
        accumulated: Vec3::ZERO,
    }
}

/// One translational step. Returns the world translation for this frame,
/// or None when aligned or not moving.
fn translation_step(
    config: &WorldWarpConfig,
    state: &mut WorldTranslationState,
    ctx: &ApplyContext,
) -> (Option<Vec3>, bool) {
    let pair = &ctx.pairs[0];
    let virtual_pos = pair.virtual_pose.position + state.accumulated;
    let pv = pair.real.position - virtual_pos;

    if pv.length() < TRANSLATION_ALIGNED_THRESHOLD {
        return (None, true);
    }

    let head = ctx.head.position;
    let step_vec = head - state.prev_head_position;
    state.prev_head_position = head;

    let distance = head.distance(virtual_pos);
    let distance_delta = (distance - state.prev_head_target_distance).abs();
    state.prev_head_target_distance = distance;

    if distance_delta > MAX_POSSIBLE_HEAD_TRANSLATION {
        return (None, false);
    }
    if distance_delta < HEAD_TRANSLATION_TRIGGER_THRESHOLD {
        return (None, false);
    }

    let towards = pv.normalize().dot(step_vec.normalize()) > 0.0;
    let gain = if towards {
        config.translation_gain_towards
    } else {
        config.translation_gain_away
    };

    let projected = step_vec.project_onto(pv);
    let projected_with_gain = (step_vec * gain).project_onto(pv);
    let extra = (projected_with_gain.length() - projected.length()).abs();

    let shift = pv.normalize() * extra;
    state.accumulated = state.accumulated + shift;
    (Some(shift), false)
}

pub(crate) fn apply_translation(
    config: &WorldWarpConfig,
    state: &mut WorldTranslationState,
    ctx: &ApplyContext,
) -> WarpOutcome {
    let (shift, aligned) = translation_step(config, state, ctx);
    WarpOutcome {
        virtual_hand: ctx.real_hand.position,
        world_shift: shift.map(|translate| WorldShift {
            rotate_about_head_deg: 0.0,
            translate,
        }),
        aligned,
    }
}

// ── Combined ────────────────────────────────────────────────

/// Rotation runs first; once the forward vectors align, translation takes
/// over with a baseline captured at the handover.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WorldCombinedState {
    rotation: WorldRotationState,
    translation: Option<WorldTranslationState>,
}

pub(crate) fn init_combined(ctx: &InitContext) -> StateKind {
    StateKind::WorldCombined(WorldCombinedState {
        rotation: WorldRotationState {
            prev_head_forward: ctx.head.forward(),
            accumulated_deg: 0.0,
        },
        translation: None,
    })
}

pub(crate) fn apply_combined(
    config: &WorldWarpConfig,
    state: &mut WorldCombinedState,
    ctx: &ApplyContext,
) -> WarpOutcome {
    let (step, rotation_aligned) = rotation_step(config, &mut state.rotation, ctx);
    if !rotation_aligned {
        return WarpOutcome {
            virtual_hand: ctx.real_hand.position,
            world_shift: step.map(|deg| WorldShift {
                rotate_about_head_deg: deg,
                translate: Vec3::ZERO,
            }),
            aligned: false,
        };
    }

    let translation = state
        .translation
        .get_or_insert_with(|| new_translation_state(ctx.head.position, ctx.pairs));
    let (shift, aligned) = translation_step(config, translation, ctx);
    WarpOutcome {
        virtual_hand: ctx.real_hand.position,
        world_shift: shift.map(|translate| WorldShift {
            rotate_about_head_deg: 0.0,
            translate,
        }),
        aligned,
    }
}

// ── Tests ────────────────────────────────────────────────────
