//! Body-warping techniques: the virtual hand is offset from the real hand
//! so that reaching the virtual target lands the real hand on the real one.

use tracing::warn;

use crate::math::Vec3;
use crate::redirect::{
    real_target_pos, virtual_target_pos, ApplyContext, InitContext, StateKind,
};

// ── Shared warp primitives ──────────────────────────────────

/// Rotational warp of Zenner & Krueger. Projects the hand onto the plane
/// spanned by `forward` and `redirection` through `origin`, advances the
/// in-plane polar angle by `angle_deg`, and restores the height component.
pub fn rotational_warp(
    hand: Vec3,
    origin: Vec3,
    forward: Vec3,
    redirection: Vec3,
    angle_deg: f32,
) -> Vec3 {
    let height_axis = forward.cross(redirection).normalize();
    let height = (hand - origin).dot(height_axis);
    let projected = hand - height_axis * height;
    let offset = projected - origin;

    let angle_real = offset.dot(redirection).atan2(offset.dot(forward));
    let angle_virtual = angle_real + angle_deg.to_radians();

    let magnitude = offset.length();
    let warped = redirection * (angle_virtual.sin() * magnitude)
        + forward * (angle_virtual.cos() * magnitude);

    origin + warped + height_axis * height
}

/// Gain warp: scales the radial offset of the hand from `origin`.
pub fn gain_warp(hand: Vec3, origin: Vec3, gain: f32) -> Vec3 {
    origin + (hand - origin) * gain
}

// ── Azmandian ───────────────────────────────────────────────

pub(crate) fn init_azmandian(ctx: &InitContext) -> StateKind {
    let real = real_target_pos(ctx.pairs);
    if real.distance(ctx.warp_origin) < 1e-6 {
        warn!("real target coincides with the warp origin, redirection disabled");
        return StateKind::Passthrough;
    }
    StateKind::Azmandian {
        t: virtual_target_pos(ctx.pairs) - real,
    }
}

pub(crate) fn apply_azmandian(t: Vec3, warp_origin: Vec3, ctx: &ApplyContext) -> Vec3 {
    let hand = ctx.real_hand.position;
    let to_target = real_target_pos(ctx.pairs) - warp_origin;

    // progress of the hand along the origin-to-target vector, in [0, 1]
    let a = (to_target.dot(hand - warp_origin) / to_target.dot(to_target)).clamp(0.0, 1.0);
    hand + t * a
}

// ── Cheng ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct ChengConfig {
    /// Distance from the body below which no warp accrues.
    pub zero_warp_distance: f32,
    /// Reach accuracy subtracted from the hand-to-target distance, keeps
    /// the shift ratio from saturating asymptotically near the target.
    pub epsilon: f32,
}

impl Default for ChengConfig {
    fn default() -> Self {
        Self {
            zero_warp_distance: 0.1,
            epsilon: 0.03,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ChengState {
    /// Offset between virtual and real target.
    pub(crate) t: Vec3,
    /// Warp baseline, folded in by instantaneous jumps. Zero until then.
    pub(crate) t0: Vec3,
    /// Warp applied last frame, read by the instantaneous-jump path.
    pub(crate) last_warp: Vec3,
    in_zero_zone: bool,
}

pub(crate) fn init_cheng(_config: &ChengConfig, ctx: &InitContext) -> StateKind {
    StateKind::Cheng(new_cheng_state(ctx))
}

pub(crate) fn new_cheng_state(ctx: &InitContext) -> ChengState {
    ChengState {
        t: virtual_target_pos(ctx.pairs) - real_target_pos(ctx.pairs),
        t0: Vec3::ZERO,
        last_warp: Vec3::ZERO,
        in_zero_zone: false,
    }
}

pub(crate) fn apply_cheng(
    config: &ChengConfig,
    state: &mut ChengState,
    warp_origin: &mut Vec3,
    ctx: &ApplyContext,
) -> Vec3 {
    let hand = ctx.real_hand.position;
    let body_distance = hand.distance(ctx.head.position);

    let ds = if body_distance < config.zero_warp_distance {
        state.in_zero_zone = true;
        body_distance
    } else {
        if state.in_zero_zone {
            // leaving the zone: rebase the origin so the ratio restarts
            // from here instead of jumping
            *warp_origin = hand;
            state.in_zero_zone = false;
        }
        hand.distance(*warp_origin)
    };

    let dp = (hand.distance(real_target_pos(ctx.pairs)) - config.epsilon).max(0.0);

    let a = if ds + dp < 1e-9 { 0.0 } else { ds / (ds + dp) };
    let warp = state.t * a + state.t0 * (1.0 - a);
    state.last_warp = warp;
    hand + warp
}

// ── Han ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HanMode {
    /// Constant offset from the first frame on.
    TranslationalShift,
    /// Offset ramps in linearly as the hand closes on the real target.
    InterpolatedReach,
}

#[derive(Debug, Clone, Copy)]
pub struct HanConfig {
    pub mode: HanMode,
    /// Boundary margin added to the activation distance for the
    /// interpolated reach.
    pub margin: f32,
}

impl Default for HanConfig {
    fn default() -> Self {
        Self {
            mode: HanMode::InterpolatedReach,
            margin: 0.0,
        }
    }
}

pub(crate) fn init_han(config: &HanConfig, ctx: &InitContext) -> StateKind {
    StateKind::Han {
        boundary: real_target_pos(ctx.pairs).distance(ctx.real_hand) + config.margin,
    }
}

pub(crate) fn apply_han(config: &HanConfig, boundary: f32, ctx: &ApplyContext) -> Vec3 {
    let hand = ctx.real_hand.position;
    let real = real_target_pos(ctx.pairs);
    let offset = virtual_target_pos(ctx.pairs) - real;

    match config.mode {
        HanMode::TranslationalShift => hand + offset,
        HanMode::InterpolatedReach => {
            let d = real.distance(hand);
            if d >= boundary {
                hand
            } else {
                hand + offset * (1.0 - d / boundary)
            }
        }
    }
}

// ── Zenner ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZennerMode {
    /// Redirect in the horizontal plane (forward/right).
    Horizontal,
    /// Redirect in the vertical plane (forward/up).
    Vertical,
    /// Pure radial scaling; `alpha` is the gain factor.
    GainBased,
    /// Caller-supplied redirection plane.
    Custom { forward: Vec3, redirection: Vec3 },
}

#[derive(Debug, Clone, Copy)]
pub struct ZennerConfig {
    pub mode: ZennerMode,
    /// Redirection angle in degrees, or the gain in `GainBased` mode.
    pub alpha: f32,
}

pub(crate) fn apply_zenner(config: &ZennerConfig, warp_origin: Vec3, ctx: &ApplyContext) -> Vec3 {
    let hand = ctx.real_hand.position;
    match config.mode {
        ZennerMode::Horizontal => {
            rotational_warp(hand, warp_origin, Vec3::FORWARD, Vec3::RIGHT, config.alpha)
        }
        ZennerMode::Vertical => {
            rotational_warp(hand, warp_origin, Vec3::FORWARD, Vec3::UP, config.alpha)
        }
        ZennerMode::GainBased => gain_warp(hand, warp_origin, config.alpha),
        ZennerMode::Custom {
            forward,
            redirection,
        } => rotational_warp(
            hand,
            warp_origin,
            forward.normalize(),
            redirection.normalize(),
            config.alpha,
        ),
    }
}

// ── Zenner, target-derived ──────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub(crate) struct ZennerAutoState {
    forward: Vec3,
    redirection: Vec3,
    alpha: f32,
    gain: f32,
}

/// Derive the redirection plane, angle, and gain from the warp origin and
/// the target pair. The plane is spanned by origin, real target, and
/// virtual target.
pub(crate) fn init_zenner_auto(ctx: &InitContext) -> StateKind {
    let real = real_target_pos(ctx.pairs);
    let virt = virtual_target_pos(ctx.pairs);
    let to_real = real - ctx.warp_origin;
    let to_virtual = virt - ctx.warp_origin;

    if to_real.length() < 1e-6 || to_virtual.length() < 1e-6 {
        warn!("target coincides with the warp origin, redirection disabled");
        return StateKind::Passthrough;
    }

    let plane_normal = (real - ctx.warp_origin)
        .cross(virt - ctx.warp_origin)
        .normalize();
    if plane_normal == Vec3::ZERO {
        // origin and both targets are collinear, fall back to gain only
        return StateKind::ZennerAuto(ZennerAutoState {
            forward: to_virtual.normalize(),
            redirection: Vec3::ZERO,
            alpha: 0.0,
            gain: to_virtual.length() / to_real.length(),
        });
    }

    let forward = to_virtual.normalize();
    StateKind::ZennerAuto(ZennerAutoState {
        forward,
        redirection: forward.cross(-plane_normal).normalize(),
        alpha: to_real.angle_to(to_virtual),
        gain: to_virtual.length() / to_real.length(),
    })
}

pub(crate) fn apply_zenner_auto(
    state: &ZennerAutoState,
    warp_origin: Vec3,
    ctx: &ApplyContext,
) -> Vec3 {
    let hand = ctx.real_hand.position;
    let rotated = if state.redirection == Vec3::ZERO {
        hand
    } else {
        rotational_warp(hand, warp_origin, state.forward, state.redirection, state.alpha)
    };
    gain_warp(rotated, warp_origin, state.gain)
}

// ── Perceptual thresholds ───────────────────────────────────

/// Limits on how far a target's redirection may go before users notice,
/// measured from the warp origin.
#[derive(Debug, Clone, Copy)]
pub struct BodyWarpThresholds {
    /// Largest horizontal redirection angle in degrees.
    pub horizontal_deg: f32,
    /// Largest vertical redirection angle in degrees.
    pub vertical_deg: f32,
    /// Upper bound of the unnoticeable gain band.
    pub gain_forwards: f32,
    /// Lower bound of the unnoticeable gain band.
    pub gain_downwards: f32,
}

impl Default for BodyWarpThresholds {
    fn default() -> Self {
        Self {
            horizontal_deg: 1.0,
            vertical_deg: 1.0,
            gain_forwards: 1.0,
            gain_downwards: 0.01,
        }
    }
}

impl BodyWarpThresholds {
    /// True when the real-to-virtual redirection of a target stays within
    /// every configured limit.
    pub fn allows(&self, warp_origin: Vec3, real_target: Vec3, virtual_target: Vec3) -> bool {
        let horizontal = redirection_angle(
            Vec3::FORWARD,
            Vec3::RIGHT,
            warp_origin,
            real_target,
            virtual_target,
        );
        if horizontal > self.horizontal_deg {
            return false;
        }

        let vertical = redirection_angle(
            Vec3::FORWARD,
            Vec3::UP,
            warp_origin,
            real_target,
            virtual_target,
        );
        if vertical > self.vertical_deg {
            return false;
        }

        let real_len = (real_target - warp_origin).length();
        if real_len < 1e-9 {
            return false;
        }
        let gain = (virtual_target - warp_origin).length() / real_len;
        gain >= self.gain_downwards && gain <= self.gain_forwards
    }
}

/// Angle between the real and virtual target offsets after projecting both
/// onto the plane spanned by `f` and `r` through the warp origin.
fn redirection_angle(f: Vec3, r: Vec3, origin: Vec3, real: Vec3, virt: Vec3) -> f32 {
    let project = |target: Vec3| {
        let h = f.cross(r).normalize();
        let height = (target - origin).dot(h);
        (target - h * height) - origin
    };
    project(virt).angle_to(project(real))
}

// ── Tests ────────────────────────────────────────────────────
