//! Blink-suppressed hand redirection of Zenner, Regitz & Krueger.
//!
//! At activation a dummy target is derived: the point on the segment from
//! the virtual target V to the real target P that is closest to P while
//! still inside three perceptual boundaries (a rotation plane at +-betaMax
//! and two gain spheres at gMin/gMax). Continuous warping then aims at the
//! dummy target; the remaining offset to P is applied in one piece the
//! first time a valid blink occurs.

use tracing::{debug, warn};

use crate::math::{
    line_plane_intersection, points_same_direction, ray_sphere_intersection, Quat, Vec3,
};
use crate::redirect::{real_target_pos, virtual_target_pos, ApplyContext, InitContext, StateKind};

#[derive(Debug, Clone, Copy)]
pub struct BshrConfig {
    /// Rotation-plane boundary in degrees.
    pub beta_max: f32,
    /// Lower gain boundary.
    pub g_min: f32,
    /// Upper gain boundary.
    pub g_max: f32,
    /// Eye openness at or below this counts as closed.
    pub closed_eye_threshold: f32,
    /// A blink only counts as valid when the virtual hand was more than
    /// this many degrees away from the gaze ray before the eyes closed.
    pub gaze_clearance_deg: f32,
}

impl Default for BshrConfig {
    fn default() -> Self {
        Self {
            beta_max: 4.5,
            g_min: 0.94,
            g_max: 1.14,
            closed_eye_threshold: 0.5,
            gaze_clearance_deg: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BshrState {
    virtual_target: Vec3,
    real_target: Vec3,
    dummy_target: Vec3,
    /// `dummy_target - virtual_target`, the focus-check offset.
    dummy_offset: Vec3,
    /// Offset vector, zero until the first valid blink.
    b: Vec3,
    blink_applied: bool,
    /// Set while the eyes are open and the hand is clear of the gaze ray.
    hand_away_from_gaze: bool,
}

pub(crate) fn init(config: &BshrConfig, ctx: &InitContext) -> StateKind {
    let v = virtual_target_pos(ctx.pairs);
    let p = real_target_pos(ctx.pairs);
    let o = ctx.warp_origin;

    if (v - o).length() < 1e-6 || (p - o).length() < 1e-6 || (p - v).length() < 1e-6 {
        warn!("degenerate target geometry, redirection disabled");
        return StateKind::Passthrough;
    }

    let dummy = compute_dummy_target(o, v, p, config);
    debug!(?dummy, "dummy target computed");

    StateKind::Bshr(BshrState {
        virtual_target: v,
        real_target: p,
        dummy_target: dummy,
        dummy_offset: dummy - v,
        b: Vec3::ZERO,
        blink_applied: false,
        hand_away_from_gaze: false,
    })
}

pub(crate) fn apply(
    config: &BshrConfig,
    state: &mut BshrState,
    warp_origin: Vec3,
    ctx: &ApplyContext,
) -> Vec3 {
    track_blink(config, state, ctx);

    let hand = ctx.real_hand.position;
    let ds = (hand + state.b - warp_origin).length();
    let dp = (hand + state.b - state.dummy_target).length();

    let alpha = if ds + dp < 1e-9 { 0.0 } else { ds / (ds + dp) };
    let w = (state.virtual_target - state.dummy_target) * alpha + state.b;
    hand + w
}

/// Valid-blink gate. The clearance test runs while the eyes are open; the
/// offset is committed the first time both eyes close with clearance set.
fn track_blink(config: &BshrConfig, state: &mut BshrState, ctx: &ApplyContext) {
    if state.blink_applied {
        return;
    }
    let Some(gaze) = ctx.gaze else {
        return;
    };

    let closed = gaze.left.openness <= config.closed_eye_threshold
        && gaze.right.openness <= config.closed_eye_threshold;

    if closed {
        if state.hand_away_from_gaze {
            debug!("valid blink, committing remaining offset");
            state.b = state.dummy_target - state.real_target;
            state.blink_applied = true;
        }
    } else {
        // the hand counts as in focus if either its current position or
        // its post-jump position lies near the gaze ray
        let origin = gaze.combined.origin;
        let dir = gaze.combined.direction;
        let current = dir.angle_to(ctx.virtual_hand - origin);
        let jumped = dir.angle_to(ctx.virtual_hand + state.dummy_offset - origin);
        state.hand_away_from_gaze =
            current > config.gaze_clearance_deg && jumped > config.gaze_clearance_deg;
    }
}

// ── Dummy target ────────────────────────────────────────────

/// Closest point to P on the segment V->P that stays within the betaMax
/// rotation planes and the gMin/gMax gain spheres around the warp origin.
/// Every boundary intersection is expressed as a relative position t along
/// V->P (t=0 at V, t=1 at P) and the minimum qualifying t wins.
fn compute_dummy_target(o: Vec3, v: Vec3, p: Vec3, config: &BshrConfig) -> Vec3 {
    let ov = v - o;
    let vp = p - v;

    let relative = |point: Vec3| (point - v).length() / vp.length();

    // the real target itself is always a candidate
    let mut ts: Vec<f32> = vec![1.0];

    for angle in [config.beta_max, -config.beta_max] {
        if let Some(hit) = rotation_plane_intersection(o, v, p, angle) {
            ts.push(relative(hit));
        }
    }

    for hit in gain_sphere_intersections(o, v, p, config.g_max) {
        ts.push(relative(hit));
    }

    let min_before_gmin = ts.iter().copied().fold(f32::INFINITY, f32::min);

    // gMin is special: the segment can enter and leave the inner sphere,
    // and when both of its intersections undercut everything else the
    // boundary is not actually binding before the first one
    let mut gmin_below = 0;
    for hit in gain_sphere_intersections(o, v, p, config.g_min) {
        let t = relative(hit);
        if t < min_before_gmin {
            gmin_below += 1;
        }
        ts.push(t);
    }

    let t_min = if gmin_below == 2 {
        min_before_gmin
    } else {
        ts.iter().copied().fold(f32::INFINITY, f32::min)
    };

    v + vp * t_min
}

/// Intersection of the ray V->P with the plane obtained by rotating the
/// origin-to-virtual-target direction by `angle_deg` about the plane
/// normal of the target triangle. None when the hit lies behind V or on
/// the far side of the origin.
fn rotation_plane_intersection(o: Vec3, v: Vec3, p: Vec3, angle_deg: f32) -> Option<Vec3> {
    let ov = v - o;
    let op = p - o;
    let vp = p - v;

    let rotation_axis = ov.cross(op);
    if rotation_axis.length() < 1e-9 {
        return None;
    }
    let ov_rotated = Quat::from_axis_angle(rotation_axis.normalize(), angle_deg).rotate(ov);
    let plane_normal = ov_rotated.cross(rotation_axis).normalize();

    let hit = line_plane_intersection(v, vp.normalize(), o, plane_normal)?;
    let forward_on_segment = points_same_direction(hit - v, vp);
    let on_rotated_side = points_same_direction(hit - o, ov_rotated);
    (forward_on_segment && on_rotated_side).then_some(hit)
}

/// Intersections of the ray V->P with the sphere of radius |gain * OV|
/// around the warp origin, restricted to the forward side of V.
fn gain_sphere_intersections(o: Vec3, v: Vec3, p: Vec3, gain: f32) -> Vec<Vec3> {
    let radius = ((v - o) * gain).length();
    ray_sphere_intersection(v, p, o, radius)
        .into_iter()
        .filter(|hit| points_same_direction(*hit - v, p - v))
        .collect()
}

// ── Tests ────────────────────────────────────────────────────
