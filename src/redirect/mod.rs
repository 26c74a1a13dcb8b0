//! Redirection techniques.
//!
//! A technique maps the tracked real hand to a virtual hand pose while a
//! target is active. Body-warping variants offset the hand itself,
//! world-warping variants leave the hand alone and request a shift of the
//! whole virtual world, and the interpolation variant blends offsets over
//! several position pairs. `Technique` is a closed enum; the per-activation
//! scratch lives in `WarpState` so a technique value itself stays plain
//! configuration.

use tracing::{debug, warn};

use crate::gaze::GazeSample;
use crate::math::{Pose, Vec3};

pub mod body;
pub mod bshr;
pub mod idw;
pub mod saccadic;
pub mod world;

pub use body::{
    gain_warp, rotational_warp, BodyWarpThresholds, ChengConfig, HanConfig, HanMode, ZennerConfig,
    ZennerMode,
};
pub use bshr::BshrConfig;
pub use idw::IdwConfig;
pub use saccadic::{JumpTrigger, SaccadicConfig};
pub use world::WorldWarpConfig;

// ── Target geometry ─────────────────────────────────────────

/// One real/virtual pose correspondence of a target. The first pair of a
/// target is the primary one; additional pairs only matter for the
/// interpolation technique.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PosePair {
    pub real: Pose,
    pub virtual_pose: Pose,
}

impl PosePair {
    pub fn new(real: Pose, virtual_pose: Pose) -> Self {
        Self { real, virtual_pose }
    }

    /// Position-only pair, identity rotations.
    pub fn at(real: Vec3, virtual_pos: Vec3) -> Self {
        Self {
            real: Pose::at(real),
            virtual_pose: Pose::at(virtual_pos),
        }
    }
}

pub(crate) fn real_target_pos(pairs: &[PosePair]) -> Vec3 {
    pairs[0].real.position
}

pub(crate) fn virtual_target_pos(pairs: &[PosePair]) -> Vec3 {
    pairs[0].virtual_pose.position
}

// ── Contexts and output ─────────────────────────────────────

/// Inputs available when a target becomes active.
#[derive(Debug, Clone, Copy)]
pub struct InitContext<'a> {
    pub pairs: &'a [PosePair],
    pub head: &'a Pose,
    pub warp_origin: Vec3,
    pub real_hand: Vec3,
}

/// Per-frame inputs for `Technique::apply`.
#[derive(Debug, Clone, Copy)]
pub struct ApplyContext<'a> {
    pub real_hand: &'a Pose,
    /// Tracked head, also the body reference for zero-warp distances.
    pub head: &'a Pose,
    pub pairs: &'a [PosePair],
    pub delta_s: f32,
    /// Latest gaze sample, when one was consumed this frame.
    pub gaze: Option<&'a GazeSample>,
    /// Virtual hand position of the previous frame.
    pub virtual_hand: Vec3,
}

/// Requested shift of the whole virtual world, applied by the host.
/// Rotation is about the head position around the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldShift {
    pub rotate_about_head_deg: f32,
    pub translate: Vec3,
}

/// Result of one technique frame.
#[derive(Debug, Clone, Copy)]
pub struct WarpOutcome {
    pub virtual_hand: Vec3,
    pub world_shift: Option<WorldShift>,
    /// World-warping convergence. Always false for hand-warping variants.
    pub aligned: bool,
}

impl WarpOutcome {
    fn hand(position: Vec3) -> Self {
        Self {
            virtual_hand: position,
            world_shift: None,
            aligned: false,
        }
    }
}

// ── Technique and state ─────────────────────────────────────

/// The fixed set of redirection techniques. Variants carry their
/// configuration; activation scratch lives in [`WarpState`].
#[derive(Debug, Clone)]
pub enum Technique {
    /// Progress-ratio body warp of Azmandian et al.
    Azmandian,
    /// Distance-ratio body warp with a zero-warp zone near the body.
    Cheng(ChengConfig),
    /// Static shift or interpolated reach of Han et al.
    Han(HanConfig),
    /// Rotational/gain warps of Zenner & Krueger with a fixed angle.
    Zenner(ZennerConfig),
    /// Zenner warp with plane, angle, and gain derived from the target
    /// pair at activation.
    ZennerAuto,
    /// Blink-suppressed hybrid of Zenner, Regitz & Krueger.
    Bshr(BshrConfig),
    WorldWarpRotation(WorldWarpConfig),
    WorldWarpTranslation(WorldWarpConfig),
    WorldWarpCombined(WorldWarpConfig),
    /// Inverse distance weighting over all position pairs.
    Idw(IdwConfig),
    /// Cheng plus saccade/blink-gated instantaneous jumps.
    Saccadic(SaccadicConfig),
}

/// Per-activation scratch. Created by `Technique::init`, owned by the
/// session, mutated only inside the current frame's `apply` call.
#[derive(Debug, Clone)]
pub struct WarpState {
    /// Reference point redirection progress is measured from. Captured at
    /// activation; instantaneous jumps and Cheng's zero-warp zone exit
    /// rebase it to the current hand position.
    pub warp_origin: Vec3,
    pub(crate) kind: StateKind,
}

impl WarpState {
    fn new(warp_origin: Vec3, kind: StateKind) -> Self {
        Self { warp_origin, kind }
    }

    fn passthrough(warp_origin: Vec3) -> Self {
        Self::new(warp_origin, StateKind::Passthrough)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum StateKind {
    /// Degraded mode after a configuration error: virtual hand mirrors the
    /// real hand.
    Passthrough,
    Azmandian {
        t: Vec3,
    },
    Cheng(body::ChengState),
    Han {
        boundary: f32,
    },
    Zenner,
    ZennerAuto(body::ZennerAutoState),
    Bshr(bshr::BshrState),
    WorldRotation(world::WorldRotationState),
    WorldTranslation(world::WorldTranslationState),
    WorldCombined(world::WorldCombinedState),
    Idw,
    Saccadic(saccadic::SaccadicState),
}

impl Technique {
    /// Set up the per-activation state. Configuration problems (no position
    /// pair, degenerate target geometry) are logged and degrade to a
    /// passthrough state instead of failing the session.
    pub fn init(&self, ctx: &InitContext) -> WarpState {
        if ctx.pairs.is_empty() {
            warn!("target has no real/virtual position pair, redirection disabled");
            return WarpState::passthrough(ctx.warp_origin);
        }

        let kind = match self {
            Technique::Azmandian => body::init_azmandian(ctx),
            Technique::Cheng(config) => body::init_cheng(config, ctx),
            Technique::Han(config) => body::init_han(config, ctx),
            Technique::Zenner(_) => StateKind::Zenner,
            Technique::ZennerAuto => body::init_zenner_auto(ctx),
            Technique::Bshr(config) => bshr::init(config, ctx),
            Technique::WorldWarpRotation(_) => world::init_rotation(ctx),
            Technique::WorldWarpTranslation(_) => world::init_translation(ctx),
            Technique::WorldWarpCombined(_) => world::init_combined(ctx),
            Technique::Idw(_) => StateKind::Idw,
            Technique::Saccadic(config) => saccadic::init(config, ctx),
        };
        WarpState::new(ctx.warp_origin, kind)
    }

    /// Compute this frame's virtual hand position (and world shift, for
    /// the world-warping variants).
    pub fn apply(&self, state: &mut WarpState, ctx: &ApplyContext) -> WarpOutcome {
        if ctx.pairs.is_empty() || matches!(state.kind, StateKind::Passthrough) {
            return WarpOutcome::hand(ctx.real_hand.position);
        }

        match (self, &mut state.kind) {
            (Technique::Azmandian, StateKind::Azmandian { t }) => {
                WarpOutcome::hand(body::apply_azmandian(*t, state.warp_origin, ctx))
            }
            (Technique::Cheng(config), StateKind::Cheng(cheng)) => {
                WarpOutcome::hand(body::apply_cheng(config, cheng, &mut state.warp_origin, ctx))
            }
            (Technique::Han(config), StateKind::Han { boundary }) => {
                WarpOutcome::hand(body::apply_han(config, *boundary, ctx))
            }
            (Technique::Zenner(config), StateKind::Zenner) => {
                WarpOutcome::hand(body::apply_zenner(config, state.warp_origin, ctx))
            }
            (Technique::ZennerAuto, StateKind::ZennerAuto(auto)) => {
                WarpOutcome::hand(body::apply_zenner_auto(auto, state.warp_origin, ctx))
            }
            (Technique::Bshr(config), StateKind::Bshr(bshr)) => {
                WarpOutcome::hand(bshr::apply(config, bshr, state.warp_origin, ctx))
            }
            (Technique::WorldWarpRotation(config), StateKind::WorldRotation(rot)) => {
                world::apply_rotation(config, rot, ctx)
            }
            (Technique::WorldWarpTranslation(config), StateKind::WorldTranslation(trans)) => {
                world::apply_translation(config, trans, ctx)
            }
            (Technique::WorldWarpCombined(config), StateKind::WorldCombined(comb)) => {
                world::apply_combined(config, comb, ctx)
            }
            (Technique::Idw(config), StateKind::Idw) => {
                WarpOutcome::hand(idw::apply(config, ctx))
            }
            (Technique::Saccadic(config), StateKind::Saccadic(sac)) => WarpOutcome::hand(
                body::apply_cheng(&config.cheng, &mut sac.cheng, &mut state.warp_origin, ctx),
            ),
            (technique, _) => {
                warn!(?technique, "warp state does not match technique");
                WarpOutcome::hand(ctx.real_hand.position)
            }
        }
    }

    /// Called when the target is deactivated.
    pub fn end(&self) {
        debug!(technique = ?self, "redirection ended");
    }

    /// Whether perceptual threshold checks apply to this technique.
    /// World warping and interpolation have no body-warp thresholds.
    pub fn has_thresholds(&self) -> bool {
        matches!(
            self,
            Technique::Azmandian
                | Technique::Cheng(_)
                | Technique::Han(_)
                | Technique::Zenner(_)
                | Technique::ZennerAuto
                | Technique::Bshr(_)
                | Technique::Saccadic(_)
        )
    }

    /// Whether the target's redirection stays within the given perceptual
    /// limits when measured from `warp_origin`.
    pub fn is_in_threshold(
        &self,
        thresholds: &BodyWarpThresholds,
        warp_origin: Vec3,
        pairs: &[PosePair],
    ) -> bool {
        if !self.has_thresholds() || pairs.is_empty() {
            return true;
        }
        thresholds.allows(
            warp_origin,
            real_target_pos(pairs),
            virtual_target_pos(pairs),
        )
    }
}
