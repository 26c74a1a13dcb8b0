//! Frame-loop orchestration: target cycling, gaze pipeline, technique
//! dispatch, and the event stream other subsystems subscribe to.

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::gaze::{
    GazeEvent, GazeIntersectionTracker, GazeMailbox, GazeSignalProcessor, SaccadeConfig,
    SaccadeDetector,
};
use crate::math::{Pose, Vec3};
use crate::redirect::{
    saccadic, ApplyContext, BodyWarpThresholds, InitContext, JumpTrigger, PosePair, Technique,
    WarpState, WorldShift,
};

/// Real and virtual hands closer than this count as aligned, meters.
pub const HAND_ALIGNMENT_DISTANCE: f32 = 0.01;

// ── Configuration ───────────────────────────────────────────

/// One redirection target: an ordered set of real/virtual pose pairs plus
/// optional per-target overrides.
#[derive(Debug, Clone)]
pub struct RedirectionTarget {
    pub pairs: Vec<PosePair>,
    /// Technique override; the session default applies when None.
    pub technique: Option<Technique>,
    /// Warp-origin override; the hand position at activation applies when
    /// None.
    pub warp_origin: Option<Vec3>,
    /// Route to the session's reset position once this target is reached,
    /// instead of redirecting target-to-target.
    pub use_reset_position: bool,
}

impl RedirectionTarget {
    pub fn new(pairs: Vec<PosePair>) -> Self {
        Self {
            pairs,
            technique: None,
            warp_origin: None,
            use_reset_position: false,
        }
    }
}

/// Session-level configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub default_technique: Technique,
    pub targets: Vec<RedirectionTarget>,
    /// Intermediate position used between redirections. Needs an
    /// unmodified pose pair (real == virtual).
    pub reset_position: Option<RedirectionTarget>,
    pub saccade: SaccadeConfig,
    pub thresholds: BodyWarpThresholds,
    /// Reference plane for measuring saccade directions, as point and
    /// normal. Without one, saccade jumps fall back to a simulated angle.
    pub intersection_plane: Option<(Vec3, Vec3)>,
}

impl SessionConfig {
    /// Check the configuration before starting a session. Geometric
    /// degeneracies remain activation-time warnings; these are the errors
    /// no session can run with.
    pub fn validate(&self) -> Result<()> {
        for (index, target) in self.targets.iter().enumerate() {
            if target.pairs.is_empty() {
                bail!("target {index} has no real/virtual position pair");
            }
        }
        if let Some(reset) = &self.reset_position {
            if reset.pairs.is_empty() {
                bail!("reset position has no position pair");
            }
        }

        let s = &self.saccade;
        if s.speed_threshold <= 0.0 || s.speed_noise_threshold <= s.speed_threshold {
            bail!(
                "saccade speed band is empty: {} to {} deg/s",
                s.speed_threshold,
                s.speed_noise_threshold
            );
        }
        if !(0.0..=1.0).contains(&s.closed_eye_threshold) {
            bail!(
                "closed eye threshold {} outside the openness range 0 to 1",
                s.closed_eye_threshold
            );
        }
        if s.break_timer_s < 0.0 {
            bail!("post-blink break timer must not be negative");
        }
        Ok(())
    }
}

// ── Events and output ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Gaze(GazeEvent),
    RedirectionStarted,
    RedirectionEnded,
    TargetReached,
}

/// Result of one session frame.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub virtual_hand: Pose,
    /// World transform shift requested by a world-warping technique.
    pub world_shift: Option<WorldShift>,
    /// Real and virtual hand within [`HAND_ALIGNMENT_DISTANCE`].
    pub hands_aligned: bool,
    pub events: Vec<SessionEvent>,
}

// ── Session ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveKind {
    Target(usize),
    Reset,
}

#[derive(Debug)]
struct ActiveRedirection {
    kind: ActiveKind,
    technique: Technique,
    state: WarpState,
}

/// Pose pairs of the active entry. An activation always refers to an
/// existing entry; a missing one degrades to an empty slice, which the
/// techniques treat as passthrough.
fn pairs_for(config: &SessionConfig, kind: ActiveKind) -> &[PosePair] {
    match kind {
        ActiveKind::Target(index) => config
            .targets
            .get(index)
            .map(|target| target.pairs.as_slice())
            .unwrap_or(&[]),
        ActiveKind::Reset => config
            .reset_position
            .as_ref()
            .map(|target| target.pairs.as_slice())
            .unwrap_or(&[]),
    }
}

/// Owns the per-frame pipeline. Gaze samples arrive through the shared
/// mailbox; everything else is synchronous inside `frame`.
#[derive(Debug)]
pub struct RedirectionSession {
    config: SessionConfig,
    mailbox: Arc<GazeMailbox>,
    signal: GazeSignalProcessor,
    detector: SaccadeDetector,
    tracker: Option<GazeIntersectionTracker>,
    active: Option<ActiveRedirection>,
    /// Index of the last real (non-reset) target, drives round-robin.
    last_target: Option<usize>,
    reached_target: bool,
    virtual_hand: Pose,
}

impl RedirectionSession {
    pub fn new(config: SessionConfig) -> Self {
        let detector = SaccadeDetector::new(config.saccade);
        let tracker = config
            .intersection_plane
            .map(|(point, normal)| GazeIntersectionTracker::new(point, normal));
        Self {
            config,
            mailbox: Arc::new(GazeMailbox::new()),
            signal: GazeSignalProcessor::new(),
            detector,
            tracker,
            active: None,
            last_target: None,
            reached_target: false,
            virtual_hand: Pose::default(),
        }
    }

    /// Shared handle for the gaze producer (tracker callback or replay
    /// driver).
    pub fn gaze_feed(&self) -> Arc<GazeMailbox> {
        Arc::clone(&self.mailbox)
    }

    pub fn active_target(&self) -> Option<usize> {
        match self.active.as_ref()?.kind {
            ActiveKind::Target(index) => Some(index),
            ActiveKind::Reset => None,
        }
    }

    pub fn reached_target(&self) -> bool {
        self.reached_target
    }

    // ── Target switching ──

    /// Round-robin to the next target. The first call activates the first
    /// list entry; afterwards the successor of the last real target, also
    /// when a reset position is currently active.
    pub fn advance_target(&mut self, real_hand: &Pose, head: &Pose) -> Result<Vec<SessionEvent>> {
        if self.config.targets.is_empty() {
            bail!("no redirection targets configured");
        }

        let mut events = Vec::new();
        self.end_active(&mut events);

        let index = match self.last_target {
            None => 0,
            Some(last) => (last + 1) % self.config.targets.len(),
        };
        self.activate(ActiveKind::Target(index), real_hand, head, &mut events);
        Ok(events)
    }

    /// External arrival signal (the real hand touched the current real
    /// target). Emits `TargetReached` once per activation and routes to
    /// the reset position when the target asks for it.
    pub fn hand_reached_target(
        &mut self,
        real_hand: &Pose,
        head: &Pose,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let Some(active) = self.active.as_ref() else {
            return events;
        };
        if self.reached_target {
            return events;
        }
        self.reached_target = true;
        events.push(SessionEvent::TargetReached);
        info!("target reached");

        let route_to_reset = match active.kind {
            ActiveKind::Target(index) => {
                self.config.targets[index].use_reset_position
                    && self.config.reset_position.is_some()
            }
            ActiveKind::Reset => false,
        };
        if route_to_reset {
            self.end_active(&mut events);
            self.activate(ActiveKind::Reset, real_hand, head, &mut events);
        }
        events
    }

    /// Deactivate the current target; the hand mirrors 1:1 afterwards.
    pub fn stop_redirection(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        self.end_active(&mut events);
        events
    }

    fn end_active(&mut self, events: &mut Vec<SessionEvent>) {
        if let Some(active) = self.active.take() {
            if let ActiveKind::Target(index) = active.kind {
                self.last_target = Some(index);
            }
            active.technique.end();
            events.push(SessionEvent::RedirectionEnded);
        }
    }

    fn activate(
        &mut self,
        kind: ActiveKind,
        real_hand: &Pose,
        head: &Pose,
        events: &mut Vec<SessionEvent>,
    ) {
        let target = match kind {
            ActiveKind::Target(index) => Some(&self.config.targets[index]),
            ActiveKind::Reset => self.config.reset_position.as_ref(),
        };
        let technique = target
            .and_then(|t| t.technique.clone())
            .unwrap_or_else(|| self.config.default_technique.clone());
        let warp_origin = target
            .and_then(|t| t.warp_origin)
            .unwrap_or(real_hand.position);

        let state = technique.init(&InitContext {
            pairs: pairs_for(&self.config, kind),
            head,
            warp_origin,
            real_hand: real_hand.position,
        });

        debug!(?kind, "redirection started");
        self.reached_target = false;
        self.active = Some(ActiveRedirection {
            kind,
            technique,
            state,
        });
        events.push(SessionEvent::RedirectionStarted);
    }

    /// Whether the active target's redirection stays inside the session's
    /// perceptual thresholds.
    pub fn active_target_in_threshold(&self) -> bool {
        let Some(active) = self.active.as_ref() else {
            return true;
        };
        let pairs = match active.kind {
            ActiveKind::Target(index) => &self.config.targets[index].pairs,
            ActiveKind::Reset => return true,
        };
        active.technique.is_in_threshold(
            &self.config.thresholds,
            active.state.warp_origin,
            pairs,
        )
    }

    // ── Frame loop ──

    /// One frame: drain the gaze mailbox, run detection, apply the active
    /// technique, and report the virtual hand. Without an active target
    /// the virtual hand mirrors the real hand 1:1.
    pub fn frame(&mut self, real_hand: &Pose, head: &Pose, delta_s: f32) -> FrameOutput {
        let mut events = Vec::new();

        let sample = self.mailbox.take();
        if let Some(sample) = &sample {
            let kinematics = self.signal.process(sample);
            if let Some(tracker) = &mut self.tracker {
                tracker.observe(&sample.combined);
            }
            for event in self.detector.update(&kinematics) {
                events.push(SessionEvent::Gaze(event));
                self.handle_gaze_event(event, real_hand, head);
            }
        }

        let (virtual_position, world_shift) = match self.active.as_mut() {
            None => (real_hand.position, None),
            Some(active) => {
                let ctx = ApplyContext {
                    real_hand,
                    head,
                    pairs: pairs_for(&self.config, active.kind),
                    delta_s,
                    gaze: sample.as_ref(),
                    virtual_hand: self.virtual_hand.position,
                };
                let outcome = active.technique.apply(&mut active.state, &ctx);
                (outcome.virtual_hand, outcome.world_shift)
            }
        };

        // hand orientation always follows the real hand
        self.virtual_hand = Pose::new(virtual_position, real_hand.rotation);
        let hands_aligned =
            self.virtual_hand.position.distance(real_hand.position) < HAND_ALIGNMENT_DISTANCE;

        FrameOutput {
            virtual_hand: self.virtual_hand,
            world_shift,
            hands_aligned,
            events,
        }
    }

    /// Saccade/blink events trigger instantaneous jumps when the active
    /// technique is saccadic redirection.
    fn handle_gaze_event(&mut self, event: GazeEvent, real_hand: &Pose, head: &Pose) {
        let trigger = match event {
            GazeEvent::SaccadeOccurred => JumpTrigger::Saccade,
            GazeEvent::BlinkOccurred => JumpTrigger::Blink,
            GazeEvent::SaccadeIsOver | GazeEvent::BlinkIsOver => return,
        };
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Technique::Saccadic(config) = &active.technique else {
            return;
        };
        let pairs = pairs_for(&self.config, active.kind);
        if pairs.is_empty() {
            return;
        }

        let measured_angle = match trigger {
            JumpTrigger::Saccade => self.tracker.as_ref().and_then(|tracker| {
                let total_offset = pairs[0].virtual_pose.position - pairs[0].real.position;
                tracker.saccade_offset_angle(total_offset, head)
            }),
            JumpTrigger::Blink => None,
        };

        if let Some(new_virtual) = saccadic::instantaneous_jump(
            config,
            &mut active.state,
            trigger,
            real_hand.position,
            measured_angle,
        ) {
            self.virtual_hand = Pose::new(new_virtual, real_hand.rotation);
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
