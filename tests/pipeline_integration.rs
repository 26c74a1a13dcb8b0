//! End-to-end pipeline tests.
//!
//! Drives the full path an application would use: gaze samples into the
//! session mailbox, signal processing, saccade/blink detection, and the
//! redirection techniques producing the virtual hand frame by frame.

use handwarp::gaze::{GazeEvent, GazeSample, GazeSignalProcessor, SaccadeConfig, SaccadeDetector};
use handwarp::math::{Pose, Quat, Vec3};
use handwarp::redirect::{
    BodyWarpThresholds, ChengConfig, PosePair, SaccadicConfig, Technique, WorldWarpConfig,
};
use handwarp::replay;
use handwarp::session::{RedirectionSession, RedirectionTarget, SessionConfig, SessionEvent};

use std::io::Cursor;

/// Route log output through the env filter, once per test binary.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn session_config(technique: Technique, targets: Vec<RedirectionTarget>) -> SessionConfig {
    SessionConfig {
        default_technique: technique,
        targets,
        reset_position: None,
        saccade: SaccadeConfig::default(),
        thresholds: BodyWarpThresholds::default(),
        intersection_plane: None,
    }
}

fn single_target(real: Vec3, virt: Vec3) -> Vec<RedirectionTarget> {
    vec![RedirectionTarget::new(vec![PosePair::at(real, virt)])]
}

/// Gaze direction swung `deg` degrees from straight ahead, in the
/// horizontal plane.
fn swung(deg: f32) -> Vec3 {
    let rad = deg.to_radians();
    Vec3::new(rad.sin(), 0.0, -rad.cos())
}

// ── Detector through the signal processor ──────────────────

#[test]
fn test_saccade_fires_on_second_candidate_tick() {
    init_tracing();
    // 40 ms ticks; angular steps of 3.6, 5.6 and 3.8 degrees give speeds
    // of 90, 140 and 95 deg/s, with the acceleration criterion satisfied
    // from the first step
    let mut processor = GazeSignalProcessor::new();
    let mut detector = SaccadeDetector::new(SaccadeConfig::default());

    let mut fired_at = None;
    for (tick, (ts, angle)) in [(0, 0.0), (40, 3.6), (80, 9.2), (120, 13.0)]
        .into_iter()
        .enumerate()
    {
        let sample = GazeSample::combined_only(ts, Vec3::ZERO, swung(angle), 1.0);
        let events = detector.update(&processor.process(&sample));
        if events.contains(&GazeEvent::SaccadeOccurred) {
            assert!(fired_at.is_none(), "saccade fired twice");
            fired_at = Some(tick);
        }
    }

    // tick 1 is the first measured speed (90 deg/s), tick 2 the second
    assert_eq!(fired_at, Some(2));
}

#[test]
fn test_slow_gaze_never_detects() {
    let mut processor = GazeSignalProcessor::new();
    let mut detector = SaccadeDetector::new(SaccadeConfig::default());

    for tick in 0..20 {
        // 1 degree per 40 ms = 25 deg/s, well below the candidate band
        let sample =
            GazeSample::combined_only(tick * 40, Vec3::ZERO, swung(tick as f32), 1.0);
        let events = detector.update(&processor.process(&sample));
        assert!(events.is_empty(), "unexpected events {events:?}");
    }
    assert!(!detector.saccade_active());
}

// ── Replay log into the session ─────────────────────────────

#[test]
fn test_replayed_log_drives_detection() {
    init_tracing();
    // synthetic 43-column log: straight ahead, then a fast three-tick sweep
    let mut csv = String::from("timestamp,saccade,spd,acc,size,opL,opR,...\n");
    for (ts, truth, angle) in [
        (0, false, 0.0),
        (40, false, 0.0),
        (80, true, 3.6),
        (120, true, 9.2),
        (160, false, 9.4),
    ] {
        let d = swung(angle);
        let mut fields = vec![ts.to_string(), truth.to_string()];
        fields.extend(["0", "0", "0", "1.0", "1.0"].map(String::from));
        for _ in 0..4 {
            // combined local/global pairs share the same direction/origin
            fields.extend([d.x.to_string(), d.y.to_string(), d.z.to_string()]);
            fields.extend(["0", "0", "0"].map(String::from));
        }
        for _ in 0..4 {
            fields.extend([d.x.to_string(), d.y.to_string(), d.z.to_string()]);
        }
        csv.push_str(&fields.join(","));
        csv.push('\n');
    }

    let frames = replay::parse_log(Cursor::new(csv)).unwrap();
    assert_eq!(frames.len(), 5);
    assert!(frames[2].saccade_truth);

    let targets = single_target(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.1));
    let mut session = RedirectionSession::new(session_config(
        Technique::Cheng(ChengConfig::default()),
        targets,
    ));
    let feed = session.gaze_feed();
    let hand = Pose::at(Vec3::ZERO);
    let head = Pose::default();

    let mut seen = Vec::new();
    for frame in &frames {
        feed.publish(frame.sample());
        seen.extend(session.frame(&hand, &head, 0.04).events);
    }
    assert!(seen.contains(&SessionEvent::Gaze(GazeEvent::SaccadeOccurred)));
    assert!(seen.contains(&SessionEvent::Gaze(GazeEvent::SaccadeIsOver)));
}

// ── Body warping through the session ────────────────────────

#[test]
fn test_azmandian_midway_through_session() {
    let mut targets = single_target(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.1));
    targets[0].warp_origin = Some(Vec3::ZERO);
    let mut session = RedirectionSession::new(session_config(Technique::Azmandian, targets));
    let head = Pose::default();

    session.advance_target(&Pose::at(Vec3::ZERO), &head).unwrap();

    // halfway along the reach, half the offset is applied
    let out = session.frame(&Pose::at(Vec3::new(0.5, 0.0, 0.0)), &head, 0.011);
    assert!(out.virtual_hand.position.distance(Vec3::new(0.5, 0.0, 0.05)) < 1e-6);

    // at the real target the virtual hand sits on the virtual target
    let out = session.frame(&Pose::at(Vec3::new(1.0, 0.0, 0.0)), &head, 0.011);
    assert!(out.virtual_hand.position.distance(Vec3::new(1.0, 0.0, 0.1)) < 1e-6);
}

#[test]
fn test_cheng_zero_warp_zone_near_body() {
    let targets = single_target(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.1));
    let mut session = RedirectionSession::new(session_config(
        Technique::Cheng(ChengConfig::default()),
        targets,
    ));
    let head = Pose::default();
    let near_body = Pose::at(Vec3::new(0.05, 0.0, 0.0));

    session.advance_target(&near_body, &head).unwrap();

    // within the zero-warp distance the shift numerator is the body
    // distance itself: ds = 0.05, dp = 0.95 - 0.03, so only a sliver of
    // the offset shows
    let out = session.frame(&near_body, &head, 0.011);
    let expected = 0.1 * (0.05 / (0.05 + 0.92));
    assert!((out.virtual_hand.position.z - expected).abs() < 1e-5);

    // leaving the zone restarts the ratio from the exit point
    let out = session.frame(&Pose::at(Vec3::new(0.5, 0.0, 0.0)), &head, 0.011);
    assert!(out.virtual_hand.position.distance(Vec3::new(0.5, 0.0, 0.0)) < 1e-6);

    // reaching the real target carries the full offset
    let out = session.frame(&Pose::at(Vec3::new(1.0, 0.0, 0.0)), &head, 0.011);
    assert!(out.virtual_hand.position.distance(Vec3::new(1.0, 0.0, 0.1)) < 1e-5);
}

// ── Blink-gated instantaneous redirection ───────────────────

#[test]
fn test_blink_jump_completes_small_remaining_offset() {
    let targets = single_target(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.1));
    let mut session = RedirectionSession::new(session_config(
        Technique::Saccadic(SaccadicConfig::default()),
        targets,
    ));
    let feed = session.gaze_feed();
    let head = Pose::default();
    let hand = Pose::at(Vec3::new(0.5, 0.0, 0.0));

    session.advance_target(&Pose::at(Vec3::ZERO), &head).unwrap();

    // open-eye frame establishes the continuous warp
    feed.publish(GazeSample::combined_only(0, Vec3::ZERO, Vec3::FORWARD, 1.0));
    let out = session.frame(&hand, &head, 0.011);
    let continuous_z = out.virtual_hand.position.z;
    assert!(continuous_z > 0.0 && continuous_z < 0.1);

    // a blink allows a jump; the remaining offset here is below the blink
    // threshold, so the hand lands on the full offset and stays there
    feed.publish(GazeSample::combined_only(10, Vec3::ZERO, Vec3::FORWARD, 0.0));
    let out = session.frame(&hand, &head, 0.011);
    assert!(out
        .events
        .contains(&SessionEvent::Gaze(GazeEvent::BlinkOccurred)));
    assert!(out.virtual_hand.position.distance(Vec3::new(0.5, 0.0, 0.1)) < 1e-5);

    // the next open frame keeps the jumped warp, no snap-back
    feed.publish(GazeSample::combined_only(20, Vec3::ZERO, Vec3::FORWARD, 1.0));
    let out = session.frame(&hand, &head, 0.011);
    assert!(out.virtual_hand.position.distance(Vec3::new(0.5, 0.0, 0.1)) < 1e-5);
}

// ── World warping through the session ───────────────────────

#[test]
fn test_world_rotation_emits_shift_while_head_turns() {
    let real = Pose::at(Vec3::new(1.0, 0.0, 0.0));
    let mut virt = Pose::at(Vec3::new(1.0, 0.0, 0.0));
    virt.rotation = Quat::from_axis_angle(Vec3::UP, 20.0);
    let targets = vec![RedirectionTarget::new(vec![PosePair::new(real, virt)])];

    let mut session = RedirectionSession::new(session_config(
        Technique::WorldWarpRotation(WorldWarpConfig::default()),
        targets,
    ));
    let hand = Pose::at(Vec3::ZERO);
    let mut head = Pose::default();

    session.advance_target(&hand, &head).unwrap();

    // a 1 degree turn over 20 ms is 50 deg/s, inside the trigger band
    head.rotation = Quat::from_axis_angle(Vec3::UP, 1.0);
    let out = session.frame(&hand, &head, 0.02);

    let shift = out.world_shift.expect("head turn should request a shift");
    assert!(shift.rotate_about_head_deg.abs() > 1e-3);
    assert_eq!(shift.translate, Vec3::ZERO);
    // world warping never moves the hand itself
    assert_eq!(out.virtual_hand.position, hand.position);
}

// ── Session bookkeeping across targets ──────────────────────

#[test]
fn test_redirection_event_pairing_over_a_cycle() {
    let targets = vec![
        RedirectionTarget::new(vec![PosePair::at(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.1),
        )]),
        RedirectionTarget::new(vec![PosePair::at(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 1.1),
        )]),
    ];
    let mut session = RedirectionSession::new(session_config(
        Technique::Cheng(ChengConfig::default()),
        targets,
    ));
    let hand = Pose::at(Vec3::ZERO);
    let head = Pose::default();

    let mut log = Vec::new();
    for _ in 0..4 {
        log.extend(session.advance_target(&hand, &head).unwrap());
    }
    log.extend(session.stop_redirection());

    let started = log
        .iter()
        .filter(|e| **e == SessionEvent::RedirectionStarted)
        .count();
    let ended = log
        .iter()
        .filter(|e| **e == SessionEvent::RedirectionEnded)
        .count();
    assert_eq!(started, 4);
    assert_eq!(ended, 4);

    // wrapped around the two-target list
    let out = session.frame(&hand, &head, 0.011);
    assert_eq!(out.virtual_hand.position, hand.position);
}
