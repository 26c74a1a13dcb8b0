//! Gaze input pipeline: sample handoff, kinematics, saccade/blink
//! detection, and reference-plane intersection tracking.
//!
//! Each consumed sample flows through `signal::GazeSignalProcessor` and
//! then `saccade::SaccadeDetector`, once per frame. The
//! `intersection::GazeIntersectionTracker` runs alongside to supply the
//! saccade direction for the instantaneous-jump threshold.

pub mod intersection;
pub mod sample;
pub mod saccade;
pub mod signal;

pub use intersection::GazeIntersectionTracker;
pub use sample::{EyeGaze, GazeMailbox, GazeSample};
pub use saccade::{GazeEvent, SaccadeConfig, SaccadeDetector};
pub use signal::{GazeKinematics, GazeSignalProcessor, TrackKinematics};
