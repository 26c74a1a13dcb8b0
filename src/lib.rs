//! Handwarp — hand redirection for VR.
//!
//! Maps a tracked real hand to a virtual hand so that reaching one real
//! prop can serve several virtual objects. Body-warping techniques offset
//! the hand, world-warping techniques shift the scene, and the saccadic
//! variant hides instantaneous offsets behind saccades and blinks detected
//! from eye-tracker samples. `session::RedirectionSession` ties the pieces
//! together into a per-frame pipeline.

pub mod gaze;
pub mod math;
pub mod redirect;
pub mod replay;
pub mod session;
pub mod threshold;
