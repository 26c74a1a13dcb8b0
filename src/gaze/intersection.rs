//! Gaze/surface intersection tracking.
//!
//! Keeps the last two hit points of the combined gaze ray on a configured
//! reference plane. At saccade onset the difference of the two hits gives
//! the saccade direction on the surface, which is compared against the
//! remaining redirection offset in the head's view plane.

use tracing::warn;

use crate::math::{ray_plane_intersection, Pose, Ray, Vec3};

/// Tracks where the combined gaze ray lands on a reference plane.
///
/// `observe` is called once per consumed gaze sample; it shifts the stored
/// hit and intersects the new ray. `saccade_offset_angle` then measures the
/// angle between the on-surface saccade direction and a given offset
/// vector, both projected into the head's view plane.
#[derive(Debug)]
pub struct GazeIntersectionTracker {
    plane_point: Vec3,
    plane_normal: Vec3,
    previous_hit: Option<Vec3>,
    current_hit: Option<Vec3>,
}

impl GazeIntersectionTracker {
    pub fn new(plane_point: Vec3, plane_normal: Vec3) -> Self {
        Self {
            plane_point,
            plane_normal: plane_normal.normalize(),
            previous_hit: None,
            current_hit: None,
        }
    }

    /// Intersect a new gaze ray with the reference plane, retiring the
    /// previous hit. A zero gaze direction or a ray that misses the plane
    /// clears the current hit.
    pub fn observe(&mut self, gaze: &Ray) {
        self.previous_hit = self.current_hit;

        if gaze.direction == Vec3::ZERO {
            warn!("gaze ray direction is zero, no surface intersection");
            self.current_hit = None;
            return;
        }

        self.current_hit = ray_plane_intersection(*gaze, self.plane_point, self.plane_normal);
        if self.current_hit.is_none() {
            warn!("gaze ray missed the reference plane");
        }
    }

    /// Angle in degrees between the latest saccade direction on the surface
    /// and `target_offset`, both expressed in the head's view plane (head
    /// space with the depth component dropped).
    ///
    /// `None` when either hit point is missing; the caller falls back to a
    /// simulated angle.
    pub fn saccade_offset_angle(&self, target_offset: Vec3, head: &Pose) -> Option<f32> {
        let (previous, current) = match (self.previous_hit, self.current_hit) {
            (Some(p), Some(c)) => (p, c),
            _ => {
                warn!("missing surface intersection, no saccade offset angle");
                return None;
            }
        };

        let saccade_direction = current - previous;

        let mut saccade_view = head.inverse_transform_direction(saccade_direction);
        let mut offset_view = head.inverse_transform_direction(target_offset);
        saccade_view.z = 0.0;
        offset_view.z = 0.0;

        Some(saccade_view.angle_to(offset_view))
    }

    pub fn current_hit(&self) -> Option<Vec3> {
        self.current_hit
    }
}
