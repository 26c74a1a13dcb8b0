//! 3D math primitives for redirection geometry.
//!
//! Core types:
//! - `Vec3`: 3D vector with the dot/cross/angle operations the warp
//!   algorithms need
//! - `Quat`: rotations (axis-angle construction, vector rotation)
//! - `Pose`: position + orientation of a tracked or virtual object
//! - `Ray`: gaze and boundary rays
//!
//! Plus the ray/plane and ray/sphere intersection routines used by the
//! BSHR dummy-target computation and the gaze intersection tracker.

use std::ops::{Add, Div, Mul, Neg, Sub};

// ── Vec3 ─────────────────────────────────────────────────────

/// 3D vector, meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    /// World up axis.
    pub const UP: Self = Self {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };
    /// World forward axis (right-handed, -Z forward).
    pub const FORWARD: Self = Self {
        x: 0.0,
        y: 0.0,
        z: -1.0,
    };
    /// World right axis.
    pub const RIGHT: Self = Self {
        x: 1.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn normalize(self) -> Self {
        let len = self.length();
        if len < 1e-10 {
            return Self::ZERO;
        }
        self / len
    }

    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    /// Undirected angle to `other` in degrees, range [0, 180].
    /// Zero-length inputs yield 0.
    pub fn angle_to(self, other: Self) -> f32 {
        let denom = self.length() * other.length();
        if denom < 1e-10 {
            return 0.0;
        }
        let cos = (self.dot(other) / denom).clamp(-1.0, 1.0);
        cos.acos().to_degrees()
    }

    /// Signed angle from `self` to `other` about `axis`, degrees.
    /// The sign is that of the cross product's projection onto `axis`,
    /// which gives callers a consistent clockwise test.
    pub fn signed_angle_about(self, other: Self, axis: Vec3) -> f32 {
        let unsigned = self.angle_to(other);
        let sign = self.cross(other).dot(axis);
        if sign < 0.0 {
            -unsigned
        } else {
            unsigned
        }
    }

    /// Projection of `self` onto `other`. Zero-length `other` yields zero.
    pub fn project_onto(self, other: Self) -> Self {
        let denom = other.dot(other);
        if denom < 1e-10 {
            return Self::ZERO;
        }
        other * (self.dot(other) / denom)
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f32> for Vec3 {
    type Output = Self;
    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

// ── Quat ─────────────────────────────────────────────────────

/// Unit quaternion for rotations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Rotation of `angle_deg` degrees about `axis` (normalized internally).
    pub fn from_axis_angle(axis: Vec3, angle_deg: f32) -> Self {
        let axis = axis.normalize();
        let half = angle_deg.to_radians() * 0.5;
        let (s, c) = half.sin_cos();
        Self {
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
            w: c,
        }
    }

    /// Yaw (about +Y), pitch (about +X), roll (about +Z), radians.
    pub fn from_euler(yaw: f32, pitch: f32, roll: f32) -> Self {
        let (sy, cy) = (yaw * 0.5).sin_cos();
        let (sp, cp) = (pitch * 0.5).sin_cos();
        let (sr, cr) = (roll * 0.5).sin_cos();
        Self {
            x: cr * sp * cy + sr * cp * sy,
            y: cr * cp * sy - sr * sp * cy,
            z: sr * cp * cy - cr * sp * sy,
            w: cr * cp * cy + sr * sp * sy,
        }
    }

    pub fn inverse(self) -> Self {
        // unit quaternion: inverse == conjugate
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: self.w,
        }
    }

    pub fn mul(self, rhs: Self) -> Self {
        Self {
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        }
    }

    /// Rotate a vector by this quaternion.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // q * v * q^-1 via the optimized form
        let u = Vec3::new(self.x, self.y, self.z);
        let t = u.cross(v) * 2.0;
        v + t * self.w + u.cross(t)
    }

    /// Yaw component about +Y, degrees.
    pub fn yaw_deg(self) -> f32 {
        let fwd = self.rotate(Vec3::FORWARD);
        let flat = Vec3::new(fwd.x, 0.0, fwd.z);
        if flat.length() < 1e-6 {
            return 0.0;
        }
        Vec3::FORWARD.signed_angle_about(flat, Vec3::UP)
    }
}

// ── Pose ─────────────────────────────────────────────────────

/// Position + orientation of a tracked or virtual object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Pose {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation.rotate(Vec3::FORWARD)
    }

    pub fn right(&self) -> Vec3 {
        self.rotation.rotate(Vec3::RIGHT)
    }

    pub fn up(&self) -> Vec3 {
        self.rotation.rotate(Vec3::UP)
    }

    /// World direction -> this pose's local frame.
    pub fn inverse_transform_direction(&self, v: Vec3) -> Vec3 {
        self.rotation.inverse().rotate(v)
    }

    /// World point -> this pose's local frame.
    pub fn inverse_transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation.inverse().rotate(p - self.position)
    }

    /// Local direction -> world.
    pub fn transform_direction(&self, v: Vec3) -> Vec3 {
        self.rotation.rotate(v)
    }

    /// Local point -> world.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation.rotate(p) + self.position
    }
}

// ── Ray ──────────────────────────────────────────────────────

/// A ray in 3D space. Direction is normalized at construction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Evaluate the point at parameter t along the ray.
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

// ── Intersections ────────────────────────────────────────────

/// Intersection of a ray with an infinite plane given by a point and a
/// normal. Returns the hit point, or None when the ray is parallel to the
/// plane or the hit lies behind the origin.
pub fn ray_plane_intersection(ray: Ray, plane_point: Vec3, plane_normal: Vec3) -> Option<Vec3> {
    let denom = ray.direction.dot(plane_normal);
    if denom.abs() < 1e-8 {
        return None;
    }
    let t = (plane_point - ray.origin).dot(plane_normal) / denom;
    if t < 0.0 {
        return None;
    }
    Some(ray.at(t))
}

/// Intersection of an infinite line with an infinite plane. Unlike the ray
/// variant, hits behind `line_point` are reported; callers filter by
/// direction when they need a half-line.
pub fn line_plane_intersection(
    line_point: Vec3,
    line_direction: Vec3,
    plane_point: Vec3,
    plane_normal: Vec3,
) -> Option<Vec3> {
    let denom = line_direction.dot(plane_normal);
    if denom.abs() < 1e-8 {
        return None;
    }
    let t = (plane_point - line_point).dot(plane_normal) / denom;
    Some(line_point + line_direction * t)
}

/// Intersections of the segment-direction ray from `ray_start` through
/// `ray_end` with a sphere. Returns 0, 1, or 2 hit points with t >= 0
/// (quadratic discriminant method; t is relative to the unnormalized
/// segment direction).
pub fn ray_sphere_intersection(
    ray_start: Vec3,
    ray_end: Vec3,
    center: Vec3,
    radius: f32,
) -> Vec<Vec3> {
    let dir = ray_end - ray_start;
    let to_start = ray_start - center;

    let a = dir.dot(dir);
    if a < 1e-12 {
        return Vec::new();
    }
    let b = 2.0 * to_start.dot(dir);
    let c = to_start.dot(to_start) - radius * radius;

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return Vec::new();
    }
    let sqrt_d = discriminant.sqrt();
    let t1 = (-b - sqrt_d) / (2.0 * a);
    let t2 = (-b + sqrt_d) / (2.0 * a);

    let mut hits = Vec::new();
    if t1 >= 0.0 {
        hits.push(ray_start + dir * t1);
    }
    if t2 >= 0.0 && (t2 - t1).abs() > 1e-9 {
        hits.push(ray_start + dir * t2);
    }
    hits
}

/// True when `a` and `b` point the same way along a shared line.
pub fn points_same_direction(a: Vec3, b: Vec3) -> bool {
    a.normalize().dot(b.normalize()) > 0.0
}

// ── Tests ────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn vec_approx(a: Vec3, b: Vec3) -> bool {
        approx(a.x, b.x) && approx(a.y, b.y) && approx(a.z, b.z)
    }

    #[test]
    fn test_angle_to_basic() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        assert!(approx(a.angle_to(b), 90.0));
        assert!(approx(a.angle_to(a), 0.0));
        assert!(approx(a.angle_to(-a), 180.0));
        // zero-length input does not NaN
        assert!(approx(Vec3::ZERO.angle_to(a), 0.0));
    }

    #[test]
    fn test_signed_angle_about_up() {
        let a = Vec3::new(0.0, 0.0, -1.0);
        let b = Vec3::new(-1.0, 0.0, 0.0);
        let signed = a.signed_angle_about(b, Vec3::UP);
        assert!(approx(signed.abs(), 90.0));
        // flipping the operands flips the sign
        assert!(approx(b.signed_angle_about(a, Vec3::UP), -signed));
    }

    #[test]
    fn test_quat_axis_angle_rotation() {
        let q = Quat::from_axis_angle(Vec3::UP, 90.0);
        let rotated = q.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert!(vec_approx(rotated, Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_quat_inverse_round_trip() {
        let q = Quat::from_axis_angle(Vec3::new(0.3, 1.0, -0.2), 37.0);
        let v = Vec3::new(0.5, -1.2, 2.0);
        let back = q.inverse().rotate(q.rotate(v));
        assert!(vec_approx(back, v));
    }

    #[test]
    fn test_ray_plane_hit() {
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let hit = ray_plane_intersection(ray, Vec3::ZERO, Vec3::UP).unwrap();
        assert!(vec_approx(hit, Vec3::ZERO));
    }

    #[test]
    fn test_ray_plane_parallel_misses() {
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(ray_plane_intersection(ray, Vec3::ZERO, Vec3::UP).is_none());
    }

    #[test]
    fn test_ray_plane_behind_origin_misses() {
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        assert!(ray_plane_intersection(ray, Vec3::ZERO, Vec3::UP).is_none());
    }

    #[test]
    fn test_ray_sphere_two_hits() {
        let hits = ray_sphere_intersection(
            Vec3::new(-2.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::ZERO,
            1.0,
        );
        assert_eq!(hits.len(), 2);
        assert!(vec_approx(hits[0], Vec3::new(-1.0, 0.0, 0.0)));
        assert!(vec_approx(hits[1], Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_ray_sphere_miss() {
        let hits = ray_sphere_intersection(
            Vec3::new(-2.0, 5.0, 0.0),
            Vec3::new(2.0, 5.0, 0.0),
            Vec3::ZERO,
            1.0,
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn test_ray_sphere_tangent_single_hit() {
        let hits = ray_sphere_intersection(
            Vec3::new(-2.0, 1.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
            Vec3::ZERO,
            1.0,
        );
        assert_eq!(hits.len(), 1);
        assert!(vec_approx(hits[0], Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_project_onto() {
        let v = Vec3::new(1.0, 1.0, 0.0);
        let onto = Vec3::new(2.0, 0.0, 0.0);
        assert!(vec_approx(v.project_onto(onto), Vec3::new(1.0, 0.0, 0.0)));
        assert!(vec_approx(v.project_onto(Vec3::ZERO), Vec3::ZERO));
    }

    #[test]
    fn test_pose_local_world_round_trip() {
        let pose = Pose::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_axis_angle(Vec3::UP, 45.0),
        );
        let p = Vec3::new(-0.4, 0.9, 1.1);
        let back = pose.transform_point(pose.inverse_transform_point(p));
        let eps = (back - p).length();
        assert!(eps < 1e-4);
    }
}
