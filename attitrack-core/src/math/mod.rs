//! Vector, Quaternion and Angle Primitives
//!
//! Everything here is plain `Copy` data backed by `f32` and `libm`, so the
//! estimators stay usable without `std`.
//!
//! ## Conventions
//!
//! - Body frame: x forward, y left, z up. A level vehicle at rest reads
//!   `accel = (0, 0, +g)`.
//! - Quaternions are scalar-first `(w, x, y, z)`.
//! - Euler angles use the aerospace ZYX sequence (yaw, then pitch, then roll).
//!
//! ```text
//! roll  = atan2(2(wx + yz), 1 - 2(x² + y²))
//! pitch = asin(clamp(2(wy - zx), -1, 1))
//! yaw   = atan2(2(wz + xy), 1 - 2(y² + z²))
//! ```

pub mod matrix;

use core::ops::{Add, Mul, Sub};
use libm::{asinf, atan2f, cosf, sinf, sqrtf};

use crate::constants::physics::{DEG_TO_RAD, RAD_TO_DEG};

/// Three-axis vector used for both gyro rates and accelerations
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vector3 {
    /// Build a vector from its components
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// All-zero vector
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Euclidean length
    pub fn norm(&self) -> f32 {
        sqrtf(self.x * self.x + self.y * self.y + self.z * self.z)
    }

    /// Unit vector in the same direction, or `None` below `min_norm`
    pub fn normalized(&self, min_norm: f32) -> Option<Self> {
        let norm = self.norm();
        if !(norm > min_norm) {
            return None;
        }
        Some(self.scale(1.0 / norm))
    }

    /// Multiply every component by `k`
    pub fn scale(&self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }

    /// True when no component is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Interpret components as degrees and convert to radians
    pub fn to_radians(&self) -> Self {
        self.scale(DEG_TO_RAD)
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f32> for Vector3 {
    type Output = Self;

    fn mul(self, k: f32) -> Self {
        self.scale(k)
    }
}

/// Scalar-first rotation quaternion
///
/// Estimators keep this at unit length; the constructors do not enforce it so
/// intermediate integration results can be represented before renormalizing.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quaternion {
    /// Scalar part
    pub w: f32,
    /// X (roll axis) part
    pub x: f32,
    /// Y (pitch axis) part
    pub y: f32,
    /// Z (yaw axis) part
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// Build a quaternion from its components
    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// No rotation
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Four-dimensional length
    pub fn norm(&self) -> f32 {
        sqrtf(self.dot(self))
    }

    /// Four-dimensional dot product
    pub fn dot(&self, other: &Self) -> f32 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Rescale to unit length
    ///
    /// Returns `None` for a zero or non-finite quaternion, which callers treat
    /// as state corruption.
    pub fn normalize(&self) -> Option<Self> {
        let norm = self.norm();
        if !norm.is_finite() || norm <= f32::EPSILON {
            return None;
        }
        let inv = 1.0 / norm;
        Some(Self::new(self.w * inv, self.x * inv, self.y * inv, self.z * inv))
    }

    /// True when no component is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Negate every component (same rotation, opposite hemisphere)
    pub fn negated(&self) -> Self {
        Self::new(-self.w, -self.x, -self.y, -self.z)
    }

    /// Build from ZYX Euler angles in degrees
    pub fn from_euler_deg(roll: f32, pitch: f32, yaw: f32) -> Self {
        let (sr, cr) = half_sin_cos(roll * DEG_TO_RAD);
        let (sp, cp) = half_sin_cos(pitch * DEG_TO_RAD);
        let (sy, cy) = half_sin_cos(yaw * DEG_TO_RAD);

        Self::new(
            cr * cp * cy + sr * sp * sy,
            sr * cp * cy - cr * sp * sy,
            cr * sp * cy + sr * cp * sy,
            cr * cp * sy - sr * sp * cy,
        )
    }

    /// Convert to ZYX Euler angles in degrees, each in `(-180, 180]`
    ///
    /// The pitch `asin` argument is clamped to `[-1, 1]`: rounding near ±90°
    /// would otherwise yield NaN.
    pub fn to_euler_deg(&self) -> (f32, f32, f32) {
        let Self { w, x, y, z } = *self;

        let sinr_cosp = 2.0 * (w * x + y * z);
        let cosr_cosp = 1.0 - 2.0 * (x * x + y * y);
        let roll = atan2f(sinr_cosp, cosr_cosp);

        let sinp = clamp_unit(2.0 * (w * y - z * x));
        let pitch = asinf(sinp);

        let siny_cosp = 2.0 * (w * z + x * y);
        let cosy_cosp = 1.0 - 2.0 * (y * y + z * z);
        let yaw = atan2f(siny_cosp, cosy_cosp);

        (roll * RAD_TO_DEG, pitch * RAD_TO_DEG, yaw * RAD_TO_DEG)
    }

    /// Normalized linear interpolation toward `target` by `t` in `[0, 1]`
    ///
    /// Takes the short way round: `target` is flipped into this quaternion's
    /// hemisphere first.
    pub fn nlerp(&self, target: &Self, t: f32) -> Self {
        let target = if self.dot(target) < 0.0 { target.negated() } else { *target };
        let blended = Self::new(
            self.w + (target.w - self.w) * t,
            self.x + (target.x - self.x) * t,
            self.y + (target.y - self.y) * t,
            self.z + (target.z - self.z) * t,
        );
        blended.normalize().unwrap_or(target)
    }

    /// Angular distance to `other` in degrees, independent of sign
    pub fn angle_to_deg(&self, other: &Self) -> f32 {
        let d = clamp_unit(self.dot(other).abs());
        2.0 * libm::acosf(d) * RAD_TO_DEG
    }
}

fn half_sin_cos(angle_rad: f32) -> (f32, f32) {
    let half = angle_rad * 0.5;
    (sinf(half), cosf(half))
}

/// Clamp to the `asin`/`acos` domain
pub fn clamp_unit(value: f32) -> f32 {
    value.max(-1.0).min(1.0)
}

/// Wrap an angle in degrees into `[0, 360)`
///
/// Tiny negative inputs round to exactly 360.0 in `f32`; that case folds
/// back to zero.
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = positive_fmod(angle, 360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed shortest rotation from `from` to `to` in degrees, in `(-180, 180]`
pub fn shortest_delta_deg(from: f32, to: f32) -> f32 {
    let delta = wrap_degrees(to - from);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

fn positive_fmod(value: f32, modulus: f32) -> f32 {
    let r = libm::fmodf(value, modulus);
    if r < 0.0 {
        r + modulus
    } else {
        r
    }
}

/// Wrap an angle in radians into `(-π, π]`
pub fn wrap_pi(angle: f32) -> f32 {
    use core::f32::consts::PI;
    let wrapped = positive_fmod(angle + PI, 2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_norm_and_normalize() {
        let v = Vector3::new(3.0, 4.0, 0.0);
        assert_eq!(v.norm(), 5.0);

        let unit = v.normalized(1e-6).unwrap();
        assert!((unit.norm() - 1.0).abs() < 1e-6);

        assert!(Vector3::zero().normalized(1e-6).is_none());
        assert!(Vector3::new(f32::NAN, 0.0, 0.0).normalized(1e-6).is_none());
    }

    #[test]
    fn wrap_degrees_range() {
        assert_eq!(wrap_degrees(720.0), 0.0);
        assert_eq!(wrap_degrees(-90.0), 270.0);
        assert_eq!(wrap_degrees(359.5), 359.5);

        // Tiny negative values must not round up to 360
        let w = wrap_degrees(-1e-9);
        assert!(w >= 0.0 && w < 360.0);
    }

    #[test]
    fn shortest_delta_crosses_zero() {
        assert!((shortest_delta_deg(350.0, 10.0) - 20.0).abs() < 1e-4);
        assert!((shortest_delta_deg(10.0, 350.0) + 20.0).abs() < 1e-4);
        assert!((shortest_delta_deg(0.0, 90.0) - 90.0).abs() < 1e-4);
    }

    #[test]
    fn wrap_pi_range() {
        use core::f32::consts::PI;
        assert!((wrap_pi(2.0 * PI + 0.5) - 0.5).abs() < 1e-5);
        assert!((wrap_pi(PI + 0.25) + PI - 0.25).abs() < 1e-5);
        assert!((wrap_pi(-0.5) + 0.5).abs() < 1e-6);
    }

    #[test]
    fn quaternion_euler_known_values() {
        let q = Quaternion::from_euler_deg(0.0, 0.0, 90.0);
        let s = core::f32::consts::FRAC_1_SQRT_2;
        assert!((q.w - s).abs() < 1e-6);
        assert!((q.z - s).abs() < 1e-6);

        let (roll, pitch, yaw) = Quaternion::from_euler_deg(30.0, -20.0, 45.0).to_euler_deg();
        assert!((roll - 30.0).abs() < 1e-3);
        assert!((pitch + 20.0).abs() < 1e-3);
        assert!((yaw - 45.0).abs() < 1e-3);
    }

    #[test]
    fn gimbal_lock_pitch_is_finite() {
        // Slightly denormalized quaternion at +90° pitch pushes sinp past 1
        let q = Quaternion::from_euler_deg(0.0, 90.0, 0.0);
        let inflated = Quaternion::new(q.w * 1.001, q.x, q.y * 1.001, q.z);
        let (roll, pitch, yaw) = inflated.to_euler_deg();
        assert!(roll.is_finite() && pitch.is_finite() && yaw.is_finite());
        assert!((pitch - 90.0).abs() < 1e-3);
    }

    #[test]
    fn nlerp_takes_short_path() {
        let a = Quaternion::identity();
        let b = Quaternion::from_euler_deg(0.0, 0.0, 20.0).negated();
        let mid = a.nlerp(&b, 0.5);
        assert!((mid.norm() - 1.0).abs() < 1e-6);
        assert!((mid.angle_to_deg(&a) - 10.0).abs() < 0.1);
    }

    #[test]
    fn normalize_rejects_degenerate() {
        assert!(Quaternion::new(0.0, 0.0, 0.0, 0.0).normalize().is_none());
        assert!(Quaternion::new(f32::NAN, 0.0, 0.0, 0.0).normalize().is_none());
    }
}
