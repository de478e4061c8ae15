//! Sensor Samples and Time Steps
//!
//! A [`SensorSample`] is the latest gyro/accel pair from the telemetry link.
//! It is validated once at ingestion and again at the top of every estimator
//! update: a single NaN integrated into a quaternion or covariance matrix
//! cannot be recovered from.

use crate::errors::{AttitudeError, AttitudeResult};
use crate::math::Vector3;

/// One inertial reading
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorSample {
    /// Angular rate in deg/s
    pub gyro: Vector3,
    /// Specific force in m/s²
    pub accel: Vector3,
}

impl SensorSample {
    /// Build a sample from gyro (deg/s) and accel (m/s²)
    pub const fn new(gyro: Vector3, accel: Vector3) -> Self {
        Self { gyro, accel }
    }

    /// Sample of a level vehicle at rest under nominal gravity
    pub fn at_rest(gravity: f32) -> Self {
        Self::new(Vector3::zero(), Vector3::new(0.0, 0.0, gravity))
    }

    /// True when every field is finite
    pub fn is_finite(&self) -> bool {
        self.gyro.is_finite() && self.accel.is_finite()
    }

    /// Reject NaN or infinity, naming the first offending field
    pub fn validate(&self) -> AttitudeResult<()> {
        AttitudeError::check_finite("gyro.x", self.gyro.x)?;
        AttitudeError::check_finite("gyro.y", self.gyro.y)?;
        AttitudeError::check_finite("gyro.z", self.gyro.z)?;
        AttitudeError::check_finite("accel.x", self.accel.x)?;
        AttitudeError::check_finite("accel.y", self.accel.y)?;
        AttitudeError::check_finite("accel.z", self.accel.z)?;
        Ok(())
    }

    /// Gyro rate converted to rad/s
    pub fn gyro_rad(&self) -> Vector3 {
        self.gyro.to_radians()
    }
}

/// Time step guard
///
/// `dt <= 0` happens on the first tick and when the clock stutters; a
/// non-finite `dt` comes from a broken time source. Both are replaced by the
/// nominal period of the fallback sample frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeStep {
    /// Seconds to integrate over
    pub seconds: f32,
    /// True when the fallback period replaced the measured value
    pub substituted: bool,
}

impl TimeStep {
    /// Use `dt` if usable, else `1 / fallback_hz`
    pub fn resolve(dt: f32, fallback_hz: f32) -> Self {
        if dt.is_finite() && dt > 0.0 {
            Self { seconds: dt, substituted: false }
        } else {
            Self { seconds: 1.0 / fallback_hz, substituted: true }
        }
    }
}
