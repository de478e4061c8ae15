//! Orientation Output Types
//!
//! Estimators hand out an [`Orientation`], either Euler angles or a unit
//! quaternion. Euler angles are in degrees and wrapped to `[0, 360)` so that
//! long integrations stay bounded.

use crate::math::{shortest_delta_deg, wrap_degrees, Quaternion};

/// Roll, pitch and yaw in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EulerAngles {
    /// Rotation about the body x axis
    pub roll: f32,
    /// Rotation about the body y axis
    pub pitch: f32,
    /// Rotation about the body z axis
    pub yaw: f32,
}

impl EulerAngles {
    /// Build from raw angles (no wrapping)
    pub const fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }

    /// Every angle wrapped into `[0, 360)`
    pub fn wrapped(&self) -> Self {
        Self::new(wrap_degrees(self.roll), wrap_degrees(self.pitch), wrap_degrees(self.yaw))
    }

    /// Every angle mapped into `(-180, 180]`
    pub fn signed(&self) -> Self {
        Self::new(
            shortest_delta_deg(0.0, self.roll),
            shortest_delta_deg(0.0, self.pitch),
            shortest_delta_deg(0.0, self.yaw),
        )
    }

    /// Largest per-axis angular distance to `other`, wrap-aware
    pub fn max_delta(&self, other: &Self) -> f32 {
        shortest_delta_deg(self.roll, other.roll).abs()
            .max(shortest_delta_deg(self.pitch, other.pitch).abs())
            .max(shortest_delta_deg(self.yaw, other.yaw).abs())
    }

    /// True when no angle is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.roll.is_finite() && self.pitch.is_finite() && self.yaw.is_finite()
    }
}

/// Estimator output in either representation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// Degrees, wrapped to `[0, 360)`
    Euler(EulerAngles),
    /// Unit quaternion
    Quaternion(Quaternion),
}

impl Default for Orientation {
    fn default() -> Self {
        Self::Euler(EulerAngles::default())
    }
}

impl Orientation {
    /// Euler view, wrapped to `[0, 360)`
    pub fn to_euler(&self) -> EulerAngles {
        match self {
            Self::Euler(angles) => angles.wrapped(),
            Self::Quaternion(q) => {
                let (roll, pitch, yaw) = q.to_euler_deg();
                EulerAngles::new(roll, pitch, yaw).wrapped()
            }
        }
    }

    /// Quaternion view
    pub fn to_quaternion(&self) -> Quaternion {
        match self {
            Self::Euler(a) => Quaternion::from_euler_deg(a.roll, a.pitch, a.yaw),
            Self::Quaternion(q) => *q,
        }
    }

    /// True when the wrapped value carries no NaN or infinity
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Euler(a) => a.is_finite(),
            Self::Quaternion(q) => q.is_finite(),
        }
    }
}

impl From<EulerAngles> for Orientation {
    fn from(angles: EulerAngles) -> Self {
        Self::Euler(angles)
    }
}

impl From<Quaternion> for Orientation {
    fn from(q: Quaternion) -> Self {
        Self::Quaternion(q)
    }
}
