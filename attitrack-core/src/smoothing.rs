//! Presentation Smoothing
//!
//! An exponential moving average over estimator output, applied after the
//! estimator and never fed back into it:
//!
//! ```text
//! out = out + factor · (new - out)
//! ```
//!
//! Euler angles blend along the shortest arc so a heading crossing 0°/360°
//! does not swing the long way round. Quaternions blend by normalized
//! linear interpolation in the same hemisphere.

use crate::errors::{AttitudeError, AttitudeResult};
use crate::math::shortest_delta_deg;
use crate::orientation::{EulerAngles, Orientation};

/// Exponential smoother for emitted orientations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputSmoother {
    factor: f32,
    last: Option<Orientation>,
}

impl OutputSmoother {
    /// Create a smoother; `factor` is the weight of each new value in `(0, 1]`
    pub fn new(factor: f32) -> AttitudeResult<Self> {
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(AttitudeError::ParameterOutOfRange {
                name: "output_smoothing_factor",
                value: factor,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self { factor, last: None })
    }

    /// Weight of each new value
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Blend `raw` into the smoothed output and return it
    ///
    /// The first value passes through unchanged. A change of representation
    /// restarts the average.
    pub fn apply(&mut self, raw: &Orientation) -> Orientation {
        let smoothed = match (self.last, raw) {
            (Some(Orientation::Euler(prev)), Orientation::Euler(new)) => {
                Orientation::Euler(self.blend_euler(&prev, new))
            }
            (Some(Orientation::Quaternion(prev)), Orientation::Quaternion(new)) => {
                Orientation::Quaternion(prev.nlerp(new, self.factor))
            }
            _ => *raw,
        };
        self.last = Some(smoothed);
        smoothed
    }

    /// Forget the running average
    pub fn reset(&mut self) {
        self.last = None;
    }

    fn blend_euler(&self, prev: &EulerAngles, new: &EulerAngles) -> EulerAngles {
        let k = self.factor;
        EulerAngles::new(
            prev.roll + k * shortest_delta_deg(prev.roll, new.roll),
            prev.pitch + k * shortest_delta_deg(prev.pitch, new.pitch),
            prev.yaw + k * shortest_delta_deg(prev.yaw, new.yaw),
        )
        .wrapped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Quaternion;

    #[test]
    fn first_value_passes_through() {
        let mut s = OutputSmoother::new(0.2).unwrap();
        let o = Orientation::Euler(EulerAngles::new(10.0, 20.0, 30.0));
        assert_eq!(s.apply(&o), o);
    }

    #[test]
    fn euler_moves_by_factor() {
        let mut s = OutputSmoother::new(0.2).unwrap();
        s.apply(&Orientation::Euler(EulerAngles::new(0.0, 0.0, 0.0)));
        let out = s.apply(&Orientation::Euler(EulerAngles::new(10.0, 0.0, 0.0))).to_euler();
        assert!((out.roll - 2.0).abs() < 1e-5);
    }

    #[test]
    fn euler_takes_short_arc() {
        let mut s = OutputSmoother::new(0.5).unwrap();
        s.apply(&Orientation::Euler(EulerAngles::new(0.0, 0.0, 350.0)));
        let out = s.apply(&Orientation::Euler(EulerAngles::new(0.0, 0.0, 10.0))).to_euler();
        assert!(out.yaw < 0.01 || out.yaw > 359.99, "yaw = {}", out.yaw);
    }

    #[test]
    fn quaternion_stays_unit() {
        let mut s = OutputSmoother::new(0.2).unwrap();
        s.apply(&Orientation::Quaternion(Quaternion::identity()));
        let target = Quaternion::from_euler_deg(90.0, 0.0, 0.0);
        let mut out = Quaternion::identity();
        for _ in 0..100 {
            if let Orientation::Quaternion(q) = s.apply(&Orientation::Quaternion(target)) {
                out = q;
            }
        }
        assert!((out.norm() - 1.0).abs() < 1e-5);
        assert!(out.angle_to_deg(&target) < 0.1);
    }

    #[test]
    fn unit_factor_disables_smoothing() {
        let mut s = OutputSmoother::new(1.0).unwrap();
        s.apply(&Orientation::Euler(EulerAngles::new(0.0, 0.0, 0.0)));
        let o = Orientation::Euler(EulerAngles::new(45.0, 45.0, 45.0));
        assert_eq!(s.apply(&o), o);
    }

    #[test]
    fn rejects_bad_factor() {
        assert!(OutputSmoother::new(0.0).is_err());
        assert!(OutputSmoother::new(1.5).is_err());
        assert!(OutputSmoother::new(f32::NAN).is_err());
    }

    #[test]
    fn reset_restarts_average() {
        let mut s = OutputSmoother::new(0.2).unwrap();
        s.apply(&Orientation::Euler(EulerAngles::new(0.0, 0.0, 0.0)));
        s.reset();
        let o = Orientation::Euler(EulerAngles::new(90.0, 0.0, 0.0));
        assert_eq!(s.apply(&o), o);
    }
}
