//! Madgwick Gradient-Descent Orientation Filter (IMU variant)
//!
//! ## Algorithm
//!
//! The quaternion is propagated by the gyro rate and pulled toward the
//! attitude whose predicted gravity direction matches the accelerometer:
//!
//! ```text
//! q̇_ω = ½ · q ⊗ (0, ω)
//! f(q) = R(q)ᵀ·ĝ − â                 (objective, 3×1)
//! ∇f   = Jᵀ(q) · f(q)                (gradient, 4×1)
//! q̇    = q̇_ω − β · ∇f / |∇f|
//! q    = normalize(q + q̇ · dt)
//! ```
//!
//! β sets how strongly the accelerometer corrects the gyro. Under thrust the
//! accelerometer no longer points at gravity, so β drops to `thrust_beta`.
//!
//! ## Edge Cases
//!
//! - Zero accelerometer: the tick is skipped and the orientation held
//! - Zero gradient (already aligned): gyro integration only, not an anomaly
//! - Normalization failure or norm drift: reset to identity

use libm::sqrtf;

use crate::constants::physics::DEGENERATE_ACCEL_NORM_M_S2;
use crate::diagnostics::{Anomaly, AnomalyCounters};
use crate::fusion::{admit_sample, OrientationEstimator};
use crate::math::{Quaternion, Vector3};
use crate::orientation::Orientation;
use crate::params::{EstimatorKind, FilterParameters};
use crate::sample::SensorSample;
use crate::trust::{TrustPolicy, TrustState};

/// Quaternion estimator with a gradient-descent accelerometer correction
#[derive(Debug, Clone)]
pub struct MadgwickEstimator {
    q: Quaternion,
    beta: f32,
    thrust_beta: f32,
    /// β applied on the last update
    active_beta: f32,
    fallback_hz: f32,
    norm_tolerance: f32,
    policy: TrustPolicy,
    last_trust: Option<TrustState>,
    counters: AnomalyCounters,
}

impl MadgwickEstimator {
    /// Create an estimator at the identity attitude
    pub fn new(params: &FilterParameters) -> Self {
        Self {
            q: Quaternion::identity(),
            beta: params.beta,
            thrust_beta: params.thrust_beta,
            active_beta: params.beta,
            fallback_hz: params.fallback_sample_freq_hz,
            norm_tolerance: params.divergence_norm_tolerance,
            policy: TrustPolicy::from_params(params),
            last_trust: None,
            counters: AnomalyCounters::default(),
        }
    }

    /// Gain applied on the last update
    pub fn beta(&self) -> f32 {
        self.active_beta
    }

    /// Current unit quaternion
    pub fn quaternion(&self) -> Quaternion {
        self.q
    }

    /// Gyro-only quaternion rate for angular rate `w` (rad/s)
    fn rate(q: &Quaternion, w: &Vector3) -> Quaternion {
        Quaternion::new(
            0.5 * (-q.x * w.x - q.y * w.y - q.z * w.z),
            0.5 * (q.w * w.x + q.y * w.z - q.z * w.y),
            0.5 * (q.w * w.y - q.x * w.z + q.z * w.x),
            0.5 * (q.w * w.z + q.x * w.y - q.y * w.x),
        )
    }

    /// Normalized objective gradient for unit accelerometer `a`
    ///
    /// `None` when the gradient vanishes.
    fn gradient_step(q: &Quaternion, a: &Vector3) -> Option<Quaternion> {
        let (q0, q1, q2, q3) = (q.w, q.x, q.y, q.z);

        let _2q0 = 2.0 * q0;
        let _2q1 = 2.0 * q1;
        let _2q2 = 2.0 * q2;
        let _2q3 = 2.0 * q3;
        let _4q0 = 4.0 * q0;
        let _4q1 = 4.0 * q1;
        let _4q2 = 4.0 * q2;
        let _8q1 = 8.0 * q1;
        let _8q2 = 8.0 * q2;
        let q0q0 = q0 * q0;
        let q1q1 = q1 * q1;
        let q2q2 = q2 * q2;
        let q3q3 = q3 * q3;

        let s0 = _4q0 * q2q2 + _2q2 * a.x + _4q0 * q1q1 - _2q1 * a.y;
        let s1 = _4q1 * q3q3 - _2q3 * a.x + 4.0 * q0q0 * q1 - _2q0 * a.y - _4q1
            + _8q1 * q1q1
            + _8q1 * q2q2
            + _4q1 * a.z;
        let s2 = 4.0 * q0q0 * q2 + _2q0 * a.x + _4q2 * q3q3 - _2q3 * a.y - _4q2
            + _8q2 * q1q1
            + _8q2 * q2q2
            + _4q2 * a.z;
        let s3 = 4.0 * q1q1 * q3 - _2q1 * a.x + 4.0 * q2q2 * q3 - _2q2 * a.y;

        let norm = sqrtf(s0 * s0 + s1 * s1 + s2 * s2 + s3 * s3);
        if !(norm > f32::EPSILON) {
            return None;
        }
        let inv = 1.0 / norm;
        Some(Quaternion::new(s0 * inv, s1 * inv, s2 * inv, s3 * inv))
    }

    fn recover(&mut self) {
        log_warn!("madgwick: quaternion corrupt ({:?}), resetting", self.q);
        self.reset();
        self.counters.record(Anomaly::Recovery);
    }
}

impl OrientationEstimator for MadgwickEstimator {
    fn update(&mut self, sample: &SensorSample, dt: f32) -> Orientation {
        let Some(step) = admit_sample(sample, dt, self.fallback_hz, &mut self.counters) else {
            return self.orientation();
        };
        let dt = step.seconds;

        let gyro = sample.gyro_rad();
        let trust = self.policy.classify(&sample.accel, &gyro);
        self.active_beta = if trust.accelerating { self.thrust_beta } else { self.beta };

        let Some(a) = sample.accel.normalized(DEGENERATE_ACCEL_NORM_M_S2) else {
            self.counters.record(Anomaly::DegenerateMeasurement);
            self.last_trust = Some(trust.with_gain(0.0));
            log_debug!("madgwick: zero accelerometer, holding orientation");
            return self.orientation();
        };

        let mut q_dot = Self::rate(&self.q, &gyro);
        if let Some(s) = Self::gradient_step(&self.q, &a) {
            let b = self.active_beta;
            q_dot = Quaternion::new(
                q_dot.w - b * s.w,
                q_dot.x - b * s.x,
                q_dot.y - b * s.y,
                q_dot.z - b * s.z,
            );
        }

        let integrated = Quaternion::new(
            self.q.w + q_dot.w * dt,
            self.q.x + q_dot.x * dt,
            self.q.y + q_dot.y * dt,
            self.q.z + q_dot.z * dt,
        );

        match integrated.normalize() {
            Some(q) => {
                self.q = q;
                self.last_trust = Some(trust.with_gain(self.active_beta));
                if !self.is_healthy() {
                    self.recover();
                }
            }
            None => self.recover(),
        }

        self.orientation()
    }

    fn orientation(&self) -> Orientation {
        Orientation::Quaternion(self.q)
    }

    fn reset(&mut self) {
        self.q = Quaternion::identity();
        self.active_beta = self.beta;
        self.last_trust = None;
    }

    fn is_healthy(&self) -> bool {
        self.q.is_finite() && (self.q.norm() - 1.0).abs() < self.norm_tolerance
    }

    fn last_trust(&self) -> Option<TrustState> {
        self.last_trust
    }

    fn anomalies(&self) -> AnomalyCounters {
        self.counters
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Madgwick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(gyro: [f32; 3], accel: [f32; 3]) -> SensorSample {
        SensorSample::new(gyro.into(), accel.into())
    }

    fn roll_of(est: &MadgwickEstimator) -> f32 {
        est.quaternion().to_euler_deg().0
    }

    #[test]
    fn level_at_rest_stays_identity() {
        let mut est = MadgwickEstimator::new(&FilterParameters::default());
        for _ in 0..500 {
            est.update(&sample([0.0; 3], [0.0, 0.0, 9.81]), 0.01);
        }
        assert!(est.quaternion().angle_to_deg(&Quaternion::identity()) < 0.1);
        assert!(est.is_healthy());
    }

    #[test]
    fn converges_to_rolled_gravity() {
        let mut est = MadgwickEstimator::new(&FilterParameters::default());
        for _ in 0..3000 {
            est.update(&sample([0.0; 3], [0.0, 9.81, 0.0]), 0.01);
        }
        assert!((roll_of(&est) - 90.0).abs() < 2.0, "roll = {}", roll_of(&est));
    }

    #[test]
    fn thrust_lowers_beta() {
        let mut est = MadgwickEstimator::new(&FilterParameters::default());
        for _ in 0..100 {
            est.update(&sample([10.0, 0.0, 0.0], [0.0, 0.0, 30.0]), 0.01);
        }
        assert_eq!(est.beta(), 0.01);
        let roll = roll_of(&est);
        assert!(roll > 8.5 && roll < 10.5, "roll = {}", roll);
    }

    #[test]
    fn normal_gravity_corrects_gyro() {
        let mut est = MadgwickEstimator::new(&FilterParameters::default());
        for _ in 0..100 {
            est.update(&sample([10.0, 0.0, 0.0], [0.0, 0.0, 9.81]), 0.01);
        }
        assert_eq!(est.beta(), 0.1);
        assert!(roll_of(&est).abs() < 2.0, "roll = {}", roll_of(&est));
    }

    #[test]
    fn zero_accel_holds_orientation() {
        let mut est = MadgwickEstimator::new(&FilterParameters::default());
        for _ in 0..10 {
            est.update(&sample([0.0, 0.0, 30.0], [0.0, 0.0, 9.81]), 0.01);
        }
        let before = est.quaternion();

        est.update(&sample([90.0, 0.0, 0.0], [0.0; 3]), 0.1);
        assert_eq!(est.quaternion(), before);
        assert_eq!(est.anomalies().degenerate_measurements, 1);
        assert_eq!(est.last_trust().map(|t| t.effective_gain), Some(0.0));
        assert!(est.is_healthy());
    }

    #[test]
    fn aligned_gradient_is_not_anomalous() {
        let mut est = MadgwickEstimator::new(&FilterParameters::default());
        est.update(&sample([0.0; 3], [0.0, 0.0, 9.81]), 0.01);
        assert_eq!(est.anomalies().total(), 0);
        assert_eq!(est.quaternion(), Quaternion::identity());
    }

    #[test]
    fn overflowing_rate_recovers() {
        let mut est = MadgwickEstimator::new(&FilterParameters::default());
        est.update(&sample([f32::MAX, f32::MAX, 0.0], [0.0, 0.0, 9.81]), 1.0);
        assert!(est.is_healthy());
        assert_eq!(est.quaternion(), Quaternion::identity());
        assert_eq!(est.anomalies().recoveries, 1);
    }
}
