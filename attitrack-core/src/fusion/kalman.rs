//! Kalman Filter over Roll, Pitch and Yaw
//!
//! ## Overview
//!
//! A 3-state linear filter whose state is `[roll, pitch, yaw]` in radians.
//! The gyro drives the prediction; the accelerometer observes roll and pitch
//! only. Yaw is unobservable and carries growing covariance.
//!
//! ### 1. Prediction Step
//! ```text
//! State prediction:      x̂ = x + ω·dt
//! Covariance prediction: P̂ = P + Q
//! ```
//!
//! ### 2. Update Step
//! ```text
//! Measurement:     z = [atan2(ay, az), asin(-ax)]   (unit accel)
//! Innovation:      y = wrap(z - H·x̂)                H = [[1,0,0],[0,1,0]]
//! Innovation cov:  S = H·P̂·Hᵀ + R
//! Kalman gain:     K = P̂·Hᵀ·S⁻¹
//! State update:    x = x̂ + K·y
//! Covariance:      P = (I - K·H)·P̂
//! ```
//!
//! ## Measurement Gating
//!
//! | Condition                         | Action                             |
//! |-----------------------------------|------------------------------------|
//! | `|accel| < 1e-6`                  | predict only (degenerate)          |
//! | deviation > threshold (thrust)    | predict only (gated)               |
//! | `S` singular                      | predict only (degenerate)          |
//! | at rest                           | roll/pitch × `rest_decay` after update |
//!
//! Rejecting the whole measurement under thrust is stricter than the
//! Madgwick β reduction: a thrust vector along the body axis reads as "level"
//! and would otherwise pull tilt toward zero during ascent.

use libm::{asinf, atan2f};

use crate::constants::physics::{DEGENERATE_ACCEL_NORM_M_S2, RAD_TO_DEG};
use crate::diagnostics::{Anomaly, AnomalyCounters};
use crate::fusion::confidence::ConfidenceScore;
use crate::fusion::{admit_sample, OrientationEstimator};
use crate::math::matrix::{
    self, add, diag_of, invert, make_symmetric, matvec, multiply, sub, transpose, Matrix, SquareMatrix, Vector,
};
use crate::math::{clamp_unit, wrap_pi, Vector3};
use crate::orientation::{EulerAngles, Orientation};
use crate::params::{EstimatorKind, FilterParameters};
use crate::sample::SensorSample;
use crate::trust::{TrustPolicy, TrustState};

/// Roll and pitch are observed; yaw is not
const H: Matrix<2, 3> = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

/// Innovations beyond this many standard deviations score minimum confidence
const INNOVATION_GATE_SIGMA: f32 = 3.0;

/// Linear Kalman estimator on Euler angles
#[derive(Debug, Clone)]
pub struct KalmanEstimator {
    /// `[roll, pitch, yaw]` in radians, each in (-π, π]
    state: Vector<3>,
    covariance: SquareMatrix<3>,
    process_noise: SquareMatrix<3>,
    measurement_noise: SquareMatrix<2>,
    initial_covariance: SquareMatrix<3>,
    rest_decay: f32,
    fallback_hz: f32,
    policy: TrustPolicy,
    last_correction: Vector<3>,
    last_innovation: Vector<2>,
    measurement_confidence: ConfidenceScore,
    last_trust: Option<TrustState>,
    counters: AnomalyCounters,
}

impl KalmanEstimator {
    /// Create a level estimator with covariance `P₀`
    pub fn new(params: &FilterParameters) -> Self {
        Self {
            state: [0.0; 3],
            covariance: params.initial_covariance,
            process_noise: params.process_noise,
            measurement_noise: params.measurement_noise,
            initial_covariance: params.initial_covariance,
            rest_decay: params.rest_decay,
            fallback_hz: params.fallback_sample_freq_hz,
            policy: TrustPolicy::from_params(params),
            last_correction: [0.0; 3],
            last_innovation: [0.0; 2],
            measurement_confidence: ConfidenceScore::default(),
            last_trust: None,
            counters: AnomalyCounters::default(),
        }
    }

    /// Current covariance `P` (rad²)
    pub fn covariance(&self) -> &SquareMatrix<3> {
        &self.covariance
    }

    /// Diagonal of `P`: per-axis variance (rad²)
    pub fn uncertainty(&self) -> [f32; 3] {
        diag_of(&self.covariance)
    }

    /// State correction `K·y` applied on the last update (rad)
    ///
    /// All zero when the measurement was gated or degenerate.
    pub fn last_correction(&self) -> [f32; 3] {
        self.last_correction
    }

    /// Innovation `y` of the last applied measurement (rad)
    pub fn last_innovation(&self) -> [f32; 2] {
        self.last_innovation
    }

    /// Agreement between the last measurement and the prediction
    pub fn measurement_confidence(&self) -> ConfidenceScore {
        self.measurement_confidence
    }

    /// Current state as Euler angles in degrees
    pub fn angles(&self) -> EulerAngles {
        EulerAngles::new(
            self.state[0] * RAD_TO_DEG,
            self.state[1] * RAD_TO_DEG,
            self.state[2] * RAD_TO_DEG,
        )
        .wrapped()
    }

    /// Roll and pitch observed by a unit accelerometer vector (rad)
    fn measure(a: &Vector3) -> Vector<2> {
        [atan2f(a.y, a.z), asinf(clamp_unit(-a.x))]
    }

    /// Measurement update; returns `K[0][0]`, or `None` when `S` is singular
    fn correct(&mut self, predicted: &SquareMatrix<3>, z: Vector<2>) -> Option<f32> {
        let h_x = matvec(&H, &self.state);
        let y = [wrap_pi(z[0] - h_x[0]), wrap_pi(z[1] - h_x[1])];

        let h_t = transpose(&H);
        let p_ht: Matrix<3, 2> = multiply(predicted, &h_t);
        let s = add(&multiply(&H, &p_ht), &self.measurement_noise);
        let s_inv = invert(&s)?;
        let k: Matrix<3, 2> = multiply(&p_ht, &s_inv);

        let dx = matvec(&k, &y);
        for (x, d) in self.state.iter_mut().zip(dx.iter()) {
            *x += d;
        }

        let i_kh = sub(&matrix::identity::<3>(), &multiply(&k, &H));
        self.covariance = multiply(&i_kh, predicted);
        make_symmetric(&mut self.covariance);

        self.last_correction = dx;
        self.last_innovation = y;
        self.measurement_confidence = ConfidenceScore::from_innovation(y[0], s[0][0], INNOVATION_GATE_SIGMA)
            .and(ConfidenceScore::from_innovation(y[1], s[1][1], INNOVATION_GATE_SIGMA));
        Some(k[0][0])
    }

    fn skip_measurement(&mut self, predicted: SquareMatrix<3>, anomaly: Anomaly) {
        self.covariance = predicted;
        self.last_correction = [0.0; 3];
        self.measurement_confidence = ConfidenceScore::MIN_CONFIDENCE;
        self.counters.record(anomaly);
    }
}

impl OrientationEstimator for KalmanEstimator {
    fn update(&mut self, sample: &SensorSample, dt: f32) -> Orientation {
        let Some(step) = admit_sample(sample, dt, self.fallback_hz, &mut self.counters) else {
            return self.orientation();
        };
        let dt = step.seconds;

        let gyro = sample.gyro_rad();
        let trust = self.policy.classify(&sample.accel, &gyro);

        self.state[0] += gyro.x * dt;
        self.state[1] += gyro.y * dt;
        self.state[2] += gyro.z * dt;
        let predicted = add(&self.covariance, &self.process_noise);

        let gain = match sample.accel.normalized(DEGENERATE_ACCEL_NORM_M_S2) {
            None => {
                log_debug!("kalman: zero accelerometer, predict only");
                self.skip_measurement(predicted, Anomaly::DegenerateMeasurement);
                0.0
            }
            Some(_) if trust.accelerating => {
                log_debug!("kalman: deviation {} m/s², measurement gated", trust.deviation_from_gravity);
                self.skip_measurement(predicted, Anomaly::GatedMeasurement);
                0.0
            }
            Some(a) => match self.correct(&predicted, Self::measure(&a)) {
                Some(k) => k,
                None => {
                    log_warn!("kalman: singular innovation covariance, predict only");
                    self.skip_measurement(predicted, Anomaly::DegenerateMeasurement);
                    0.0
                }
            },
        };

        let gain = if trust.at_rest {
            self.state[0] *= self.rest_decay;
            self.state[1] *= self.rest_decay;
            self.rest_decay
        } else {
            gain
        };

        for angle in self.state.iter_mut() {
            *angle = wrap_pi(*angle);
        }
        self.last_trust = Some(trust.with_gain(gain));

        if !self.is_healthy() {
            log_warn!("kalman: state or covariance non-finite, resetting");
            self.reset();
            self.counters.record(Anomaly::Recovery);
        }

        self.orientation()
    }

    fn orientation(&self) -> Orientation {
        Orientation::Euler(self.angles())
    }

    fn reset(&mut self) {
        self.state = [0.0; 3];
        self.covariance = self.initial_covariance;
        self.last_correction = [0.0; 3];
        self.last_innovation = [0.0; 2];
        self.measurement_confidence = ConfidenceScore::default();
        self.last_trust = None;
    }

    fn is_healthy(&self) -> bool {
        self.state.iter().all(|x| x.is_finite()) && matrix::is_finite(&self.covariance)
    }

    fn last_trust(&self) -> Option<TrustState> {
        self.last_trust
    }

    fn anomalies(&self) -> AnomalyCounters {
        self.counters
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Kalman
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::physics::DEG_TO_RAD;
    use crate::math::shortest_delta_deg;

    fn sample(gyro: [f32; 3], accel: [f32; 3]) -> SensorSample {
        SensorSample::new(gyro.into(), accel.into())
    }

    fn no_decay() -> KalmanEstimator {
        KalmanEstimator::new(&FilterParameters::default().with_rest_decay(1.0))
    }

    #[test]
    fn converges_to_tilt() {
        let mut kf = no_decay();
        let roll = 30.0 * DEG_TO_RAD;
        let accel = [0.0, 9.81 * libm::sinf(roll), 9.81 * libm::cosf(roll)];
        for _ in 0..200 {
            kf.update(&sample([0.0; 3], accel), 0.01);
        }
        let angles = kf.angles();
        assert!(shortest_delta_deg(angles.roll, 30.0).abs() < 0.5, "roll = {}", angles.roll);
        assert!(shortest_delta_deg(angles.pitch, 0.0).abs() < 0.5);
    }

    #[test]
    fn covariance_shrinks_on_observed_axes() {
        let mut kf = KalmanEstimator::new(&FilterParameters::default());
        for _ in 0..50 {
            kf.update(&sample([0.0; 3], [0.0, 0.0, 9.81]), 0.01);
        }
        let u = kf.uncertainty();
        assert!(u[0] < 0.01 && u[1] < 0.01);
        // Yaw is only predicted
        assert!(u[2] > 1.0);
        let p = kf.covariance();
        assert_eq!(p[0][1], p[1][0]);
    }

    #[test]
    fn thrust_rejects_measurement() {
        let mut kf = KalmanEstimator::new(&FilterParameters::default());
        for _ in 0..100 {
            kf.update(&sample([10.0, 0.0, 0.0], [0.0, 0.0, 30.0]), 0.01);
        }
        assert_eq!(kf.last_correction(), [0.0; 3]);
        assert!((kf.angles().roll - 10.0).abs() < 0.01, "roll = {}", kf.angles().roll);
        assert_eq!(kf.anomalies().gated_measurements, 100);
        assert_eq!(kf.last_trust().unwrap().effective_gain, 0.0);
    }

    #[test]
    fn free_fall_predicts_only() {
        let mut kf = KalmanEstimator::new(&FilterParameters::default());
        let before = kf.uncertainty();
        kf.update(&sample([0.0, 50.0, 0.0], [0.0; 3]), 0.1);
        assert!((kf.angles().pitch - 5.0).abs() < 1e-3);
        assert_eq!(kf.last_correction(), [0.0; 3]);
        assert!(kf.uncertainty()[1] > before[1]);
        assert_eq!(kf.anomalies().degenerate_measurements, 1);
        assert_eq!(kf.anomalies().gated_measurements, 0);
    }

    #[test]
    fn rest_decays_toward_level() {
        let mut kf = KalmanEstimator::new(&FilterParameters::default());
        kf.state = [0.2, -0.1, 0.5];
        kf.update(&sample([0.0; 3], [0.0, 0.0, 9.81]), 0.01);
        assert!(kf.state[0].abs() < 0.2 * 0.9);
        assert!(kf.state[1].abs() < 0.1 * 0.9);
        assert!((kf.state[2] - 0.5).abs() < 1e-6);
        assert_eq!(kf.last_trust().unwrap().effective_gain, 0.9);
    }

    #[test]
    fn innovation_wraps_across_pi() {
        let mut kf = no_decay();
        kf.state = [179.0 * DEG_TO_RAD, 0.0, 0.0];
        let roll = -179.0 * DEG_TO_RAD;
        kf.update(&sample([0.0; 3], [0.0, 9.81 * libm::sinf(roll), 9.81 * libm::cosf(roll)]), 0.01);
        let y = kf.last_innovation();
        assert!((y[0] - 2.0 * DEG_TO_RAD).abs() < 1e-3, "y = {:?}", y);
    }

    #[test]
    fn yaw_output_stays_wrapped() {
        let mut kf = KalmanEstimator::new(&FilterParameters::default());
        for _ in 0..100 {
            kf.update(&sample([0.0, 0.0, -720.0], [0.0, 0.0, 9.81]), 0.01);
        }
        let yaw = kf.angles().yaw;
        assert!((0.0..360.0).contains(&yaw));
        assert!(yaw.min(360.0 - yaw) < 0.05);
    }

    #[test]
    fn reset_restores_initial_covariance() {
        let mut kf = KalmanEstimator::new(&FilterParameters::default());
        kf.update(&sample([5.0, 0.0, 0.0], [0.0, 0.0, 9.81]), 0.01);
        kf.reset();
        assert_eq!(kf.uncertainty(), [1.0; 3]);
        assert_eq!(kf.angles(), EulerAngles::default());
    }
}
