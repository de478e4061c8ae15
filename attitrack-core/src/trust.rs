//! Accelerometer Trust Policy
//!
//! ## Overview
//!
//! The accelerometer is only a gravity sensor when nothing else accelerates
//! the vehicle. On the pad it is excellent; under thrust it points along the
//! thrust vector; in free-fall it reads nearly zero. The trust policy
//! classifies the current dynamics from the sample magnitudes so each
//! estimator can scale its accelerometer correction:
//!
//! ```text
//! deviation = | |accel| - g |
//!
//! at_rest      = deviation < rest_accel_tolerance  AND  |gyro| < gyro_rest_threshold
//! accelerating = deviation > accel_deviation_threshold
//! ```
//!
//! | Estimator      | at rest            | accelerating              |
//! |----------------|--------------------|---------------------------|
//! | Complementary  | alpha = rest_alpha | alpha unchanged           |
//! | Madgwick       | beta unchanged     | beta = thrust_beta        |
//! | Kalman         | roll/pitch decay   | measurement dropped       |
//!
//! The policy is a pure function of one sample. Nothing is carried between
//! ticks, so a single thrust sample cannot bias later decisions.

use crate::fusion::confidence::ConfidenceScore;
use crate::math::Vector3;
use crate::params::FilterParameters;

/// Thresholds used to classify dynamics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrustPolicy {
    /// Expected accelerometer magnitude at rest (m/s²)
    pub gravity_nominal: f32,
    /// Deviation treated as thrust or vibration (m/s²)
    pub accel_deviation_threshold: f32,
    /// Deviation still considered at rest (m/s²)
    pub rest_accel_tolerance: f32,
    /// Angular rate below which the vehicle may be at rest (rad/s)
    pub rest_gyro_tolerance: f32,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self::from_params(&FilterParameters::default())
    }
}

impl TrustPolicy {
    /// Take thresholds from the shared parameter set
    pub fn from_params(params: &FilterParameters) -> Self {
        Self {
            gravity_nominal: params.gravity_nominal,
            accel_deviation_threshold: params.accel_deviation_threshold,
            rest_accel_tolerance: params.rest_accel_tolerance,
            rest_gyro_tolerance: params.gyro_rest_threshold,
        }
    }

    /// Classify one sample
    ///
    /// `accel` in m/s², `gyro_rad` in rad/s.
    pub fn classify(&self, accel: &Vector3, gyro_rad: &Vector3) -> TrustState {
        let accel_magnitude = accel.norm();
        let deviation_from_gravity = (accel_magnitude - self.gravity_nominal).abs();
        let gyro_magnitude = gyro_rad.norm();

        let at_rest = deviation_from_gravity < self.rest_accel_tolerance
            && gyro_magnitude < self.rest_gyro_tolerance;
        let accelerating = deviation_from_gravity > self.accel_deviation_threshold;

        let confidence = self.accel_confidence(deviation_from_gravity, gyro_magnitude);

        TrustState {
            accel_magnitude,
            deviation_from_gravity,
            gyro_magnitude,
            at_rest,
            accelerating,
            effective_gain: 0.0,
            confidence,
        }
    }

    /// How far the accelerometer can be believed as a gravity reference
    ///
    /// Full confidence at zero deviation, falling linearly to the minimum at
    /// the deviation threshold. High angular rate halves it: centripetal terms
    /// contaminate the reading during fast rotation.
    fn accel_confidence(&self, deviation: f32, gyro_magnitude: f32) -> ConfidenceScore {
        if deviation >= self.accel_deviation_threshold {
            return ConfidenceScore::MIN_CONFIDENCE;
        }
        let linear = 1.0 - deviation / self.accel_deviation_threshold;
        let spin_penalty = if gyro_magnitude > 10.0 * self.rest_gyro_tolerance { 0.5 } else { 1.0 };
        ConfidenceScore::from_float(linear * spin_penalty).max(ConfidenceScore::MIN_CONFIDENCE)
    }
}

/// Per-tick classification, recomputed on every update and never persisted
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TrustState {
    /// |accel| in m/s²
    pub accel_magnitude: f32,
    /// | |accel| - g | in m/s²
    pub deviation_from_gravity: f32,
    /// |gyro| in rad/s
    pub gyro_magnitude: f32,
    /// Both accel and gyro within rest tolerances
    pub at_rest: bool,
    /// Deviation beyond the thrust threshold
    pub accelerating: bool,
    /// Gain the estimator actually applied this tick (alpha, beta or decay)
    pub effective_gain: f32,
    /// Accelerometer trust as a score
    pub confidence: ConfidenceScore,
}

impl TrustState {
    /// Record the gain an estimator derived from this state
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.effective_gain = gain;
        self
    }
}
