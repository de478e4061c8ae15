//! Filter Parameters
//!
//! One struct configures every estimator, the trust policy, the output
//! smoother and the update loop. Thresholds are never hardcoded inside an
//! estimator, so tuning from the ground station (or a test) only touches this
//! struct.
//!
//! ```rust
//! use attitrack_core::{EstimatorKind, FilterParameters};
//!
//! let params = FilterParameters::default()
//!     .with_kind(EstimatorKind::Madgwick)
//!     .with_beta(0.08)
//!     .with_accel_deviation_threshold(3.0);
//!
//! assert!(params.validate().is_ok());
//! ```
//!
//! With the `std` feature the same struct loads from JSON; missing fields keep
//! their defaults:
//!
//! ```rust
//! # #[cfg(feature = "std")] {
//! use attitrack_core::{EstimatorKind, FilterParameters};
//!
//! let params = FilterParameters::from_json(r#"{ "estimator_kind": "kalman", "rest_decay": 0.95 }"#)
//!     .unwrap();
//! assert_eq!(params.estimator_kind, EstimatorKind::Kalman);
//! assert_eq!(params.alpha, 0.98);
//! # }
//! ```

use crate::constants::{fusion, physics, time};
use crate::errors::{AttitudeError, AttitudeResult};
use crate::math::matrix::{diagonal, SquareMatrix};

/// Which estimation strategy drives the orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EstimatorKind {
    /// Gyro integration blended with accelerometer angles
    #[default]
    Complementary,
    /// Gradient-descent quaternion fusion
    Madgwick,
    /// Three-state linear Kalman filter over roll/pitch/yaw
    Kalman,
}

/// Representation handed to the orientation consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OutputFormat {
    /// Roll/pitch/yaw in degrees, wrapped to [0, 360)
    #[default]
    Euler,
    /// Unit quaternion
    Quaternion,
}

/// Complete estimator configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FilterParameters {
    /// Active strategy
    pub estimator_kind: EstimatorKind,
    /// Emitted representation
    pub output_format: OutputFormat,

    /// Complementary gyro weight under normal dynamics
    pub alpha: f32,
    /// Complementary gyro weight at rest
    pub rest_alpha: f32,
    /// Optional weight of each raw accelerometer angle in a vibration low-pass
    pub accel_lowpass: Option<f32>,

    /// Madgwick gain under normal dynamics
    pub beta: f32,
    /// Madgwick gain while accelerating beyond the deviation threshold
    pub thrust_beta: f32,

    /// Kalman process noise Q (rad²)
    pub process_noise: SquareMatrix<3>,
    /// Kalman measurement noise R for [roll, pitch] (rad²)
    pub measurement_noise: SquareMatrix<2>,
    /// Kalman initial covariance P₀ (rad²)
    pub initial_covariance: SquareMatrix<3>,
    /// Kalman roll/pitch decay factor while at rest (1.0 disables)
    pub rest_decay: f32,

    /// Expected accelerometer magnitude at rest (m/s²)
    pub gravity_nominal: f32,
    /// Deviation from gravity treated as thrust (m/s²)
    pub accel_deviation_threshold: f32,
    /// Deviation from gravity still considered at rest (m/s²)
    pub rest_accel_tolerance: f32,
    /// Angular rate below which the vehicle may be at rest (rad/s)
    pub gyro_rest_threshold: f32,

    /// Weight of each new output in the presentation smoother (1.0 disables)
    pub output_smoothing_factor: f32,
    /// Sample frequency substituted for unusable time steps (Hz)
    pub fallback_sample_freq_hz: f32,
    /// Update loop cadence (Hz)
    pub tick_rate_hz: f32,
    /// Largest tolerated quaternion norm error before a reset
    pub divergence_norm_tolerance: f32,
}

impl Default for FilterParameters {
    fn default() -> Self {
        let r = fusion::KALMAN_MEASUREMENT_NOISE_DEG * physics::DEG_TO_RAD;
        Self {
            estimator_kind: EstimatorKind::default(),
            output_format: OutputFormat::default(),
            alpha: fusion::DEFAULT_ALPHA,
            rest_alpha: fusion::REST_ALPHA,
            accel_lowpass: None,
            beta: fusion::DEFAULT_BETA,
            thrust_beta: fusion::THRUST_BETA,
            process_noise: diagonal([fusion::KALMAN_PROCESS_NOISE; 3]),
            measurement_noise: diagonal([r * r; 2]),
            initial_covariance: diagonal([fusion::KALMAN_INITIAL_COVARIANCE; 3]),
            rest_decay: fusion::REST_DECAY,
            gravity_nominal: physics::STANDARD_GRAVITY_M_S2,
            accel_deviation_threshold: fusion::ACCEL_DEVIATION_THRESHOLD_M_S2,
            rest_accel_tolerance: fusion::REST_ACCEL_TOLERANCE_M_S2,
            gyro_rest_threshold: fusion::GYRO_REST_THRESHOLD_RAD_S,
            output_smoothing_factor: fusion::OUTPUT_SMOOTHING_FACTOR,
            fallback_sample_freq_hz: time::FALLBACK_SAMPLE_FREQ_HZ,
            tick_rate_hz: time::DEFAULT_TICK_RATE_HZ,
            divergence_norm_tolerance: fusion::DIVERGENCE_NORM_TOLERANCE,
        }
    }
}

impl FilterParameters {
    /// Select the estimation strategy
    pub fn with_kind(mut self, kind: EstimatorKind) -> Self {
        self.estimator_kind = kind;
        self
    }

    /// Select the emitted representation
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set complementary gyro weight (higher = trust gyro more)
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set complementary gyro weight used while at rest
    pub fn with_rest_alpha(mut self, rest_alpha: f32) -> Self {
        self.rest_alpha = rest_alpha;
        self
    }

    /// Enable the accelerometer angle low-pass with the given new-sample weight
    pub fn with_accel_lowpass(mut self, weight: f32) -> Self {
        self.accel_lowpass = Some(weight);
        self
    }

    /// Set Madgwick gain under normal dynamics
    pub fn with_beta(mut self, beta: f32) -> Self {
        self.beta = beta;
        self
    }

    /// Set Madgwick gain under thrust
    pub fn with_thrust_beta(mut self, beta: f32) -> Self {
        self.thrust_beta = beta;
        self
    }

    /// Set the Q diagonal (higher = less trust in gyro prediction)
    pub fn with_process_noise(mut self, noise: f32) -> Self {
        self.process_noise = diagonal([noise; 3]);
        self
    }

    /// Set R from the accelerometer angle RMS noise in degrees
    pub fn with_measurement_noise_deg(mut self, rms_deg: [f32; 2]) -> Self {
        let r0 = rms_deg[0] * physics::DEG_TO_RAD;
        let r1 = rms_deg[1] * physics::DEG_TO_RAD;
        self.measurement_noise = diagonal([r0 * r0, r1 * r1]);
        self
    }

    /// Set the Kalman at-rest decay factor
    pub fn with_rest_decay(mut self, decay: f32) -> Self {
        self.rest_decay = decay;
        self
    }

    /// Set the nominal gravity magnitude
    pub fn with_gravity_nominal(mut self, gravity: f32) -> Self {
        self.gravity_nominal = gravity;
        self
    }

    /// Set the thrust detection threshold
    pub fn with_accel_deviation_threshold(mut self, threshold: f32) -> Self {
        self.accel_deviation_threshold = threshold;
        self
    }

    /// Set the accelerometer tolerance for rest detection
    pub fn with_rest_accel_tolerance(mut self, tolerance: f32) -> Self {
        self.rest_accel_tolerance = tolerance;
        self
    }

    /// Set the gyro threshold for rest detection (rad/s)
    pub fn with_gyro_rest_threshold(mut self, threshold: f32) -> Self {
        self.gyro_rest_threshold = threshold;
        self
    }

    /// Set the presentation smoothing weight
    pub fn with_output_smoothing(mut self, factor: f32) -> Self {
        self.output_smoothing_factor = factor;
        self
    }

    /// Set the fallback sample frequency
    pub fn with_fallback_sample_freq(mut self, hz: f32) -> Self {
        self.fallback_sample_freq_hz = hz;
        self
    }

    /// Set the update loop cadence
    pub fn with_tick_rate(mut self, hz: f32) -> Self {
        self.tick_rate_hz = hz;
        self
    }

    /// Check every parameter against its legal range
    pub fn validate(&self) -> AttitudeResult<()> {
        AttitudeError::check_range("alpha", self.alpha, 0.0, 1.0)?;
        AttitudeError::check_range("rest_alpha", self.rest_alpha, 0.0, 1.0)?;
        if let Some(weight) = self.accel_lowpass {
            AttitudeError::check_range("accel_lowpass", weight, 0.0, 1.0)?;
        }
        AttitudeError::check_range("beta", self.beta, 0.0, 10.0)?;
        AttitudeError::check_range("thrust_beta", self.thrust_beta, 0.0, 10.0)?;
        AttitudeError::check_range("rest_decay", self.rest_decay, 0.0, 1.0)?;
        AttitudeError::check_range(
            "output_smoothing_factor",
            self.output_smoothing_factor,
            f32::EPSILON,
            1.0,
        )?;

        check_covariance("process_noise", &self.process_noise, false)?;
        check_covariance("measurement_noise", &self.measurement_noise, true)?;
        check_covariance("initial_covariance", &self.initial_covariance, false)?;

        AttitudeError::check_positive("gravity_nominal", self.gravity_nominal)?;
        AttitudeError::check_positive("accel_deviation_threshold", self.accel_deviation_threshold)?;
        AttitudeError::check_positive("rest_accel_tolerance", self.rest_accel_tolerance)?;
        AttitudeError::check_positive("gyro_rest_threshold", self.gyro_rest_threshold)?;
        AttitudeError::check_positive("fallback_sample_freq_hz", self.fallback_sample_freq_hz)?;
        AttitudeError::check_range(
            "tick_rate_hz",
            self.tick_rate_hz,
            time::MIN_TICK_RATE_HZ,
            time::MAX_TICK_RATE_HZ,
        )?;
        AttitudeError::check_positive("divergence_norm_tolerance", self.divergence_norm_tolerance)?;

        Ok(())
    }

    /// Nominal time step implied by the fallback frequency (s)
    pub fn fallback_dt(&self) -> f32 {
        1.0 / self.fallback_sample_freq_hz
    }

    /// Parse parameters from a JSON document and validate them
    #[cfg(feature = "std")]
    pub fn from_json(json: &str) -> AttitudeResult<Self> {
        use serde_json::error::Category;

        let params: Self = serde_json::from_str(json).map_err(|e| {
            let reason = match e.classify() {
                Category::Syntax => "malformed JSON",
                Category::Data => "field has wrong type or value",
                Category::Eof => "unexpected end of JSON",
                Category::Io => "I/O error while reading JSON",
            };
            AttitudeError::Config { reason }
        })?;
        params.validate()?;
        Ok(params)
    }

    /// Serialize parameters to pretty-printed JSON
    #[cfg(feature = "std")]
    pub fn to_json(&self) -> AttitudeResult<std::string::String> {
        serde_json::to_string_pretty(self).map_err(|_| AttitudeError::Config {
            reason: "parameters not serializable",
        })
    }
}

/// Diagonal must be finite and non-negative (strictly positive for R)
fn check_covariance<const N: usize>(
    name: &'static str,
    m: &SquareMatrix<N>,
    strictly_positive: bool,
) -> AttitudeResult<()> {
    for (i, row) in m.iter().enumerate() {
        for (j, &value) in row.iter().enumerate() {
            if !value.is_finite() {
                return Err(AttitudeError::InvalidParameter { name, value });
            }
            if i == j && (value < 0.0 || (strictly_positive && value == 0.0)) {
                return Err(AttitudeError::InvalidParameter { name, value });
            }
        }
    }
    Ok(())
}
