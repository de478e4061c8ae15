//! Fusion Algorithm Constants
//!
//! Defaults for the complementary, Madgwick and Kalman estimators and for the
//! trust policy that decides how much the accelerometer is believed.
//!
//! The source telemetry tool carried several snapshots of each filter with
//! slightly different thresholds. The values below are the defaults; every one
//! is exposed as configuration.

// ===== COMPLEMENTARY FILTER =====

/// Gyro weight in the complementary blend.
///
/// 0.98 means 98% integrated gyro, 2% accelerometer angle per tick.
pub const DEFAULT_ALPHA: f32 = 0.98;

/// Gyro weight while the vehicle is at rest.
///
/// Gyro integration is already accurate when stationary, so accelerometer
/// noise is admitted even more slowly.
pub const REST_ALPHA: f32 = 0.995;

/// Weight of a new accelerometer angle in the optional vibration low-pass.
///
/// `smoothed = smoothed * 0.95 + raw * 0.05`
pub const ACCEL_LOWPASS_WEIGHT: f32 = 0.05;

// ===== MADGWICK FILTER =====

/// Madgwick gradient gain under normal dynamics.
pub const DEFAULT_BETA: f32 = 0.1;

/// Madgwick gradient gain during thrust or high-g.
///
/// The accelerometer no longer points at gravity under thrust; trusting it
/// would drag the attitude toward the thrust vector.
pub const THRUST_BETA: f32 = 0.01;

// ===== KALMAN FILTER =====

/// Diagonal of the process noise Q (rad²).
///
/// Small on purpose: favours smooth prediction over reactive correction.
pub const KALMAN_PROCESS_NOISE: f32 = 1e-4;

/// Accelerometer angle noise, RMS degrees. R diagonal is this squared in rad².
pub const KALMAN_MEASUREMENT_NOISE_DEG: f32 = 2.0;

/// Initial covariance diagonal (rad²).
pub const KALMAN_INITIAL_COVARIANCE: f32 = 1.0;

/// Multiplicative decay applied to roll and pitch while at rest.
pub const REST_DECAY: f32 = 0.9;

// ===== TRUST POLICY =====

/// Deviation from nominal gravity treated as thrust or vibration (m/s²).
///
/// Madgwick lowers beta above this; Kalman drops the measurement entirely.
pub const ACCEL_DEVIATION_THRESHOLD_M_S2: f32 = 2.5;

/// Deviation from nominal gravity still considered "at rest" (m/s²).
pub const REST_ACCEL_TOLERANCE_M_S2: f32 = 0.8;

/// Angular rate magnitude below which the vehicle may be at rest (rad/s).
///
/// 0.05 rad/s is roughly 2.9 deg/s.
pub const GYRO_REST_THRESHOLD_RAD_S: f32 = 0.05;

// ===== OUTPUT =====

/// Exponential smoothing weight of each new estimator output.
///
/// Presentation-layer only; never fed back into estimator state.
pub const OUTPUT_SMOOTHING_FACTOR: f32 = 0.2;

/// Largest tolerated `| |q| - 1 |` before the state is declared corrupt.
pub const DIVERGENCE_NORM_TOLERANCE: f32 = 1e-3;
