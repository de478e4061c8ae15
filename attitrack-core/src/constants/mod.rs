//! Constants for the Attitude Core
//!
//! Default values for every tunable parameter live here so estimators never
//! carry magic numbers. All of them can be overridden through
//! [`crate::FilterParameters`].
//!
//! ## Organization
//!
//! - **Physics**: gravity and unit conversions
//! - **Fusion**: estimator gains, gating thresholds and noise defaults
//! - **Time**: sample and tick rates

/// Physical constants and unit conversions.
pub mod physics;

/// Estimator gains, thresholds and noise defaults.
pub mod fusion;

/// Sample rates, tick rates and time-step guards.
pub mod time;

pub use physics::{DEG_TO_RAD, RAD_TO_DEG, STANDARD_GRAVITY_M_S2};

pub use fusion::{
    DEFAULT_ALPHA, REST_ALPHA, DEFAULT_BETA, THRUST_BETA,
    ACCEL_DEVIATION_THRESHOLD_M_S2, REST_ACCEL_TOLERANCE_M_S2,
    GYRO_REST_THRESHOLD_RAD_S, OUTPUT_SMOOTHING_FACTOR,
};

pub use time::{FALLBACK_SAMPLE_FREQ_HZ, DEFAULT_TICK_RATE_HZ};
