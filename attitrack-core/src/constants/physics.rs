//! Physical Constants
//!
//! Gravity and angle conversions shared by every estimator.

use core::f32::consts::PI;

/// Nominal gravitational acceleration (m/s²).
///
/// The accelerometer reads this magnitude when the vehicle is at rest.
/// Deviation from it is how thrust, vibration and free-fall are detected.
///
/// Source: ground station firmware calibration (9.81, not the 9.80665 ISO value)
pub const STANDARD_GRAVITY_M_S2: f32 = 9.81;

/// Degrees to radians.
pub const DEG_TO_RAD: f32 = PI / 180.0;

/// Radians to degrees.
pub const RAD_TO_DEG: f32 = 180.0 / PI;

/// Accelerometer norm below which a measurement is considered degenerate (m/s²).
///
/// Free-fall and sensor dropout both read close to zero. Normalizing such a
/// vector would divide by zero or amplify pure noise into a direction.
pub const DEGENERATE_ACCEL_NORM_M_S2: f32 = 1e-6;
