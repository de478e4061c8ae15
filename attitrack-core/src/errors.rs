//! Error Types for the Attitude Core
//!
//! ## Design Philosophy
//!
//! The estimators run once per display tick, so errors follow the same rules
//! as the rest of the hot path:
//!
//! 1. **Copy Semantics**: every variant is `Copy` and carries only scalars and
//!    `&'static str`, so errors can be returned and stored without allocation.
//!
//! 2. **Boundary Only**: errors are returned where a caller can act on them
//!    (configuration, sample ingestion, loop lifecycle). Numeric anomalies that
//!    occur inside an update are absorbed locally and counted instead, see
//!    [`crate::diagnostics`].
//!
//! ## Error Categories
//!
//! ### Input Violations
//! - `NonFiniteInput`: NaN or infinity in a sensor field. The sample is dropped
//!   before it can reach the quaternion or the covariance.
//!
//! ### Configuration Violations
//! - `InvalidParameter`: value is not finite or has the wrong sign
//! - `ParameterOutOfRange`: value is finite but outside its legal interval
//! - `Config`: configuration document could not be parsed
//!
//! ### Lifecycle
//! - `AlreadyRunning` / `NotRunning`: misuse of the update loop
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use attitrack_core::{AttitudeError, FilterParameters};
//!
//! let params = FilterParameters::default().with_alpha(1.5);
//! match params.validate() {
//!     Ok(()) => {}
//!     Err(AttitudeError::ParameterOutOfRange { name, .. }) => {
//!         // Reject the operator's edit and keep the previous parameters
//!         let _ = name;
//!     }
//!     Err(_) => {}
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for attitude core operations
pub type AttitudeResult<T> = Result<T, AttitudeError>;

/// Errors surfaced at the attitude core's API boundary
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum AttitudeError {
    /// A sensor field was NaN or infinite
    #[error("Non-finite sensor input in {field}")]
    NonFiniteInput {
        /// Which field carried the bad value (e.g. "gyro.x")
        field: &'static str,
    },

    /// Parameter is not finite or has an impossible sign
    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter {
        /// Parameter name as it appears in the configuration
        name: &'static str,
        /// Offending value
        value: f32,
    },

    /// Parameter outside its legal interval
    #[error("Parameter {name} = {value} outside [{min}, {max}]")]
    ParameterOutOfRange {
        /// Parameter name as it appears in the configuration
        name: &'static str,
        /// Offending value
        value: f32,
        /// Inclusive lower bound
        min: f32,
        /// Inclusive upper bound
        max: f32,
    },

    /// Configuration document could not be decoded
    #[error("Configuration error: {reason}")]
    Config {
        /// Short description of the failure
        reason: &'static str,
    },

    /// `start()` called on a loop that is already ticking
    #[error("Update loop already running")]
    AlreadyRunning,

    /// `stop()` called on a loop that was never started
    #[error("Update loop not running")]
    NotRunning,
}

impl AttitudeError {
    /// Check a value is finite, naming the field on failure
    pub fn check_finite(field: &'static str, value: f32) -> AttitudeResult<()> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(Self::NonFiniteInput { field })
        }
    }

    /// Check a parameter lies within `[min, max]`
    pub fn check_range(name: &'static str, value: f32, min: f32, max: f32) -> AttitudeResult<()> {
        if !value.is_finite() {
            return Err(Self::InvalidParameter { name, value });
        }
        if value < min || value > max {
            return Err(Self::ParameterOutOfRange { name, value, min, max });
        }
        Ok(())
    }

    /// Check a parameter is finite and strictly positive
    pub fn check_positive(name: &'static str, value: f32) -> AttitudeResult<()> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(Self::InvalidParameter { name, value })
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for AttitudeError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::NonFiniteInput { field } =>
                defmt::write!(fmt, "Non-finite input in {}", field),
            Self::InvalidParameter { name, value } =>
                defmt::write!(fmt, "Invalid parameter {}: {}", name, value),
            Self::ParameterOutOfRange { name, value, min, max } =>
                defmt::write!(fmt, "{} = {} outside [{}, {}]", name, value, min, max),
            Self::Config { reason } =>
                defmt::write!(fmt, "Config: {}", reason),
            Self::AlreadyRunning =>
                defmt::write!(fmt, "Loop already running"),
            Self::NotRunning =>
                defmt::write!(fmt, "Loop not running"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_check_names_field() {
        assert!(AttitudeError::check_finite("gyro.x", 1.0).is_ok());
        assert_eq!(
            AttitudeError::check_finite("gyro.x", f32::NAN),
            Err(AttitudeError::NonFiniteInput { field: "gyro.x" })
        );
    }

    #[test]
    fn range_check() {
        assert!(AttitudeError::check_range("alpha", 0.5, 0.0, 1.0).is_ok());
        assert!(matches!(
            AttitudeError::check_range("alpha", 1.5, 0.0, 1.0),
            Err(AttitudeError::ParameterOutOfRange { name: "alpha", .. })
        ));
        assert!(matches!(
            AttitudeError::check_range("alpha", f32::INFINITY, 0.0, 1.0),
            Err(AttitudeError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn positive_check() {
        assert!(AttitudeError::check_positive("gravity_nominal", 9.81).is_ok());
        assert!(AttitudeError::check_positive("gravity_nominal", 0.0).is_err());
        assert!(AttitudeError::check_positive("gravity_nominal", -1.0).is_err());
    }
}
