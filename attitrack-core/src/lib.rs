//! Attitude estimation core for Attitrack
//!
//! Turns a live stream of gyro/accelerometer samples from a rocket telemetry
//! link into an orientation for a ground-station 3D view. Three
//! interchangeable estimators (complementary, Madgwick, Kalman) share one
//! accelerometer trust policy that detects rest and rejects thrust.
//!
//! Key constraints:
//! - No heap allocation in the estimators; they build under `no_std`
//! - Never panics on NaN, zero accelerometer or a stuttering clock
//! - The update loop reads the newest sample only (last-write-wins)
//!
//! ```no_run
//! use std::sync::Arc;
//! use attitrack_core::{
//!     AttitudePipeline, EstimatorKind, FilterParameters, LatestSampleRegister,
//!     MonotonicTime, SensorSample, UpdateLoop,
//! };
//!
//! let params = FilterParameters::default().with_kind(EstimatorKind::Madgwick);
//! let register = Arc::new(LatestSampleRegister::new());
//! let pipeline = AttitudePipeline::new(params, Arc::clone(&register), MonotonicTime::new())?;
//!
//! let mut update_loop = UpdateLoop::new(pipeline, |update: &attitrack_core::AttitudeUpdate| {
//!     let angles = update.orientation.to_euler();
//!     println!("roll {:.1} pitch {:.1} yaw {:.1}", angles.roll, angles.pitch, angles.yaw);
//! });
//! update_loop.start()?;
//!
//! // Telemetry thread
//! register.push_sample(SensorSample::at_rest(9.81))?;
//!
//! update_loop.stop()?;
//! # Ok::<(), attitrack_core::AttitudeError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod logging;

pub mod constants;
pub mod diagnostics;
pub mod errors;
pub mod fusion;
pub mod math;
pub mod orientation;
pub mod params;
pub mod sample;
pub mod smoothing;
pub mod time;
pub mod trust;

#[cfg(feature = "std")]
pub mod register;
#[cfg(feature = "std")]
pub mod update_loop;

// Public API
pub use diagnostics::{Anomaly, AnomalyCounters};
pub use errors::{AttitudeError, AttitudeResult};
pub use fusion::{
    ComplementaryEstimator, ConfidenceScore, Estimator, KalmanEstimator, MadgwickEstimator,
    OrientationEstimator,
};
pub use math::{Quaternion, Vector3};
pub use orientation::{EulerAngles, Orientation};
pub use params::{EstimatorKind, FilterParameters, OutputFormat};
pub use sample::{SensorSample, TimeStep};
pub use smoothing::OutputSmoother;
pub use time::{ManualTime, TimeSource, Timestamp};
pub use trust::{TrustPolicy, TrustState};

#[cfg(feature = "std")]
pub use register::LatestSampleRegister;
#[cfg(feature = "std")]
pub use time::MonotonicTime;
#[cfg(feature = "std")]
pub use update_loop::{AttitudePipeline, AttitudeUpdate, ChannelSink, LoopStats, OrientationSink, UpdateLoop};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
