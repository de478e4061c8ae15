//! Attitude Estimation Strategies
//!
//! ## Overview
//!
//! Three interchangeable estimators turn a stream of gyro/accel samples into
//! an orientation. The gyro is accurate over short intervals but drifts; the
//! accelerometer is drift-free but only while gravity is the dominant force.
//! Each strategy trades those two sources differently:
//!
//! ```text
//!   gyro (deg/s) ──→ integrate ──┐
//!                                ├─→ fuse ─→ Orientation
//!   accel (m/s²) ──→ trust ──────┘
//! ```
//!
//! | Strategy                                | State        | Cost      |
//! |-----------------------------------------|--------------|-----------|
//! | [`ComplementaryEstimator`]              | Euler angles | lowest    |
//! | [`MadgwickEstimator`]                   | quaternion   | low       |
//! | [`KalmanEstimator`]                     | roll/pitch/yaw + 3×3 P | moderate |
//!
//! ## Contract
//!
//! Every estimator:
//! - drops samples containing NaN or infinity and returns the last estimate
//! - substitutes the fallback period for `dt <= 0` or non-finite `dt`
//! - integrates the gyro alone when the accelerometer norm is ≈ 0
//! - checks its state after each update and resets if it became corrupt
//!
//! Anomalies are counted, never returned as errors.
//!
//! ## Selection
//!
//! [`Estimator`] wraps the three behind one enum so the update loop can pick
//! a strategy from [`FilterParameters::estimator_kind`] without boxing.

pub mod complementary;
pub mod confidence;
pub mod kalman;
pub mod madgwick;

pub use complementary::ComplementaryEstimator;
pub use confidence::ConfidenceScore;
pub use kalman::KalmanEstimator;
pub use madgwick::MadgwickEstimator;

use crate::diagnostics::{Anomaly, AnomalyCounters};
use crate::orientation::Orientation;
use crate::params::{EstimatorKind, FilterParameters};
use crate::sample::{SensorSample, TimeStep};
use crate::trust::TrustState;

/// Common interface of the attitude estimators
///
/// ## Safety Requirements
///
/// Implementations must:
/// 1. Never panic on any sample or time step
/// 2. Never let NaN or infinity reach their state
/// 3. Use only stack allocation
pub trait OrientationEstimator {
    /// Advance the estimate by one sample taken `dt` seconds after the last
    ///
    /// Returns the orientation after the update (or the previous one if the
    /// sample was dropped).
    fn update(&mut self, sample: &SensorSample, dt: f32) -> Orientation;

    /// Current estimate without advancing
    fn orientation(&self) -> Orientation;

    /// Return to the level, unrotated initial state
    ///
    /// Anomaly counters survive a reset.
    fn reset(&mut self);

    /// State is finite and, for quaternion state, unit length
    fn is_healthy(&self) -> bool;

    /// Dynamics classification of the last accepted sample
    fn last_trust(&self) -> Option<TrustState>;

    /// Anomalies absorbed so far
    fn anomalies(&self) -> AnomalyCounters;

    /// Strategy identifier
    fn kind(&self) -> EstimatorKind;
}

/// Validate a sample and resolve its time step
///
/// Shared preamble of every `update`. Returns `None` when the sample must be
/// dropped.
pub(crate) fn admit_sample(
    sample: &SensorSample,
    dt: f32,
    fallback_hz: f32,
    counters: &mut AnomalyCounters,
) -> Option<TimeStep> {
    if let Err(_err) = sample.validate() {
        counters.record(Anomaly::NonFiniteInput);
        log_warn!("dropping sample: {}", _err);
        return None;
    }

    let step = TimeStep::resolve(dt, fallback_hz);
    if step.substituted {
        counters.record(Anomaly::InvalidTimeStep);
        log_debug!("unusable dt {}, using {} s", dt, step.seconds);
    }
    Some(step)
}

/// Runtime-selected estimator
#[derive(Debug, Clone)]
pub enum Estimator {
    /// Gyro/accel blend on Euler angles
    Complementary(ComplementaryEstimator),
    /// Gradient-descent quaternion filter
    Madgwick(MadgwickEstimator),
    /// Error-state Kalman filter on Euler angles
    Kalman(KalmanEstimator),
}

impl Estimator {
    /// Build the strategy named by `params.estimator_kind`
    pub fn from_params(params: &FilterParameters) -> Self {
        match params.estimator_kind {
            EstimatorKind::Complementary => Self::Complementary(ComplementaryEstimator::new(params)),
            EstimatorKind::Madgwick => Self::Madgwick(MadgwickEstimator::new(params)),
            EstimatorKind::Kalman => Self::Kalman(KalmanEstimator::new(params)),
        }
    }

    fn inner(&self) -> &dyn OrientationEstimator {
        match self {
            Self::Complementary(e) => e,
            Self::Madgwick(e) => e,
            Self::Kalman(e) => e,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn OrientationEstimator {
        match self {
            Self::Complementary(e) => e,
            Self::Madgwick(e) => e,
            Self::Kalman(e) => e,
        }
    }
}

impl OrientationEstimator for Estimator {
    fn update(&mut self, sample: &SensorSample, dt: f32) -> Orientation {
        self.inner_mut().update(sample, dt)
    }

    fn orientation(&self) -> Orientation {
        self.inner().orientation()
    }

    fn reset(&mut self) {
        self.inner_mut().reset()
    }

    fn is_healthy(&self) -> bool {
        self.inner().is_healthy()
    }

    fn last_trust(&self) -> Option<TrustState> {
        self.inner().last_trust()
    }

    fn anomalies(&self) -> AnomalyCounters {
        self.inner().anomalies()
    }

    fn kind(&self) -> EstimatorKind {
        self.inner().kind()
    }
}
