//! Complementary Attitude Filter
//!
//! Blends high-pass gyro integration with low-pass accelerometer angles:
//!
//! ```text
//! gyro_angle  = angle + rate · dt
//! pitch_acc   = atan2(-ax, √(ay² + az²))
//! roll_acc    = atan2(ay, az)
//! angle       = α · gyro_angle + (1 - α) · accel_angle
//! ```
//!
//! The blend is applied to the shortest angular difference, so it behaves the
//! same on either side of the 0°/360° seam.
//!
//! Yaw has no correction source (no magnetometer) and free-drifts with the
//! integrated gyro. That is a known limitation of the sensor set.

use libm::{atan2f, sqrtf};

use crate::constants::physics::{DEGENERATE_ACCEL_NORM_M_S2, RAD_TO_DEG};
use crate::diagnostics::{Anomaly, AnomalyCounters};
use crate::fusion::{admit_sample, OrientationEstimator};
use crate::math::{shortest_delta_deg, Vector3};
use crate::orientation::{EulerAngles, Orientation};
use crate::params::{EstimatorKind, FilterParameters};
use crate::sample::SensorSample;
use crate::trust::{TrustPolicy, TrustState};

/// Gyro/accelerometer blend over Euler angles in degrees
#[derive(Debug, Clone)]
pub struct ComplementaryEstimator {
    angles: EulerAngles,
    /// Low-passed accelerometer (roll, pitch), when the low-pass is enabled
    accel_filtered: Option<(f32, f32)>,
    alpha: f32,
    rest_alpha: f32,
    accel_lowpass: Option<f32>,
    fallback_hz: f32,
    policy: TrustPolicy,
    last_trust: Option<TrustState>,
    counters: AnomalyCounters,
}

impl ComplementaryEstimator {
    /// Create a level estimator from parameters
    pub fn new(params: &FilterParameters) -> Self {
        Self {
            angles: EulerAngles::default(),
            accel_filtered: None,
            alpha: params.alpha,
            rest_alpha: params.rest_alpha,
            accel_lowpass: params.accel_lowpass,
            fallback_hz: params.fallback_sample_freq_hz,
            policy: TrustPolicy::from_params(params),
            last_trust: None,
            counters: AnomalyCounters::default(),
        }
    }

    /// Gyro weight applied on the last update
    pub fn alpha(&self) -> f32 {
        self.last_trust.map_or(self.alpha, |t| t.effective_gain)
    }

    /// Current angles in degrees, wrapped to [0, 360)
    pub fn angles(&self) -> EulerAngles {
        self.angles
    }

    /// Roll and pitch implied by gravity alone, in degrees
    ///
    /// `None` when every component is zero.
    pub fn accel_angles(accel: &Vector3) -> Option<(f32, f32)> {
        if !(accel.norm() > DEGENERATE_ACCEL_NORM_M_S2) {
            return None;
        }
        let pitch = atan2f(-accel.x, sqrtf(accel.y * accel.y + accel.z * accel.z));
        let roll = atan2f(accel.y, accel.z);
        Some((roll * RAD_TO_DEG, pitch * RAD_TO_DEG))
    }

    fn low_pass(&mut self, raw: (f32, f32)) -> (f32, f32) {
        let Some(weight) = self.accel_lowpass else {
            return raw;
        };
        let filtered = match self.accel_filtered {
            None => raw,
            Some((roll, pitch)) => (
                roll + weight * shortest_delta_deg(roll, raw.0),
                pitch + weight * shortest_delta_deg(pitch, raw.1),
            ),
        };
        self.accel_filtered = Some(filtered);
        filtered
    }
}

impl OrientationEstimator for ComplementaryEstimator {
    fn update(&mut self, sample: &SensorSample, dt: f32) -> Orientation {
        let Some(step) = admit_sample(sample, dt, self.fallback_hz, &mut self.counters) else {
            return self.orientation();
        };
        let dt = step.seconds;

        let gyro_angles = EulerAngles::new(
            self.angles.roll + sample.gyro.x * dt,
            self.angles.pitch + sample.gyro.y * dt,
            self.angles.yaw + sample.gyro.z * dt,
        );

        let trust = self.policy.classify(&sample.accel, &sample.gyro_rad());
        let alpha = if trust.at_rest { self.rest_alpha } else { self.alpha };

        let fused = match Self::accel_angles(&sample.accel) {
            Some(raw) => {
                let (roll_acc, pitch_acc) = self.low_pass(raw);
                let k = 1.0 - alpha;
                EulerAngles::new(
                    gyro_angles.roll + k * shortest_delta_deg(gyro_angles.roll, roll_acc),
                    gyro_angles.pitch + k * shortest_delta_deg(gyro_angles.pitch, pitch_acc),
                    gyro_angles.yaw,
                )
            }
            None => {
                self.counters.record(Anomaly::DegenerateMeasurement);
                log_debug!("complementary: zero accelerometer, gyro only");
                gyro_angles
            }
        };

        self.angles = fused.wrapped();
        self.last_trust = Some(trust.with_gain(alpha));

        if !self.is_healthy() {
            log_warn!("complementary: non-finite angles {:?}, resetting", self.angles);
            self.reset();
            self.counters.record(Anomaly::Recovery);
        }

        self.orientation()
    }

    fn orientation(&self) -> Orientation {
        Orientation::Euler(self.angles)
    }

    fn reset(&mut self) {
        self.angles = EulerAngles::default();
        self.accel_filtered = None;
        self.last_trust = None;
    }

    fn is_healthy(&self) -> bool {
        self.angles.is_finite()
    }

    fn last_trust(&self) -> Option<TrustState> {
        self.last_trust
    }

    fn anomalies(&self) -> AnomalyCounters {
        self.counters
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Complementary
    }
}
