//! Anomaly Accounting
//!
//! Numeric anomalies inside an update are absorbed by a local fallback
//! branch and never returned as errors. They are still worth seeing on the
//! ground station, so every estimator counts them here.

use core::ops::AddAssign;

/// Kinds of locally absorbed anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    /// Accelerometer norm ≈ 0 (free-fall, dropout); correction skipped
    DegenerateMeasurement,
    /// Accelerometer deviated beyond the thrust threshold; correction rejected
    GatedMeasurement,
    /// `dt <= 0` or non-finite; fallback period used
    InvalidTimeStep,
    /// NaN or infinity in a sample; sample dropped
    NonFiniteInput,
    /// Estimator state found corrupt and reset
    Recovery,
}

/// Running totals of absorbed anomalies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AnomalyCounters {
    /// Measurements skipped for near-zero accelerometer norm
    pub degenerate_measurements: u32,
    /// Measurements rejected under thrust or vibration
    pub gated_measurements: u32,
    /// Ticks that used the fallback time step
    pub invalid_time_steps: u32,
    /// Samples dropped for NaN or infinity
    pub rejected_samples: u32,
    /// State resets after corruption was detected
    pub recoveries: u32,
}

impl AnomalyCounters {
    /// Count one occurrence
    pub fn record(&mut self, anomaly: Anomaly) {
        let slot = match anomaly {
            Anomaly::DegenerateMeasurement => &mut self.degenerate_measurements,
            Anomaly::GatedMeasurement => &mut self.gated_measurements,
            Anomaly::InvalidTimeStep => &mut self.invalid_time_steps,
            Anomaly::NonFiniteInput => &mut self.rejected_samples,
            Anomaly::Recovery => &mut self.recoveries,
        };
        *slot = slot.saturating_add(1);
    }

    /// Total of every counter
    pub fn total(&self) -> u32 {
        self.degenerate_measurements
            .saturating_add(self.gated_measurements)
            .saturating_add(self.invalid_time_steps)
            .saturating_add(self.rejected_samples)
            .saturating_add(self.recoveries)
    }
}

impl AddAssign for AnomalyCounters {
    fn add_assign(&mut self, other: Self) {
        self.degenerate_measurements = self.degenerate_measurements.saturating_add(other.degenerate_measurements);
        self.gated_measurements = self.gated_measurements.saturating_add(other.gated_measurements);
        self.invalid_time_steps = self.invalid_time_steps.saturating_add(other.invalid_time_steps);
        self.rejected_samples = self.rejected_samples.saturating_add(other.rejected_samples);
        self.recoveries = self.recoveries.saturating_add(other.recoveries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_total() {
        let mut counters = AnomalyCounters::default();
        counters.record(Anomaly::DegenerateMeasurement);
        counters.record(Anomaly::DegenerateMeasurement);
        counters.record(Anomaly::Recovery);

        assert_eq!(counters.degenerate_measurements, 2);
        assert_eq!(counters.recoveries, 1);
        assert_eq!(counters.total(), 3);

        let mut sum = AnomalyCounters::default();
        sum += counters;
        sum += counters;
        assert_eq!(sum.total(), 6);
    }
}
