//! Confidence Scoring for Attitude Estimates
//!
//! ## Overview
//!
//! A live 3D view is more useful when it can show how much to believe the
//! attitude it draws. Each emitted update carries a [`ConfidenceScore`] built
//! from two sources:
//!
//! 1. **Accelerometer trust**: deviation from nominal gravity, computed by
//!    [`crate::trust::TrustPolicy`]
//! 2. **Innovation consistency** (Kalman only): how well the accelerometer
//!    angles agree with the prediction, in standard deviations
//!
//! ## Innovation-Based Scoring
//!
//! ```text
//! confidence = exp(-0.5 × innovation² / innovation_variance)
//! ```
//!
//! ## Implementation Notes
//!
//! - All scores are normalized to [0, 1] range
//! - Stored as 16-bit fixed point, so they compare and hash exactly

/// Confidence score in range [0, 1]
///
/// Internally stored as fixed-point for determinism.
/// 0.0 = no confidence, 1.0 = full confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfidenceScore {
    /// Fixed-point representation (0-65535 maps to 0.0-1.0)
    value: u16,
}

impl ConfidenceScore {
    /// Minimum meaningful confidence (1%)
    pub const MIN_CONFIDENCE: Self = Self { value: 655 };

    /// Maximum confidence (100%)
    pub const MAX_CONFIDENCE: Self = Self { value: 65535 };

    /// No confidence (0%)
    pub const ZERO: Self = Self { value: 0 };

    /// Moderate confidence (50%)
    pub const MODERATE: Self = Self { value: 32768 };

    /// High confidence threshold (90%)
    pub const HIGH_THRESHOLD: Self = Self { value: 58982 };

    /// Create from floating point value [0, 1]; NaN maps to zero
    pub fn from_float(confidence: f32) -> Self {
        let clamped = if confidence.is_nan() { 0.0 } else { confidence.max(0.0).min(1.0) };
        Self {
            value: (clamped * 65535.0) as u16,
        }
    }

    /// Convert to floating point [0, 1]
    pub fn as_float(&self) -> f32 {
        self.value as f32 / 65535.0
    }

    /// Check if confidence is above high threshold
    pub fn is_high(&self) -> bool {
        *self >= Self::HIGH_THRESHOLD
    }

    /// Check if confidence is critically low
    pub fn is_critical(&self) -> bool {
        *self < Self::MIN_CONFIDENCE
    }

    /// Product of two independent scores
    pub fn and(&self, other: Self) -> Self {
        let product = (self.value as u32 * other.value as u32) / 65535;
        Self { value: product as u16 }
    }

    /// Score a scalar innovation against its predicted variance
    ///
    /// Returns [`Self::MIN_CONFIDENCE`] when the normalized innovation exceeds
    /// `threshold_sigma`.
    pub fn from_innovation(innovation: f32, variance: f32, threshold_sigma: f32) -> Self {
        if !(variance > 0.0) || !innovation.is_finite() {
            return Self::ZERO;
        }
        let normalized = innovation.abs() / libm::sqrtf(variance);
        if normalized > threshold_sigma {
            return Self::MIN_CONFIDENCE;
        }
        Self::from_float(libm::expf(-0.5 * normalized * normalized))
    }
}

impl Default for ConfidenceScore {
    fn default() -> Self {
        Self::MODERATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_score_basics() {
        let score = ConfidenceScore::from_float(0.75);
        assert!((score.as_float() - 0.75).abs() < 0.01);

        assert_eq!(ConfidenceScore::ZERO.as_float(), 0.0);
        assert!((ConfidenceScore::MAX_CONFIDENCE.as_float() - 1.0).abs() < 0.01);
        assert_eq!(ConfidenceScore::from_float(f32::NAN), ConfidenceScore::ZERO);
        assert_eq!(ConfidenceScore::from_float(7.0), ConfidenceScore::MAX_CONFIDENCE);

        assert!(ConfidenceScore::from_float(0.95).is_high());
        assert!(ConfidenceScore::from_float(0.005).is_critical());
    }

    #[test]
    fn product_of_scores() {
        let a = ConfidenceScore::from_float(0.5);
        let b = ConfidenceScore::from_float(0.8);
        assert!((a.and(b).as_float() - 0.4).abs() < 0.01);
        assert_eq!(a.and(ConfidenceScore::MAX_CONFIDENCE), a);
    }

    #[test]
    fn innovation_scoring() {
        let small = ConfidenceScore::from_innovation(0.5, 1.0, 3.0);
        let large = ConfidenceScore::from_innovation(5.0, 1.0, 3.0);
        assert!(small > large);
        assert!((small.as_float() - 0.8825).abs() < 0.01);
        assert_eq!(large, ConfidenceScore::MIN_CONFIDENCE);
        assert_eq!(ConfidenceScore::from_innovation(0.1, 0.0, 3.0), ConfidenceScore::ZERO);
    }
}
