//! Time management for the update loop
//!
//! Provides clock abstraction so the loop can derive `dt` from successive
//! readings:
//! - Monotonic clock (std, `Instant`-backed)
//! - Manual clock (deterministic tests and replay)

use crate::constants::time::US_PER_SECOND;

/// Timestamp in milliseconds since the source's epoch
pub type Timestamp = u64;

/// Source of time for the update loop
pub trait TimeSource {
    /// Current time in microseconds
    fn now_us(&self) -> u64;

    /// Current time in milliseconds
    fn now(&self) -> Timestamp {
        self.now_us() / 1_000
    }
}

/// Seconds elapsed between two microsecond readings
///
/// Returns `0.0` when the clock did not advance or went backwards; the
/// estimators substitute their fallback period for that.
pub fn elapsed_seconds(previous_us: u64, now_us: u64) -> f32 {
    now_us.saturating_sub(previous_us) as f32 / US_PER_SECOND
}

/// Monotonic clock starting at zero on construction
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTime {
    start: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicTime {
    /// Start the clock now
    pub fn new() -> Self {
        Self { start: std::time::Instant::now() }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for MonotonicTime {
    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

/// Manually advanced time source for testing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManualTime {
    now_us: u64,
}

impl ManualTime {
    /// Start at `now_us` microseconds
    pub fn new(now_us: u64) -> Self {
        Self { now_us }
    }

    /// Jump to an absolute time, which may lie in the past
    pub fn set(&mut self, now_us: u64) {
        self.now_us = now_us;
    }

    /// Move forward by `us` microseconds
    pub fn advance(&mut self, us: u64) {
        self.now_us = self.now_us.saturating_add(us);
    }

    /// Move forward by `seconds`
    pub fn advance_secs(&mut self, seconds: f32) {
        self.advance((seconds * US_PER_SECOND) as u64);
    }
}

impl TimeSource for ManualTime {
    fn now_us(&self) -> u64 {
        self.now_us
    }
}
