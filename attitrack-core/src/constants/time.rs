//! Time Constants
//!
//! Sample and tick rates for the update loop.

/// Sample frequency assumed when the measured time step is unusable (Hz).
///
/// Substituted when `dt <= 0` or not finite (first tick, clock stutter).
pub const FALLBACK_SAMPLE_FREQ_HZ: f32 = 100.0;

/// Default update loop cadence (Hz), roughly a display refresh.
pub const DEFAULT_TICK_RATE_HZ: f32 = 60.0;

/// Microseconds per second.
pub const US_PER_SECOND: f32 = 1_000_000.0;

/// Window of recent time steps kept for loop statistics.
pub const DT_HISTORY_LEN: usize = 32;

/// Slowest accepted update loop cadence (Hz).
pub const MIN_TICK_RATE_HZ: f32 = 0.1;

/// Fastest accepted update loop cadence (Hz).
pub const MAX_TICK_RATE_HZ: f32 = 10_000.0;
