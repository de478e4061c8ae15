//! Common test utilities for integration tests
//!
//! This module provides:
//! - Deterministic noise for repeatable runs
//! - Flight-profile sample generators (pad, boost, coast, free-fall)
//! - Assertion helpers for angular tolerances

#![allow(dead_code)]

use attitrack_core::{SensorSample, Vector3};

pub const G: f32 = 9.81;
pub const DT: f32 = 0.01;

/// Assert two scalars agree within a tolerance
macro_rules! assert_within_tolerance {
    ($actual:expr, $expected:expr, $tol:expr) => {{
        let (a, e, t): (f32, f32, f32) = ($actual, $expected, $tol);
        assert!((a - e).abs() <= t, "{} = {}, expected {} ± {}", stringify!($actual), a, e, t);
    }};
}

/// Assert two angles in degrees agree within a tolerance, modulo 360
macro_rules! assert_angle_near {
    ($actual:expr, $expected:expr, $tol:expr) => {{
        let (a, e, t): (f32, f32, f32) = ($actual, $expected, $tol);
        let d = attitrack_core::math::shortest_delta_deg(e, a).abs();
        assert!(d <= t, "{} = {}°, expected {}° ± {}°", stringify!($actual), a, e, t);
    }};
}

/// Small deterministic PRNG (xorshift32)
pub struct TestRng {
    state: u32,
}

impl TestRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform in `[lo, hi)`
    pub fn gen_range(&mut self, lo: f32, hi: f32) -> f32 {
        let unit = (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32;
        lo + unit * (hi - lo)
    }

    pub fn noise(&mut self, amplitude: f32) -> Vector3 {
        Vector3::new(
            self.gen_range(-amplitude, amplitude),
            self.gen_range(-amplitude, amplitude),
            self.gen_range(-amplitude, amplitude),
        )
    }
}

/// Phases of a sounding-rocket flight as seen by a body-fixed IMU
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlightPhase {
    /// Level on the pad, still
    Pad,
    /// Motor burning: specific force along +z well above g, slow roll
    Boost,
    /// Ballistic: accelerometer reads almost nothing
    Coast,
}

/// Sample generator for a flight profile
pub struct FlightProfile {
    rng: TestRng,
    gyro_noise_dps: f32,
    accel_noise: f32,
}

impl FlightProfile {
    pub fn new(seed: u32) -> Self {
        Self {
            rng: TestRng::new(seed),
            gyro_noise_dps: 0.5,
            accel_noise: 0.05,
        }
    }

    pub fn noiseless() -> Self {
        Self {
            rng: TestRng::new(1),
            gyro_noise_dps: 0.0,
            accel_noise: 0.0,
        }
    }

    pub fn sample(&mut self, phase: FlightPhase) -> SensorSample {
        let (gyro, accel) = match phase {
            FlightPhase::Pad => (Vector3::zero(), Vector3::new(0.0, 0.0, G)),
            FlightPhase::Boost => (Vector3::new(10.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 30.0)),
            FlightPhase::Coast => (Vector3::new(0.0, 5.0, 0.0), Vector3::new(0.0, 0.0, 0.2)),
        };
        let gyro_noise = self.rng.noise(self.gyro_noise_dps);
        let accel_noise = self.rng.noise(self.accel_noise);
        SensorSample::new(gyro + gyro_noise, accel + accel_noise)
    }
}

/// Static sample with gravity rotated to the given roll (degrees)
pub fn rolled_at_rest(roll_deg: f32) -> SensorSample {
    let r = roll_deg.to_radians();
    SensorSample::new(Vector3::zero(), Vector3::new(0.0, G * r.sin(), G * r.cos()))
}

pub fn sample(gyro: [f32; 3], accel: [f32; 3]) -> SensorSample {
    SensorSample::new(gyro.into(), accel.into())
}
