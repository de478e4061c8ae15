//! Latest-Value Sample Register
//!
//! Sensor ingestion runs on its own thread and writes faster than the update
//! loop ticks. There is no queue: each write replaces the previous sample, so
//! a burst between two ticks collapses to the last value (last-write-wins).
//!
//! The whole sample is stored under one lock together with a version counter,
//! so a reader never sees a gyro vector from one write and an accel vector
//! from another.

use core::convert::Infallible;
use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::errors::AttitudeResult;
use crate::sample::SensorSample;

#[derive(Debug, Default)]
struct Slot {
    sample: Option<SensorSample>,
    version: u64,
}

/// Single-slot, versioned sample store shared between threads
#[derive(Debug, Default)]
pub struct LatestSampleRegister {
    slot: Mutex<Slot>,
    rejected: AtomicU32,
}

impl LatestSampleRegister {
    /// Create an empty register
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // A panicking writer cannot leave a half-written sample: the slot is
        // replaced by value.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a sample, replacing whatever was there
    ///
    /// Returns the new version. Non-finite samples are refused and counted.
    pub fn push_sample(&self, sample: SensorSample) -> AttitudeResult<u64> {
        if let Err(err) = sample.validate() {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            log_warn!("register: refusing sample: {}", err);
            return Err(err);
        }
        let mut slot = self.lock();
        slot.version = slot.version.wrapping_add(1);
        slot.sample = Some(sample);
        Ok(slot.version)
    }

    /// Most recent sample and its version, if any was ever written
    pub fn latest(&self) -> Option<(SensorSample, u64)> {
        let slot = self.lock();
        slot.sample.map(|s| (s, slot.version))
    }

    /// Sample newer than `seen_version`
    ///
    /// `WouldBlock` when nothing new arrived since that version.
    pub fn read_fresh(&self, seen_version: u64) -> nb::Result<(SensorSample, u64), Infallible> {
        match self.latest() {
            Some((sample, version)) if version != seen_version => Ok((sample, version)),
            _ => Err(nb::Error::WouldBlock),
        }
    }

    /// Number of accepted writes
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    /// Number of refused writes
    pub fn rejected(&self) -> u32 {
        self.rejected.load(Ordering::Relaxed)
    }
}
