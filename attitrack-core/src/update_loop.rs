//! Update Loop
//!
//! ## Overview
//!
//! Each tick runs the same fixed sequence:
//!
//! ```text
//! clock ──→ dt ──┐
//!                ├─→ estimator ─→ output format ─→ smoother ─→ sink
//! register ──────┘
//! ```
//!
//! 1. `dt` is the clock delta since the previous tick. The first tick, or a
//!    clock that did not advance, hands the estimator `0.0` and it
//!    substitutes the fallback period.
//! 2. The register is read once. When no new sample arrived the estimator
//!    runs again on the last one and the update is marked `stale`.
//! 3. The estimator output is converted to the configured representation
//!    and smoothed for presentation. Smoothing never feeds back.
//!
//! [`AttitudePipeline`] is the single-threaded tick; [`UpdateLoop`] drives it
//! from a dedicated thread at the configured cadence and can be stopped and
//! restarted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use heapless::HistoryBuffer;

use crate::constants::time::DT_HISTORY_LEN;
use crate::diagnostics::AnomalyCounters;
use crate::errors::{AttitudeError, AttitudeResult};
use crate::fusion::{ConfidenceScore, Estimator, OrientationEstimator};
use crate::orientation::Orientation;
use crate::params::{FilterParameters, OutputFormat};
use crate::register::LatestSampleRegister;
use crate::sample::{SensorSample, TimeStep};
use crate::smoothing::OutputSmoother;
use crate::time::{elapsed_seconds, TimeSource, Timestamp};
use crate::trust::TrustState;

/// One emitted attitude
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AttitudeUpdate {
    /// Smoothed orientation in the configured representation
    pub orientation: Orientation,
    /// Dynamics classification of the sample used
    pub trust: Option<TrustState>,
    /// How far this attitude can be believed
    pub confidence: ConfidenceScore,
    /// Clock reading at the tick (ms)
    pub timestamp: Timestamp,
    /// Time step the estimator integrated over (s)
    pub dt: f32,
    /// Register version of the sample used
    pub sample_version: u64,
    /// No new sample arrived since the previous tick
    pub stale: bool,
}

/// Consumer of emitted attitudes (renderer, logger, network bridge)
pub trait OrientationSink {
    /// Called once per tick that produced an update
    fn on_orientation_update(&mut self, update: &AttitudeUpdate);
}

impl<F> OrientationSink for F
where
    F: FnMut(&AttitudeUpdate),
{
    fn on_orientation_update(&mut self, update: &AttitudeUpdate) {
        self(update)
    }
}

/// Forwards updates to another thread over a channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<AttitudeUpdate>,
}

impl ChannelSink {
    /// Create a sink and the receiver for the consuming thread
    pub fn new() -> (Self, mpsc::Receiver<AttitudeUpdate>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl OrientationSink for ChannelSink {
    fn on_orientation_update(&mut self, update: &AttitudeUpdate) {
        if self.tx.send(*update).is_err() {
            log_debug!("channel sink: receiver gone, update dropped");
        }
    }
}

/// Snapshot of loop health
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LoopStats {
    /// Ticks that produced an update
    pub ticks: u64,
    /// Ticks that reused the previous sample
    pub stale_ticks: u64,
    /// Mean time step over the recent window (s)
    pub mean_dt: f32,
    /// Estimator anomalies so far
    pub anomalies: AnomalyCounters,
    /// Samples the register refused
    pub rejected_writes: u32,
}

/// Estimator, smoother and clock wired to a sample register
pub struct AttitudePipeline<T: TimeSource> {
    params: FilterParameters,
    estimator: Estimator,
    smoother: OutputSmoother,
    register: Arc<LatestSampleRegister>,
    clock: T,
    last_tick_us: Option<u64>,
    seen_version: u64,
    last_sample: Option<SensorSample>,
    ticks: u64,
    stale_ticks: u64,
    dt_history: HistoryBuffer<f32, DT_HISTORY_LEN>,
}

impl<T: TimeSource> AttitudePipeline<T> {
    /// Validate `params` and build the configured estimator
    pub fn new(params: FilterParameters, register: Arc<LatestSampleRegister>, clock: T) -> AttitudeResult<Self> {
        params.validate()?;
        let smoother = OutputSmoother::new(params.output_smoothing_factor)?;
        Ok(Self {
            estimator: Estimator::from_params(&params),
            smoother,
            register,
            clock,
            last_tick_us: None,
            seen_version: 0,
            last_sample: None,
            ticks: 0,
            stale_ticks: 0,
            dt_history: HistoryBuffer::new(),
            params,
        })
    }

    /// Run one tick with `dt` taken from the clock
    ///
    /// `None` until the register has received its first sample.
    pub fn tick(&mut self) -> Option<AttitudeUpdate> {
        let now_us = self.clock.now_us();
        let dt = self.last_tick_us.map_or(0.0, |prev| elapsed_seconds(prev, now_us));
        self.last_tick_us = Some(now_us);
        self.tick_with_dt(dt)
    }

    /// Run one tick with an explicit `dt` in seconds
    pub fn tick_with_dt(&mut self, dt: f32) -> Option<AttitudeUpdate> {
        let (sample, version, stale) = match self.register.read_fresh(self.seen_version) {
            Ok((sample, version)) => (sample, version, false),
            Err(nb::Error::WouldBlock) => (self.last_sample?, self.seen_version, true),
            Err(nb::Error::Other(never)) => match never {},
        };
        self.seen_version = version;
        self.last_sample = Some(sample);

        let raw = self.estimator.update(&sample, dt);
        let converted = match self.params.output_format {
            OutputFormat::Euler => Orientation::Euler(raw.to_euler()),
            OutputFormat::Quaternion => Orientation::Quaternion(raw.to_quaternion()),
        };
        let orientation = self.smoother.apply(&converted);

        let trust = self.estimator.last_trust();
        let mut confidence = trust.map_or(ConfidenceScore::ZERO, |t| t.confidence);
        if let Estimator::Kalman(kf) = &self.estimator {
            confidence = confidence.and(kf.measurement_confidence());
        }

        let dt = TimeStep::resolve(dt, self.params.fallback_sample_freq_hz).seconds;
        self.dt_history.write(dt);
        self.ticks += 1;
        if stale {
            self.stale_ticks += 1;
        }

        Some(AttitudeUpdate {
            orientation,
            trust,
            confidence,
            timestamp: self.clock.now(),
            dt,
            sample_version: version,
            stale,
        })
    }

    /// Reset estimator, smoother and tick timing; statistics are kept
    pub fn reset(&mut self) {
        self.estimator.reset();
        self.smoother.reset();
        self.last_tick_us = None;
    }

    /// Active estimator
    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    /// Parameters the pipeline was built with
    pub fn params(&self) -> &FilterParameters {
        &self.params
    }

    /// Register the pipeline reads from
    pub fn register(&self) -> &Arc<LatestSampleRegister> {
        &self.register
    }

    /// Mutable access to the clock (manual clocks in tests and replay)
    pub fn clock_mut(&mut self) -> &mut T {
        &mut self.clock
    }

    /// Current statistics
    pub fn stats(&self) -> LoopStats {
        let window = self.dt_history.as_slice();
        let mean_dt = if window.is_empty() {
            0.0
        } else {
            window.iter().sum::<f32>() / window.len() as f32
        };
        LoopStats {
            ticks: self.ticks,
            stale_ticks: self.stale_ticks,
            mean_dt,
            anomalies: self.estimator.anomalies(),
            rejected_writes: self.register.rejected(),
        }
    }
}

type Parts<T, S> = (AttitudePipeline<T>, S);

/// Fixed-cadence driver for an [`AttitudePipeline`] on its own thread
///
/// Dropping a running loop stops it and joins the thread.
pub struct UpdateLoop<T, S>
where
    T: TimeSource + Send + 'static,
    S: OrientationSink + Send + 'static,
{
    parts: Option<Parts<T, S>>,
    handle: Option<JoinHandle<Parts<T, S>>>,
    running: Arc<AtomicBool>,
    stats: Arc<Mutex<LoopStats>>,
    period: Duration,
}

impl<T, S> UpdateLoop<T, S>
where
    T: TimeSource + Send + 'static,
    S: OrientationSink + Send + 'static,
{
    /// Wrap a pipeline and a sink; nothing runs until [`start`](Self::start)
    pub fn new(pipeline: AttitudePipeline<T>, sink: S) -> Self {
        let period = Duration::from_secs_f32(1.0 / pipeline.params().tick_rate_hz);
        let stats = pipeline.stats();
        Self {
            parts: Some((pipeline, sink)),
            handle: None,
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(Mutex::new(stats)),
            period,
        }
    }

    /// Spawn the ticking thread
    pub fn start(&mut self) -> AttitudeResult<()> {
        match &self.handle {
            Some(handle) if !handle.is_finished() => return Err(AttitudeError::AlreadyRunning),
            // Thread exited on its own; reap it first and report a panic
            Some(_) => self.stop()?,
            None => {}
        }
        let (mut pipeline, mut sink) = self.parts.take().ok_or(AttitudeError::Config {
            reason: "update loop thread panicked",
        })?;

        let running = Arc::clone(&self.running);
        let stats = Arc::clone(&self.stats);
        let period = self.period;
        running.store(true, Ordering::Release);

        let handle = thread::spawn(move || {
            while running.load(Ordering::Acquire) {
                let started = Instant::now();
                if let Some(update) = pipeline.tick() {
                    sink.on_orientation_update(&update);
                }
                *stats.lock().unwrap_or_else(PoisonError::into_inner) = pipeline.stats();
                thread::sleep(period.saturating_sub(started.elapsed()));
            }
            (pipeline, sink)
        });
        self.handle = Some(handle);

        log_info!("update loop started at {:?} per tick", self.period);
        Ok(())
    }

    /// Signal the thread to finish and wait for it
    ///
    /// The pipeline and sink come back to the loop, so it can be restarted.
    pub fn stop(&mut self) -> AttitudeResult<()> {
        let handle = self.handle.take().ok_or(AttitudeError::NotRunning)?;
        self.running.store(false, Ordering::Release);
        match handle.join() {
            Ok(parts) => {
                self.parts = Some(parts);
                log_info!("update loop stopped");
                Ok(())
            }
            Err(_) => {
                log_warn!("update loop thread panicked");
                Err(AttitudeError::Config { reason: "update loop thread panicked" })
            }
        }
    }

    /// Whether the ticking thread is alive
    ///
    /// `false` once the thread has died, even before [`stop`](Self::stop)
    /// reaps it.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished()) && self.running.load(Ordering::Acquire)
    }

    /// Statistics as of the last completed tick
    pub fn stats(&self) -> LoopStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The pipeline, while the loop is stopped
    pub fn pipeline(&self) -> Option<&AttitudePipeline<T>> {
        self.parts.as_ref().map(|(pipeline, _)| pipeline)
    }

    /// The sink, while the loop is stopped
    pub fn sink(&self) -> Option<&S> {
        self.parts.as_ref().map(|(_, sink)| sink)
    }
}

impl<T, S> Drop for UpdateLoop<T, S>
where
    T: TimeSource + Send + 'static,
    S: OrientationSink + Send + 'static,
{
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;
    use crate::params::EstimatorKind;
    use crate::time::ManualTime;

    fn pipeline(params: FilterParameters) -> AttitudePipeline<ManualTime> {
        AttitudePipeline::new(params, Arc::new(LatestSampleRegister::new()), ManualTime::default()).unwrap()
    }

    #[test]
    fn no_output_before_first_sample() {
        let mut p = pipeline(FilterParameters::default());
        assert!(p.tick().is_none());
        assert_eq!(p.stats().ticks, 0);
    }

    #[test]
    fn first_tick_uses_fallback_dt() {
        let mut p = pipeline(FilterParameters::default());
        p.register().push_sample(SensorSample::at_rest(9.81)).unwrap();
        let update = p.tick().unwrap();
        assert!((update.dt - 0.01).abs() < 1e-6);
        assert!(!update.stale);
        assert_eq!(update.sample_version, 1);
        assert_eq!(p.estimator().anomalies().invalid_time_steps, 1);
    }

    #[test]
    fn dt_follows_clock() {
        let mut p = pipeline(FilterParameters::default());
        p.register().push_sample(SensorSample::at_rest(9.81)).unwrap();
        p.tick();
        p.clock_mut().advance(20_000);
        let update = p.tick().unwrap();
        assert!((update.dt - 0.02).abs() < 1e-6);
        assert_eq!(update.timestamp, 20);
    }

    #[test]
    fn stale_ticks_reuse_last_sample() {
        let mut p = pipeline(FilterParameters::default());
        p.register().push_sample(SensorSample::at_rest(9.81)).unwrap();
        p.tick_with_dt(0.01);
        let update = p.tick_with_dt(0.01).unwrap();
        assert!(update.stale);
        assert_eq!(update.sample_version, 1);
        assert_eq!(p.stats().stale_ticks, 1);
        assert_eq!(p.stats().ticks, 2);
    }

    #[test]
    fn quaternion_output_format() {
        let params = FilterParameters::default()
            .with_kind(EstimatorKind::Kalman)
            .with_output_format(OutputFormat::Quaternion);
        let mut p = pipeline(params);
        p.register().push_sample(SensorSample::at_rest(9.81)).unwrap();
        let update = p.tick_with_dt(0.01).unwrap();
        assert!(matches!(update.orientation, Orientation::Quaternion(_)));
    }

    #[test]
    fn mean_dt_over_window() {
        let mut p = pipeline(FilterParameters::default());
        p.register().push_sample(SensorSample::at_rest(9.81)).unwrap();
        for _ in 0..DT_HISTORY_LEN {
            p.tick_with_dt(0.5);
        }
        for _ in 0..DT_HISTORY_LEN {
            p.tick_with_dt(0.02);
        }
        assert!((p.stats().mean_dt - 0.02).abs() < 1e-6);
    }

    #[test]
    fn rejects_invalid_params() {
        let params = FilterParameters::default().with_alpha(2.0);
        let result = AttitudePipeline::new(params, Arc::new(LatestSampleRegister::new()), ManualTime::default());
        assert!(result.is_err());
    }

    #[test]
    fn closure_sink_receives_updates() {
        let mut seen = 0;
        {
            let mut sink = |_: &AttitudeUpdate| seen += 1;
            let mut p = pipeline(FilterParameters::default());
            p.register()
                .push_sample(SensorSample::new(Vector3::zero(), Vector3::new(0.0, 0.0, 9.81)))
                .unwrap();
            for _ in 0..3 {
                if let Some(update) = p.tick_with_dt(0.01) {
                    sink.on_orientation_update(&update);
                }
            }
        }
        assert_eq!(seen, 3);
    }

    #[test]
    fn loop_lifecycle() {
        let register = Arc::new(LatestSampleRegister::new());
        register.push_sample(SensorSample::at_rest(9.81)).unwrap();
        let params = FilterParameters::default().with_tick_rate(500.0);
        let pipeline = AttitudePipeline::new(params, Arc::clone(&register), crate::time::MonotonicTime::new()).unwrap();
        let (sink, rx) = ChannelSink::new();

        let mut update_loop = UpdateLoop::new(pipeline, sink);
        assert_eq!(update_loop.stop(), Err(AttitudeError::NotRunning));

        update_loop.start().unwrap();
        assert!(update_loop.is_running());
        assert!(update_loop.sink().is_none());
        assert_eq!(update_loop.start(), Err(AttitudeError::AlreadyRunning));

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first.sample_version, 1);

        update_loop.stop().unwrap();
        assert!(!update_loop.is_running());
        assert!(update_loop.sink().is_some());
        assert!(update_loop.pipeline().unwrap().stats().ticks >= 1);

        update_loop.start().unwrap();
        drop(update_loop);
    }

    #[test]
    fn panicking_sink_ends_the_loop() {
        let register = Arc::new(LatestSampleRegister::new());
        register.push_sample(SensorSample::at_rest(9.81)).unwrap();
        let params = FilterParameters::default().with_tick_rate(500.0);
        let pipeline = AttitudePipeline::new(params, Arc::clone(&register), crate::time::MonotonicTime::new()).unwrap();

        let mut update_loop = UpdateLoop::new(pipeline, |update: &AttitudeUpdate| {
            if update.sample_version > 0 {
                panic!("sink failure");
            }
        });
        update_loop.start().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while update_loop.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!update_loop.is_running());

        // Restarting reaps the dead thread and surfaces the panic
        assert_eq!(
            update_loop.start(),
            Err(AttitudeError::Config { reason: "update loop thread panicked" })
        );
        assert!(!update_loop.is_running());
        assert_eq!(update_loop.stop(), Err(AttitudeError::NotRunning));
    }
}
