//! Timed measurement session: one machine, one 10 second window, one verdict.
//!
//! A [`Session`] owns the audio source and the persistence collaborator. While
//! `Running` it holds the live stream together with a [`SamplePipeline`];
//! both are dropped on termination, after which exactly one
//! [`HistoryRecord`] is appended.

use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::audio::{AcquireError, AudioSource, CaptureStream};
use crate::calibration::{Calibration, CalibrationError};
use crate::diagnostics::{MachineProfile, Metrics};
use crate::pipeline::SamplePipeline;
use crate::storage::Persistence;

pub mod clock;
mod record;

pub use clock::{ClockDue, DEFAULT_REFRESH_HZ, SessionClock};
pub use record::HistoryRecord;

/// Length of one measurement window in seconds.
pub const DIAGNOSTIC_WINDOW_SECS: u32 = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No machine selected.
    #[default]
    Idle,
    /// Machine selected, not sampling.
    Armed,
    /// Sampling with the countdown active.
    Running,
    /// Sampling stopped; the last verdict stays on display.
    Finished,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Armed => "armed",
            SessionState::Running => "running",
            SessionState::Finished => "finished",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Select a machine before starting a measurement")]
    NoMachineSelected,
    #[error(transparent)]
    DeviceUnavailable(AcquireError),
}

/// What one call to [`Session::advance`] did, in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionEvents {
    /// Metrics published by a refresh frame, if one was due.
    pub polled: Option<Metrics>,
    /// Countdown seconds consumed.
    pub countdown_ticks: u32,
    /// Record emitted when the countdown expired during this call.
    pub finished: Option<HistoryRecord>,
}

struct ActiveCapture<S> {
    stream: S,
    pipeline: SamplePipeline,
    profile: MachineProfile,
}

pub struct Session<A: AudioSource, P: Persistence> {
    source: A,
    persistence: P,
    machine: Option<MachineProfile>,
    state: SessionState,
    remaining: Option<u32>,
    metrics: Metrics,
    magnitudes: Vec<u8>,
    calibration: Calibration,
    active: Option<ActiveCapture<A::Stream>>,
    clock: SessionClock,
}

impl<A: AudioSource, P: Persistence> Session<A, P> {
    /// Build an idle session, loading the stored calibration once.
    pub fn new(source: A, persistence: P) -> Self {
        let calibration = persistence.load_calibration().unwrap_or_else(|err| {
            warn!("Falling back to zero calibration: {err}");
            Calibration::ZERO
        });
        Self {
            source,
            persistence,
            machine: None,
            state: SessionState::Idle,
            remaining: None,
            metrics: Metrics::idle(),
            magnitudes: Vec::new(),
            calibration,
            active: None,
            clock: SessionClock::default(),
        }
    }

    pub fn with_refresh_hz(self, hz: u32) -> Self {
        self.with_clock(SessionClock::with_refresh_hz(hz))
    }

    pub fn with_clock(mut self, clock: SessionClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn machine(&self) -> Option<&MachineProfile> {
        self.machine.as_ref()
    }

    /// Most recently published snapshot.
    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    /// Magnitudes published alongside [`Session::metrics`].
    pub fn magnitudes(&self) -> &[u8] {
        &self.magnitudes
    }

    /// Seconds left in the window, `None` outside a window.
    pub fn remaining_seconds(&self) -> Option<u32> {
        self.remaining
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    pub fn refresh_interval(&self) -> Duration {
        self.clock.refresh_interval()
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn persistence_mut(&mut self) -> &mut P {
        &mut self.persistence
    }

    pub fn source(&self) -> &A {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut A {
        &mut self.source
    }

    /// Select the machine to assess. A running window is terminated first and
    /// its record returned.
    pub fn select_machine(&mut self, profile: MachineProfile) -> Option<HistoryRecord> {
        let record = self.terminate();
        debug!("Armed for {}", profile.id);
        self.machine = Some(profile);
        self.state = SessionState::Armed;
        self.remaining = None;
        self.metrics = Metrics::idle();
        self.magnitudes.clear();
        record
    }

    pub fn start(&mut self) -> Result<Option<HistoryRecord>, SessionError> {
        self.start_at(Instant::now())
    }

    /// Begin a new window with its clock anchored at `now`.
    ///
    /// A window that is still running is terminated before the source is
    /// acquired again; its record is returned.
    pub fn start_at(&mut self, now: Instant) -> Result<Option<HistoryRecord>, SessionError> {
        let profile = self.machine.clone().ok_or(SessionError::NoMachineSelected)?;
        let previous = self.terminate();

        self.metrics = Metrics::idle();
        self.magnitudes.clear();
        self.remaining = None;
        let stream = match self.source.acquire() {
            Ok(stream) => stream,
            Err(err) => {
                warn!("Could not start measurement for {}: {err}", profile.id);
                self.state = SessionState::Armed;
                return Err(SessionError::DeviceUnavailable(err));
            }
        };

        let pipeline = SamplePipeline::new(stream.sample_rate(), self.calibration);
        info!(
            "Measuring {} for {DIAGNOSTIC_WINDOW_SECS}s at {} Hz",
            profile.id,
            stream.sample_rate()
        );
        self.active = Some(ActiveCapture {
            stream,
            pipeline,
            profile,
        });
        self.state = SessionState::Running;
        self.remaining = Some(DIAGNOSTIC_WINDOW_SECS);
        self.clock.arm(now);
        Ok(previous)
    }

    /// Refresh frame: pull one snapshot from the pipeline and publish it.
    pub fn poll(&mut self) -> Option<Metrics> {
        let active = self.active.as_mut()?;
        let metrics = active.pipeline.poll(&mut active.stream, &active.profile);
        self.magnitudes.clear();
        self.magnitudes.extend_from_slice(active.pipeline.magnitudes());
        self.metrics = metrics;
        Some(metrics)
    }

    /// Countdown tick. Returns the record when the window expires.
    pub fn tick_second(&mut self) -> Option<HistoryRecord> {
        if self.state != SessionState::Running {
            return None;
        }
        let remaining = self.remaining.unwrap_or(0).saturating_sub(1);
        self.remaining = Some(remaining);
        if remaining == 0 {
            return self.terminate();
        }
        None
    }

    /// Stop sampling and emit the verdict. No-op unless running.
    pub fn stop(&mut self) -> Option<HistoryRecord> {
        self.terminate()
    }

    /// Return to `Idle`, terminating a running window on the way.
    pub fn reset(&mut self) -> Option<HistoryRecord> {
        let record = self.terminate();
        self.state = SessionState::Idle;
        self.machine = None;
        self.remaining = None;
        self.metrics = Metrics::idle();
        self.magnitudes.clear();
        record
    }

    /// Applied from the next poll on; the live filter state is kept.
    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
        if let Some(active) = self.active.as_mut() {
            active.pipeline.set_calibration(calibration);
        }
    }

    /// Parse, apply and persist a calibration entered by the user. A rejected
    /// value leaves the current calibration in place.
    pub fn calibrate(&mut self, input: &str) -> Result<Calibration, CalibrationError> {
        let calibration: Calibration = input.parse()?;
        self.set_calibration(calibration);
        if let Err(err) = self.persistence.save_calibration(calibration) {
            warn!("Calibration {calibration} applied but not saved: {err}");
        }
        Ok(calibration)
    }

    /// Drive both cadences up to `now`. A due refresh frame is polled before
    /// any due countdown tick.
    pub fn advance(&mut self, now: Instant) -> SessionEvents {
        let mut events = SessionEvents::default();
        if self.state != SessionState::Running {
            return events;
        }
        let due = self.clock.due(now);
        if due.poll {
            events.polled = self.poll();
        }
        for _ in 0..due.ticks {
            events.countdown_ticks += 1;
            if let Some(record) = self.tick_second() {
                events.finished = Some(record);
                break;
            }
        }
        events
    }

    /// Shared termination path for stop, expiry, reset and restart.
    ///
    /// The stream is released before the record is built, and the record
    /// carries the last published metrics.
    fn terminate(&mut self) -> Option<HistoryRecord> {
        let active = self.active.take()?;
        self.state = SessionState::Finished;
        self.clock.disarm();
        self.source.release(active.stream);

        let record = HistoryRecord::new(&active.profile, &self.metrics, OffsetDateTime::now_utc());
        info!(
            "{} finished: {} at {:.1} dB, peak {} Hz",
            record.machine_id, record.status, record.db, record.peak_frequency
        );
        if let Err(err) = self.persistence.append_history(record.clone()) {
            warn!("Failed to store history record {}: {err}", record.id);
        }
        Some(record)
    }
}

impl<A: AudioSource, P: Persistence> Drop for Session<A, P> {
    fn drop(&mut self) {
        if self.state == SessionState::Running {
            let _ = self.terminate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SignalSource, SignalSpec};
    use crate::diagnostics::{Status, builtin_catalog};
    use crate::storage::MemoryStore;

    fn session() -> Session<SignalSource, MemoryStore> {
        Session::new(SignalSource::new(SignalSpec::default()), MemoryStore::new())
    }

    #[test]
    fn start_requires_a_machine() {
        let mut session = session();
        assert!(matches!(
            session.start(),
            Err(SessionError::NoMachineSelected)
        ));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn poll_publishes_only_while_running() {
        let mut session = session();
        assert_eq!(session.poll(), None);
        session.select_machine(builtin_catalog()[0].clone());
        session.start().unwrap();
        // 800 samples per drain; the third poll completes a 2048 block.
        assert_eq!(session.poll().unwrap().status, Status::Idle);
        session.poll();
        let metrics = session.poll().unwrap();
        assert_ne!(metrics.status, Status::Idle);
        assert_eq!(session.metrics(), metrics);
        assert_eq!(session.magnitudes().len(), crate::dsp::BIN_COUNT);
    }

    #[test]
    fn tick_outside_running_is_ignored() {
        let mut session = session();
        assert_eq!(session.tick_second(), None);
        assert_eq!(session.remaining_seconds(), None);
    }

    #[test]
    fn rejected_calibration_keeps_previous_value() {
        let mut session = session();
        session.calibrate("3.5").unwrap();
        assert!(session.calibrate("75").is_err());
        assert!(session.calibrate("loud").is_err());
        assert_eq!(session.calibration(), Calibration::new(3.5).unwrap());
        assert_eq!(
            session.persistence().load_calibration().unwrap(),
            Calibration::new(3.5).unwrap()
        );
    }

    #[test]
    fn advance_polls_before_the_expiring_tick() {
        let start = Instant::now();
        let mut session = session();
        session.select_machine(builtin_catalog()[0].clone());
        session.start_at(start).unwrap();
        for _ in 0..3 {
            session.poll();
        }
        let events = session.advance(start + Duration::from_secs(DIAGNOSTIC_WINDOW_SECS as u64));
        let polled = events.polled.unwrap();
        assert_eq!(events.countdown_ticks, DIAGNOSTIC_WINDOW_SECS);
        let record = events.finished.unwrap();
        assert_eq!(record.db, polled.db);
        assert_eq!(record.status, polled.status);
        assert_eq!(session.state(), SessionState::Finished);
        assert_eq!(session.remaining_seconds(), Some(0));
    }
}
