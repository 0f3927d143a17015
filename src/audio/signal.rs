//! Deterministic tone generator standing in for a microphone.
//!
//! Used by the demo mode, benches and tests. Every drain yields exactly
//! `block_len` samples, so results do not depend on wall-clock timing.

use std::f64::consts::TAU;

use super::capture::{AcquireError, AudioSource, CaptureStream};

/// Tone parameters for a [`SignalSource`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignalSpec {
    pub sample_rate: u32,
    pub frequency: f64,
    pub amplitude: f32,
    pub block_len: usize,
}

impl Default for SignalSpec {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            frequency: 120.0,
            amplitude: 0.05,
            block_len: 800,
        }
    }
}

#[derive(Debug)]
pub struct SignalSource {
    spec: SignalSpec,
    available: bool,
    live: bool,
    acquisitions: usize,
    releases: usize,
}

impl SignalSource {
    pub fn new(spec: SignalSpec) -> Self {
        Self {
            spec,
            available: true,
            live: false,
            acquisitions: 0,
            releases: 0,
        }
    }

    /// A source whose every acquisition fails, like a denied microphone.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(SignalSpec::default())
        }
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Applies to streams acquired after this call.
    pub fn set_spec(&mut self, spec: SignalSpec) {
        self.spec = spec;
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions
    }

    pub fn releases(&self) -> usize {
        self.releases
    }

    pub fn is_live(&self) -> bool {
        self.live
    }
}

impl AudioSource for SignalSource {
    type Stream = SignalStream;

    fn acquire(&mut self) -> Result<SignalStream, AcquireError> {
        if !self.available {
            return Err(AcquireError::DeviceUnavailable {
                detail: "signal source disabled".into(),
            });
        }
        if self.live {
            return Err(AcquireError::DeviceUnavailable {
                detail: "signal source already streaming".into(),
            });
        }
        self.live = true;
        self.acquisitions += 1;
        Ok(SignalStream {
            spec: self.spec,
            position: 0,
        })
    }

    fn release(&mut self, _stream: SignalStream) {
        self.live = false;
        self.releases += 1;
    }
}

#[derive(Debug)]
pub struct SignalStream {
    spec: SignalSpec,
    position: u64,
}

impl CaptureStream for SignalStream {
    fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    fn drain_into(&mut self, out: &mut Vec<f32>) {
        let rate = self.spec.sample_rate.max(1) as f64;
        let step = TAU * self.spec.frequency / rate;
        out.extend((0..self.spec.block_len).map(|offset| {
            let n = (self.position + offset as u64) as f64;
            self.spec.amplitude * (step * n).sin() as f32
        }));
        self.position += self.spec.block_len as u64;
    }
}
