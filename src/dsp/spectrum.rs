use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Transform length in samples. Fixed so bin spacing never changes mid-session.
pub const FFT_SIZE: usize = 2048;
/// Number of magnitude bins produced per transform.
pub const BIN_COUNT: usize = FFT_SIZE / 2;
/// Level mapped to magnitude 0.
pub const MIN_DECIBELS: f32 = -100.0;
/// Level mapped to magnitude 255.
pub const MAX_DECIBELS: f32 = -30.0;

/// Centre frequency of `bin` for a transform of [`FFT_SIZE`] samples.
pub fn bin_frequency(bin: usize, sample_rate: u32) -> f64 {
    bin as f64 * sample_rate as f64 / FFT_SIZE as f64
}

/// Blackman window of `length` points (periodic form).
pub(crate) fn blackman_window(length: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    let len = length.max(1) as f32;
    (0..length)
        .map(|n| {
            let phase = 2.0 * PI * n as f32 / len;
            A0 - A1 * phase.cos() + A2 * (2.0 * phase).cos()
        })
        .collect()
}

/// Turns the latest time-domain block into byte-scaled bin magnitudes.
///
/// Every call recomputes the full spectrum from scratch; there is no
/// averaging between frames.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self {
            fft,
            window: blackman_window(FFT_SIZE),
            buffer: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            scratch,
        }
    }

    /// Analyze the trailing [`FFT_SIZE`] samples of `samples` into `out`.
    ///
    /// Shorter input is zero-padded at the front. `out` is resized to
    /// [`BIN_COUNT`].
    pub fn analyze_into(&mut self, samples: &[f32], out: &mut Vec<u8>) {
        let tail = &samples[samples.len().saturating_sub(FFT_SIZE)..];
        let pad = FFT_SIZE - tail.len();
        for (idx, cell) in self.buffer.iter_mut().enumerate() {
            let sample = if idx < pad { 0.0 } else { tail[idx - pad] };
            *cell = Complex::new(sample * self.window[idx], 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        out.clear();
        out.extend(
            self.buffer[..BIN_COUNT]
                .iter()
                .map(|bin| magnitude_to_byte(bin.norm() / FFT_SIZE as f32)),
        );
    }

    pub fn analyze(&mut self, samples: &[f32]) -> Vec<u8> {
        let mut out = Vec::with_capacity(BIN_COUNT);
        self.analyze_into(samples, &mut out);
        out
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn magnitude_to_byte(magnitude: f32) -> u8 {
    if magnitude <= 0.0 || !magnitude.is_finite() {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 * (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
    scaled.clamp(0.0, 255.0) as u8
}
