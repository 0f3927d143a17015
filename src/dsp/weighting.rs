//! Fixed biquad cascade approximating the A-weighting loudness curve.
//!
//! This is a low-order approximation, not a standards-compliant weighting
//! network. The stage parameters are constants; only the sample rate varies.

use std::f64::consts::FRAC_1_SQRT_2;

use super::biquad::{Biquad, BiquadKind, BiquadSpec};

/// Stages applied in series, in order.
pub const WEIGHTING_STAGES: [BiquadSpec; 4] = [
    BiquadSpec {
        kind: BiquadKind::HighPass,
        frequency: 20.6,
        q: FRAC_1_SQRT_2,
    },
    BiquadSpec {
        kind: BiquadKind::HighPass,
        frequency: 107.7,
        q: FRAC_1_SQRT_2,
    },
    BiquadSpec {
        kind: BiquadKind::LowPass,
        frequency: 12_200.0,
        q: FRAC_1_SQRT_2,
    },
    BiquadSpec {
        kind: BiquadKind::Peaking { gain_db: 1.2 },
        frequency: 2_500.0,
        q: 1.0,
    },
];

/// Per-session filter graph. Owns the delay memory of every stage and is
/// advanced in place, so weighting stays continuous between polls.
#[derive(Clone, Debug)]
pub struct WeightingFilter {
    stages: [Biquad; 4],
    sample_rate: u32,
}

impl WeightingFilter {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            stages: WEIGHTING_STAGES.map(|spec| Biquad::new(spec, sample_rate)),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        self.stages
            .iter_mut()
            .fold(input, |sample, stage| stage.process(sample))
    }

    /// Filter `samples` in place.
    pub fn process_block(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    /// Combined magnitude response of the cascade in dB.
    pub fn response_db(&self, frequency: f64) -> f64 {
        self.stages
            .iter()
            .map(|stage| stage.response_db(frequency, self.sample_rate))
            .sum()
    }

    #[cfg(test)]
    pub(crate) fn delay_state(&self) -> Vec<(f64, f64)> {
        self.stages.iter().map(Biquad::state).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rms(samples: &[f32]) -> f64 {
        let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum / samples.len() as f64).sqrt()
    }

    fn tone(frequency: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| {
                (2.0 * std::f32::consts::PI * frequency * n as f32 / sample_rate as f32).sin()
            })
            .collect()
    }

    #[test]
    fn one_kilohertz_passes_nearly_unchanged() {
        let mut filter = WeightingFilter::new(48_000);
        let mut signal = tone(1_000.0, 48_000, 48_000);
        let input_rms = rms(&signal[24_000..]);
        filter.process_block(&mut signal);
        let gain_db = 20.0 * (rms(&signal[24_000..]) / input_rms).log10();
        assert!(gain_db.abs() < 0.5, "1 kHz gain {gain_db}");
    }

    #[test]
    fn low_rumble_is_attenuated() {
        let filter = WeightingFilter::new(48_000);
        assert!(filter.response_db(30.0) < -20.0);
        assert!(filter.response_db(2_500.0) > filter.response_db(500.0));
    }

    #[test]
    fn delay_memory_survives_between_blocks() {
        let mut filter = WeightingFilter::new(44_100);
        let mut block = tone(440.0, 44_100, 256);
        filter.process_block(&mut block);
        let state = filter.delay_state();
        assert!(state.iter().any(|(z1, z2)| *z1 != 0.0 || *z2 != 0.0));

        filter.reset();
        assert!(
            filter
                .delay_state()
                .iter()
                .all(|(z1, z2)| *z1 == 0.0 && *z2 == 0.0)
        );
    }
}
