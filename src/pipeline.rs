//! Per-session processing graph: weighting filter, rolling analysis window,
//! spectrum and level extraction.

use tracing::trace;

use crate::audio::CaptureStream;
use crate::calibration::Calibration;
use crate::diagnostics::{MachineProfile, Metrics, to_metrics};
use crate::dsp::level::{self, LevelReading};
use crate::dsp::{FFT_SIZE, SpectrumAnalyzer, WeightingFilter};

/// Owns everything that must persist between polls of one running session.
///
/// Filter delay memory and the rolling window carry over from poll to poll;
/// a calibration change only affects the next extraction.
pub struct SamplePipeline {
    filter: WeightingFilter,
    analyzer: SpectrumAnalyzer,
    calibration: Calibration,
    window: Vec<f32>,
    incoming: Vec<f32>,
    magnitudes: Vec<u8>,
    last_reading: Option<LevelReading>,
}

impl SamplePipeline {
    pub fn new(sample_rate: u32, calibration: Calibration) -> Self {
        Self {
            filter: WeightingFilter::new(sample_rate),
            analyzer: SpectrumAnalyzer::new(),
            calibration,
            window: Vec::with_capacity(FFT_SIZE * 2),
            incoming: Vec::new(),
            magnitudes: Vec::new(),
            last_reading: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.filter.sample_rate()
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Takes effect on the next snapshot; filter state is untouched.
    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    /// A full analysis block has been collected.
    pub fn is_ready(&self) -> bool {
        self.window.len() >= FFT_SIZE
    }

    /// Weight raw samples and append them to the rolling window.
    pub fn push_samples(&mut self, samples: &[f32]) {
        self.window.reserve(samples.len());
        for &sample in samples {
            self.window.push(self.filter.process_sample(sample));
        }
        if self.window.len() > FFT_SIZE {
            let excess = self.window.len() - FFT_SIZE;
            self.window.drain(..excess);
        }
    }

    /// Drain the stream, then compute one snapshot.
    pub fn poll<S: CaptureStream>(&mut self, stream: &mut S, profile: &MachineProfile) -> Metrics {
        let mut incoming = std::mem::take(&mut self.incoming);
        incoming.clear();
        stream.drain_into(&mut incoming);
        self.push_samples(&incoming);
        self.incoming = incoming;
        self.snapshot(profile)
    }

    /// Metrics for the current window, or the idle snapshot before the first
    /// full block.
    pub fn snapshot(&mut self, profile: &MachineProfile) -> Metrics {
        if !self.is_ready() {
            trace!(
                "Pipeline not ready: {}/{} samples buffered",
                self.window.len(),
                FFT_SIZE
            );
            self.magnitudes.clear();
            self.last_reading = None;
            return Metrics::idle();
        }
        self.analyzer
            .analyze_into(&self.window, &mut self.magnitudes);
        let reading = level::extract(
            &self.window,
            &self.magnitudes,
            self.sample_rate(),
            self.calibration,
        );
        self.last_reading = Some(reading);
        to_metrics(&reading, profile)
    }

    /// Byte magnitudes from the latest snapshot, for display only.
    pub fn magnitudes(&self) -> &[u8] {
        &self.magnitudes
    }

    /// Weighted samples currently in the analysis window.
    pub fn time_domain(&self) -> &[f32] {
        &self.window
    }

    pub fn last_reading(&self) -> Option<&LevelReading> {
        self.last_reading.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn filter(&self) -> &WeightingFilter {
        &self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioSource, SignalSource, SignalSpec};
    use crate::diagnostics::{FrequencyRange, Status};

    fn motor() -> MachineProfile {
        MachineProfile {
            id: "motor".into(),
            name: "Motor".into(),
            category: "Motors".into(),
            max_db: 90.0,
            peak_freq_range: FrequencyRange {
                low: 50.0,
                high: 2_000.0,
            },
        }
    }

    fn tone(frequency: f64, amplitude: f32) -> SignalSpec {
        SignalSpec {
            sample_rate: 48_000,
            frequency,
            amplitude,
            block_len: 1_024,
        }
    }

    #[test]
    fn reports_idle_until_a_full_block_arrives() {
        let mut pipeline = SamplePipeline::new(48_000, Calibration::ZERO);
        pipeline.push_samples(&[0.1; FFT_SIZE - 1]);
        assert_eq!(pipeline.snapshot(&motor()), Metrics::idle());
        assert!(pipeline.magnitudes().is_empty());

        pipeline.push_samples(&[0.1]);
        assert!(pipeline.is_ready());
    }

    #[test]
    fn window_keeps_only_the_latest_block() {
        let mut pipeline = SamplePipeline::new(48_000, Calibration::ZERO);
        pipeline.push_samples(&vec![0.0; FFT_SIZE * 3 + 17]);
        assert_eq!(pipeline.time_domain().len(), FFT_SIZE);
    }

    #[test]
    fn in_band_tone_is_normal_and_stable() {
        let mut source = SignalSource::new(tone(1_000.0, 0.05));
        let mut stream = source.acquire().unwrap();
        let mut pipeline = SamplePipeline::new(48_000, Calibration::ZERO);
        let mut metrics = Metrics::idle();
        for _ in 0..8 {
            metrics = pipeline.poll(&mut stream, &motor());
        }
        assert_eq!(metrics.status, Status::Normal);
        assert!(metrics.is_stable);
        // Peak lands within one bin (23.4 Hz) of the tone.
        assert!((metrics.peak_frequency as i64 - 1_000).abs() <= 24);
        assert_eq!(pipeline.magnitudes().len(), FFT_SIZE / 2);
    }

    #[test]
    fn calibration_change_keeps_filter_state() {
        let mut source = SignalSource::new(tone(440.0, 0.1));
        let mut stream = source.acquire().unwrap();
        let mut pipeline = SamplePipeline::new(48_000, Calibration::ZERO);
        for _ in 0..4 {
            pipeline.poll(&mut stream, &motor());
        }
        let before_state = pipeline.filter().delay_state();
        let before_db = pipeline.snapshot(&motor()).db;

        pipeline.set_calibration(Calibration::new(6.0).unwrap());
        assert_eq!(pipeline.filter().delay_state(), before_state);
        let after_db = pipeline.snapshot(&motor()).db;
        assert!((after_db - before_db - 6.0).abs() < 1e-3);
    }

    #[test]
    fn loud_out_of_band_peak_is_abnormal() {
        let mut source = SignalSource::new(tone(5_000.0, 0.2));
        let mut stream = source.acquire().unwrap();
        let mut pipeline = SamplePipeline::new(48_000, Calibration::ZERO);
        let mut metrics = Metrics::idle();
        for _ in 0..4 {
            metrics = pipeline.poll(&mut stream, &motor());
        }
        let reading = pipeline.last_reading().copied().unwrap();
        assert!(reading.max_magnitude > 200);
        assert!(reading.db < 90.0);
        assert_eq!(metrics.status, Status::Abnormal);
    }
}
