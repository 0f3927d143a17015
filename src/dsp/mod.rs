//! Signal processing: loudness weighting, spectrum and level extraction.

pub mod biquad;
pub mod level;
pub mod spectrum;
pub mod weighting;

pub use level::{LevelReading, extract};
pub use spectrum::{BIN_COUNT, FFT_SIZE, SpectrumAnalyzer, bin_frequency};
pub use weighting::WeightingFilter;
