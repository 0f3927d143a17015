//! Library exports for the `sonocheck` binary, benchmarks and tests.
/// Application directory layout.
pub mod app_dirs;
/// Audio capture sources.
pub mod audio;
/// Calibration offset applied to measured levels.
pub mod calibration;
/// Machine catalog and verdict logic.
pub mod diagnostics;
/// Weighting, spectrum and level extraction.
pub mod dsp;
/// Tracing subscriber setup.
pub mod logging;
/// Per-session processing graph.
pub mod pipeline;
/// Timed measurement sessions.
pub mod session;
/// Settings and history persistence.
pub mod storage;
