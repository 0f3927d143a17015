use serde::{Deserialize, Serialize};
use thiserror::Error;

mod enumerate;
mod resolve;
pub(crate) mod stream;

pub use enumerate::{InputDeviceSummary, available_input_devices};
pub use resolve::resolve_input_stream_config;
pub(crate) use stream::build_mono_input_stream;

#[derive(Debug, Error)]
pub enum AudioInputError {
    #[error("No audio input devices found")]
    NoInputDevices,
    #[error("Could not list input devices: {source}")]
    ListInputDevices { source: cpal::DevicesError },
    #[error("Failed to read supported configs for {host_id}: {source}")]
    SupportedInputConfigs {
        host_id: String,
        source: cpal::SupportedStreamConfigsError,
    },
    #[error("Failed to open input stream: {source}")]
    OpenStream { source: cpal::BuildStreamError },
    #[error("Failed to read default input config: {source}")]
    DefaultInputConfig { source: cpal::DefaultStreamConfigError },
    #[error("Failed to start input stream: {source}")]
    StartStream { source: cpal::PlayStreamError },
    #[error("Unsupported input sample format {format}")]
    UnsupportedFormat { format: String },
}

/// Persisted microphone preferences. Unset fields fall back to the host
/// default device and its default configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AudioInputConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub buffer_size: Option<u32>,
}

/// Actual input parameters in use after opening a stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedInput {
    pub host_id: String,
    pub device_name: String,
    pub sample_rate: u32,
    pub buffer_size_frames: Option<u32>,
    pub channel_count: u16,
    pub used_fallback: bool,
}

/// Resolved device + stream configuration for input.
pub struct ResolvedInputConfig {
    pub device: cpal::Device,
    pub stream_config: cpal::StreamConfig,
    pub sample_format: cpal::SampleFormat,
    pub resolved: ResolvedInput,
}
