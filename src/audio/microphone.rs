use std::sync::mpsc::{self, Receiver};

use cpal::traits::StreamTrait;
use tracing::{debug, info};

use super::capture::{AcquireError, AudioSource, CaptureStream};
use super::input::{
    AudioInputConfig, AudioInputError, ResolvedInput, build_mono_input_stream,
    resolve_input_stream_config,
};

/// System microphone opened through cpal.
pub struct MicrophoneSource {
    config: AudioInputConfig,
}

impl MicrophoneSource {
    pub fn new(config: AudioInputConfig) -> Self {
        Self { config }
    }
}

/// Live cpal input. The device callback only forwards blocks over a channel;
/// all processing happens on the polling thread.
pub struct MicrophoneStream {
    stream: cpal::Stream,
    receiver: Receiver<Vec<f32>>,
    resolved: ResolvedInput,
}

impl MicrophoneStream {
    pub fn resolved(&self) -> &ResolvedInput {
        &self.resolved
    }
}

impl AudioSource for MicrophoneSource {
    type Stream = MicrophoneStream;

    fn acquire(&mut self) -> Result<MicrophoneStream, AcquireError> {
        let resolved = resolve_input_stream_config(&self.config)?;
        let (sender, receiver) = mpsc::channel();
        let stream = build_mono_input_stream(
            &resolved.device,
            &resolved.stream_config,
            resolved.sample_format,
            move |samples| {
                let _ = sender.send(samples);
            },
        )?;
        stream
            .play()
            .map_err(|source| AudioInputError::StartStream { source })?;
        let resolved = resolved.resolved;
        if resolved.used_fallback {
            info!("Requested input unavailable; using fallback device settings");
        }
        info!(
            "Microphone acquired: {} via {} at {} Hz ({} ch)",
            resolved.device_name, resolved.host_id, resolved.sample_rate, resolved.channel_count
        );
        Ok(MicrophoneStream {
            stream,
            receiver,
            resolved,
        })
    }

    fn release(&mut self, stream: MicrophoneStream) {
        if let Err(err) = stream.stream.pause() {
            debug!("Pausing input stream before release failed: {err}");
        }
        info!("Microphone released: {}", stream.resolved.device_name);
        drop(stream);
    }
}

impl CaptureStream for MicrophoneStream {
    fn sample_rate(&self) -> u32 {
        self.resolved.sample_rate
    }

    fn drain_into(&mut self, out: &mut Vec<f32>) {
        while let Ok(block) = self.receiver.try_recv() {
            out.extend_from_slice(&block);
        }
    }
}
