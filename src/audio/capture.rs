use thiserror::Error;

use super::input::AudioInputError;

/// Why a capture stream could not be opened.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// Permission denied, device missing or already in use.
    #[error("Audio device unavailable: {detail}")]
    DeviceUnavailable { detail: String },
    #[error(transparent)]
    Input(#[from] AudioInputError),
}

/// A live stream of mono samples in [-1, 1].
pub trait CaptureStream {
    fn sample_rate(&self) -> u32;

    /// Move every sample buffered since the previous call into `out`.
    ///
    /// Must not block; an empty drain is normal between device callbacks.
    fn drain_into(&mut self, out: &mut Vec<f32>);
}

/// Hands out capture streams. At most one stream is live per source.
pub trait AudioSource {
    type Stream: CaptureStream;

    fn acquire(&mut self) -> Result<Self::Stream, AcquireError>;

    /// Stop and drop a stream previously returned by [`AudioSource::acquire`].
    fn release(&mut self, stream: Self::Stream);
}
