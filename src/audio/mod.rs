//! Audio acquisition: the source abstraction, the cpal microphone and a
//! deterministic tone generator.

mod capture;
mod device;
pub mod input;
mod microphone;
mod signal;

pub use capture::{AcquireError, AudioSource, CaptureStream};
pub use input::{AudioInputConfig, AudioInputError, InputDeviceSummary, available_input_devices};
pub use microphone::{MicrophoneSource, MicrophoneStream};
pub use signal::{SignalSource, SignalSpec, SignalStream};
