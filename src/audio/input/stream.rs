use cpal::traits::DeviceTrait;
use cpal::{FromSample, Sample, SizedSample};
use tracing::warn;

use super::AudioInputError;

/// Open an input stream that hands mono f32 blocks to `on_samples`.
///
/// Interleaved frames are averaged across channels; every integer format is
/// normalized to [-1, 1].
pub(crate) fn build_mono_input_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    on_samples: impl FnMut(Vec<f32>) + Send + 'static,
) -> Result<cpal::Stream, AudioInputError> {
    match sample_format {
        cpal::SampleFormat::F32 => build_typed::<f32>(device, config, on_samples),
        cpal::SampleFormat::F64 => build_typed::<f64>(device, config, on_samples),
        cpal::SampleFormat::I8 => build_typed::<i8>(device, config, on_samples),
        cpal::SampleFormat::I16 => build_typed::<i16>(device, config, on_samples),
        cpal::SampleFormat::I32 => build_typed::<i32>(device, config, on_samples),
        cpal::SampleFormat::U8 => build_typed::<u8>(device, config, on_samples),
        cpal::SampleFormat::U16 => build_typed::<u16>(device, config, on_samples),
        cpal::SampleFormat::U32 => build_typed::<u32>(device, config, on_samples),
        format => Err(AudioInputError::UnsupportedFormat {
            format: format!("{format:?}"),
        }),
    }
}

fn build_typed<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut on_samples: impl FnMut(Vec<f32>) + Send + 'static,
) -> Result<cpal::Stream, AudioInputError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    let err_fn = |err: cpal::StreamError| {
        warn!("Audio input stream error: {err}");
    };
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                on_samples(downmix(data, channels, |sample| sample.to_sample::<f32>()));
            },
            err_fn,
            None,
        )
        .map_err(|source| AudioInputError::OpenStream { source })
}

fn downmix<T: Copy>(data: &[T], channels: usize, convert: impl Fn(T) -> f32) -> Vec<f32> {
    let channels = channels.max(1);
    if channels == 1 {
        return data.iter().map(|&sample| convert(sample)).collect();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().map(|&sample| convert(sample)).sum::<f32>() / frame.len() as f32)
        .collect()
}
