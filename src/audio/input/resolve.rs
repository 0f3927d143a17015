use cpal::traits::{DeviceTrait, HostTrait};

use super::{AudioInputConfig, AudioInputError, ResolvedInput, ResolvedInputConfig};
use crate::audio::device::device_label;

/// Pick host, device and stream parameters for `config`, falling back to the
/// host defaults for anything missing or unavailable.
pub fn resolve_input_stream_config(
    config: &AudioInputConfig,
) -> Result<ResolvedInputConfig, AudioInputError> {
    let (host, host_id, host_fallback) = resolve_host(config.host.as_deref())?;
    let (device, device_name, device_fallback) = resolve_device(&host, config.device.as_deref())?;
    let default_config = device
        .default_input_config()
        .map_err(|source| AudioInputError::DefaultInputConfig { source })?;
    let supported: Vec<_> = device
        .supported_input_configs()
        .map_err(|source| AudioInputError::SupportedInputConfigs {
            host_id: host_id.clone(),
            source,
        })?
        .collect();
    if supported.is_empty() {
        return Err(AudioInputError::NoInputDevices);
    }
    let mut used_fallback = host_fallback || device_fallback;
    let (range, rate) = pick_stream_config(
        &supported,
        default_config.sample_rate().0,
        config.sample_rate,
        &mut used_fallback,
    );
    let mut stream_config = range
        .clone()
        .with_sample_rate(cpal::SampleRate(rate))
        .config();
    if let Some(size) = config.buffer_size.filter(|size| *size > 0) {
        stream_config.buffer_size = cpal::BufferSize::Fixed(size);
    }
    let applied_buffer = match stream_config.buffer_size {
        cpal::BufferSize::Default => None,
        cpal::BufferSize::Fixed(size) => Some(size),
    };
    Ok(ResolvedInputConfig {
        device,
        sample_format: range.sample_format(),
        resolved: ResolvedInput {
            host_id,
            device_name,
            sample_rate: stream_config.sample_rate.0,
            buffer_size_frames: applied_buffer,
            channel_count: stream_config.channels,
            used_fallback,
        },
        stream_config,
    })
}

pub(super) fn resolve_host(
    id: Option<&str>,
) -> Result<(cpal::Host, String, bool), AudioInputError> {
    let default_host = cpal::default_host();
    let default_id = default_host.id().name().to_string();
    let Some(requested) = id else {
        return Ok((default_host, default_id, false));
    };

    let host = cpal::available_hosts()
        .into_iter()
        .find(|candidate| candidate.name() == requested)
        .and_then(|id| cpal::host_from_id(id).ok())
        .unwrap_or(default_host);
    let resolved_id = host.id().name().to_string();
    let used_fallback = resolved_id != requested;
    Ok((host, resolved_id, used_fallback))
}

pub(super) fn resolve_device(
    host: &cpal::Host,
    name: Option<&str>,
) -> Result<(cpal::Device, String, bool), AudioInputError> {
    let default_device = host
        .default_input_device()
        .ok_or(AudioInputError::NoInputDevices)?;
    let default_name = device_label(&default_device).unwrap_or_else(|| "Default device".into());
    let requested_name = name.unwrap_or(&default_name);
    let devices = host
        .input_devices()
        .map_err(|source| AudioInputError::ListInputDevices { source })?;
    let chosen = devices.into_iter().find(|device| {
        device_label(device)
            .as_ref()
            .is_some_and(|name| name == requested_name)
    });
    let resolved = chosen.unwrap_or(default_device);
    let resolved_name = device_label(&resolved).unwrap_or_else(|| default_name.clone());
    let used_fallback = resolved_name != requested_name;
    Ok((resolved, resolved_name, used_fallback))
}

/// Prefer mono ranges (downmixing is free for them), then the requested rate,
/// then the device default rate.
fn pick_stream_config<'a>(
    supported: &'a [cpal::SupportedStreamConfigRange],
    default_rate: u32,
    requested_rate: Option<u32>,
    used_fallback: &mut bool,
) -> (&'a cpal::SupportedStreamConfigRange, u32) {
    let mut ranges: Vec<&cpal::SupportedStreamConfigRange> = supported.iter().collect();
    ranges.sort_by_key(|range| range.channels());

    if let Some(requested) = requested_rate {
        if let Some(range) = ranges
            .iter()
            .copied()
            .find(|range| rate_in_range(requested, range))
        {
            return (range, requested);
        }
        *used_fallback = true;
    }
    if let Some(range) = ranges
        .iter()
        .copied()
        .find(|range| rate_in_range(default_rate, range))
    {
        return (range, default_rate);
    }
    *used_fallback = true;
    let range = ranges[0];
    (range, range.max_sample_rate().0)
}

fn rate_in_range(rate: u32, range: &cpal::SupportedStreamConfigRange) -> bool {
    let min = range.min_sample_rate().0;
    let max = range.max_sample_rate().0;
    rate >= min && rate <= max
}
