use cpal::traits::HostTrait;

use super::AudioInputError;
use super::resolve::resolve_host;
use crate::audio::device::device_label;

/// Display entry for one capture device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputDeviceSummary {
    pub host_id: String,
    pub name: String,
    pub is_default: bool,
}

/// Enumerate input devices for a host (the platform default when `None`).
pub fn available_input_devices(
    host_id: Option<&str>,
) -> Result<Vec<InputDeviceSummary>, AudioInputError> {
    let (host, id, _) = resolve_host(host_id)?;
    let default_name = host
        .default_input_device()
        .and_then(|device| device_label(&device));
    let devices = host
        .input_devices()
        .map_err(|source| AudioInputError::ListInputDevices { source })?
        .filter_map(|device| {
            let name = device_label(&device)?;
            Some(InputDeviceSummary {
                host_id: id.clone(),
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
            })
        })
        .collect();
    Ok(devices)
}
