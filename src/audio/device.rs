use cpal::traits::DeviceTrait;

/// Human-readable device name, if the backend can report one.
pub(crate) fn device_label(device: &cpal::Device) -> Option<String> {
    device
        .name()
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}
