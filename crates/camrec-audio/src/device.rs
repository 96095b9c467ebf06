//! Microphone enumeration.

use cpal::traits::{DeviceTrait, HostTrait};
use tracing::debug;

use camrec_ipc::{DeviceDescriptor, DeviceKind};

use crate::error::AudioError;
use crate::AudioResult;

/// Enumerate all input audio devices.
///
/// An empty list means no microphones are present, which is not an error; a
/// failing OS query is.
pub fn enumerate_audio_devices() -> AudioResult<Vec<DeviceDescriptor>> {
    let host = cpal::default_host();

    let default_name = host
        .default_input_device()
        .and_then(|device| device.name().ok());

    let devices = host
        .input_devices()
        .map_err(|e| AudioError::Enumeration(e.to_string()))?;

    let mut descriptors = Vec::new();
    for device in devices {
        // Skip devices whose name cannot be read; they are not selectable.
        let Ok(name) = device.name() else { continue };

        descriptors.push(DeviceDescriptor {
            id: name.clone(),
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
            kind: DeviceKind::Audio,
        });
    }

    debug!(count = descriptors.len(), "Enumerated microphones");
    Ok(descriptors)
}
