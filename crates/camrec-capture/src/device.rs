//! Camera enumeration.

use nokhwa::query;
use nokhwa::utils::{ApiBackend, CameraIndex};
use tracing::debug;

use camrec_ipc::{DeviceDescriptor, DeviceKind};

use crate::error::CaptureError;
use crate::CaptureResult;

/// Enumerate all cameras exposed by the OS.
///
/// An empty list means no cameras are present, which is not an error; a
/// failing OS query is.
pub fn enumerate_video_devices() -> CaptureResult<Vec<DeviceDescriptor>> {
    let cameras = query(ApiBackend::Auto).map_err(|e| CaptureError::Enumeration(e.to_string()))?;

    let devices: Vec<DeviceDescriptor> = cameras
        .iter()
        .map(|info| DeviceDescriptor {
            id: info.index().to_string(),
            name: info.human_name(),
            kind: DeviceKind::Video,
            is_default: matches!(info.index(), CameraIndex::Index(0)),
        })
        .collect();

    debug!(count = devices.len(), "Enumerated cameras");
    Ok(devices)
}

/// Parse a device id produced by [`enumerate_video_devices`] back into a
/// camera index.
pub(crate) fn parse_device_index(id: &str) -> CaptureResult<CameraIndex> {
    id.trim()
        .parse::<u32>()
        .map(CameraIndex::Index)
        .map_err(|_| CaptureError::InvalidDeviceId(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_index() {
        assert_eq!(parse_device_index("0").unwrap(), CameraIndex::Index(0));
        assert_eq!(parse_device_index(" 3 ").unwrap(), CameraIndex::Index(3));
        assert!(matches!(
            parse_device_index("webcam"),
            Err(CaptureError::InvalidDeviceId(_))
        ));
    }
}
