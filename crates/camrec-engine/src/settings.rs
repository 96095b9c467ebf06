//! Persistent settings and device cache.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use camrec_ipc::{DeviceDescriptor, Resolution, Settings, ADJUST_MAX, ADJUST_MIN};

/// Errors from validated settings mutation.
#[derive(Debug, Clone, Error)]
pub enum SettingsError {
    /// Device and resolution changes are rejected while recording.
    #[error("settings are locked while a recording session is active")]
    Locked,
}

/// Directory holding settings and cache files (`~/.camrec`).
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".camrec"))
}

/// Validated, persistent settings store.
///
/// Brightness and contrast setters clamp rather than error. Device and
/// resolution setters fail with [`SettingsError::Locked`] while a recording
/// session holds the lock. Persistence failures are logged, never fatal.
pub struct SettingsManager {
    settings: RwLock<Settings>,
    locked: AtomicBool,
    path: Option<PathBuf>,
}

impl SettingsManager {
    /// Create a manager backed by `path` (None keeps settings in memory).
    pub fn new(path: Option<PathBuf>) -> Self {
        let settings = path
            .as_deref()
            .and_then(load_settings_file)
            .unwrap_or_default();

        Self {
            settings: RwLock::new(settings),
            locked: AtomicBool::new(false),
            path,
        }
    }

    /// Create a manager backed by `~/.camrec/settings.json`.
    pub fn load_default() -> Self {
        Self::new(config_dir().map(|dir| dir.join("settings.json")))
    }

    /// Current settings snapshot.
    pub fn snapshot(&self) -> Settings {
        self.settings.read().clone()
    }

    /// Reject device and resolution changes until [`unlock`](Self::unlock).
    pub fn lock(&self) {
        self.locked.store(true, Ordering::SeqCst);
    }

    /// Allow device and resolution changes again.
    pub fn unlock(&self) {
        self.locked.store(false, Ordering::SeqCst);
    }

    /// Whether device and resolution changes are currently rejected.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    /// Set brightness, clamped to the valid range. Returns the stored value.
    pub fn set_brightness(&self, value: i32) -> i32 {
        let clamped = value.clamp(ADJUST_MIN, ADJUST_MAX);
        self.settings.write().brightness = clamped;
        self.persist();
        clamped
    }

    /// Set contrast, clamped to the valid range. Returns the stored value.
    pub fn set_contrast(&self, value: i32) -> i32 {
        let clamped = value.clamp(ADJUST_MIN, ADJUST_MAX);
        self.settings.write().contrast = clamped;
        self.persist();
        clamped
    }

    /// Change the capture resolution. Rejected while recording.
    pub fn set_resolution(&self, resolution: Resolution) -> Result<(), SettingsError> {
        self.ensure_unlocked()?;
        self.settings.write().resolution = resolution;
        self.persist();
        Ok(())
    }

    /// Select a camera by id. Rejected while recording.
    pub fn set_video_device(&self, id: String) -> Result<(), SettingsError> {
        self.ensure_unlocked()?;
        self.settings.write().video_device = Some(id);
        self.persist();
        Ok(())
    }

    /// Select a microphone by id, or disable audio. Rejected while recording.
    pub fn set_audio_device(&self, id: Option<String>) -> Result<(), SettingsError> {
        self.ensure_unlocked()?;
        self.settings.write().audio_device = id;
        self.persist();
        Ok(())
    }

    /// Change the output directory. Allowed while recording since it only
    /// affects the next session.
    pub fn set_output_dir(&self, dir: PathBuf) {
        self.settings.write().output_dir = Some(dir);
        self.persist();
    }

    fn ensure_unlocked(&self) -> Result<(), SettingsError> {
        if self.is_locked() {
            return Err(SettingsError::Locked);
        }
        Ok(())
    }

    fn persist(&self) {
        let Some(ref path) = self.path else {
            return;
        };

        let settings = self.settings.read().clone();
        if let Err(e) = write_json(path, &settings) {
            warn!("Failed to persist settings to {}: {e}", path.display());
        }
    }
}

fn load_settings_file(path: &Path) -> Option<Settings> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(settings) => {
            info!("Loaded settings from {}", path.display());
            Some(settings)
        }
        Err(e) => {
            warn!("Ignoring invalid settings file {}: {e}", path.display());
            None
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    fs::write(path, json)
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct CachedDevices {
    video: Vec<DeviceDescriptor>,
    audio: Vec<DeviceDescriptor>,
}

/// On-disk cache of device enumeration results (`devices.json`).
///
/// Enumeration can take seconds on some backends, so results from the first
/// launch are reused. A missing or invalid file triggers a fresh scan.
pub struct DeviceCache {
    path: Option<PathBuf>,
    cached: Mutex<Option<CachedDevices>>,
}

impl DeviceCache {
    /// Create a cache backed by `path` (None disables persistence).
    pub fn new(path: Option<PathBuf>) -> Self {
        let cached = path.as_deref().and_then(load_device_file);
        Self {
            path,
            cached: Mutex::new(cached),
        }
    }

    /// Create a cache backed by `~/.camrec/devices.json`.
    pub fn load_default() -> Self {
        Self::new(config_dir().map(|dir| dir.join("devices.json")))
    }

    /// Cached camera list, running `refresh` on a miss.
    ///
    /// A failed refresh is returned to the caller and never cached, so the
    /// next request scans again.
    pub fn video_devices<F, E>(&self, refresh: F) -> Result<Vec<DeviceDescriptor>, E>
    where
        F: FnOnce() -> Result<Vec<DeviceDescriptor>, E>,
    {
        let mut cached = self.cached.lock();
        if let Some(ref devices) = *cached {
            if !devices.video.is_empty() {
                debug!("Using cached camera list");
                return Ok(devices.video.clone());
            }
        }

        let fresh = refresh()?;
        let entry = cached.get_or_insert_with(CachedDevices::default);
        entry.video = fresh.clone();
        self.store(entry);
        Ok(fresh)
    }

    /// Cached microphone list, running `refresh` on a miss.
    ///
    /// A failed refresh is returned to the caller and never cached, so the
    /// next request scans again.
    pub fn audio_devices<F, E>(&self, refresh: F) -> Result<Vec<DeviceDescriptor>, E>
    where
        F: FnOnce() -> Result<Vec<DeviceDescriptor>, E>,
    {
        let mut cached = self.cached.lock();
        if let Some(ref devices) = *cached {
            if !devices.audio.is_empty() {
                debug!("Using cached microphone list");
                return Ok(devices.audio.clone());
            }
        }

        let fresh = refresh()?;
        let entry = cached.get_or_insert_with(CachedDevices::default);
        entry.audio = fresh.clone();
        self.store(entry);
        Ok(fresh)
    }

    fn store(&self, devices: &CachedDevices) {
        let Some(ref path) = self.path else {
            return;
        };
        if let Err(e) = write_json(path, devices) {
            warn!("Failed to persist device cache to {}: {e}", path.display());
        }
    }
}

fn load_device_file(path: &Path) -> Option<CachedDevices> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(devices) => Some(devices),
        Err(e) => {
            warn!("Ignoring invalid device cache {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camrec_ipc::DeviceKind;

    #[test]
    fn test_brightness_clamps() {
        let manager = SettingsManager::new(None);
        assert_eq!(manager.set_brightness(150), 100);
        assert_eq!(manager.set_brightness(-150), -100);
        assert_eq!(manager.set_brightness(25), 25);
        assert_eq!(manager.snapshot().brightness, 25);
    }

    #[test]
    fn test_locked_rejects_device_changes() {
        let manager = SettingsManager::new(None);
        manager.lock();

        assert!(manager.set_video_device("1".into()).is_err());
        assert!(manager.set_audio_device(None).is_err());
        assert!(manager.set_resolution(Resolution::new(640, 480)).is_err());

        // Live adjustments and output dir stay available.
        assert_eq!(manager.set_contrast(10), 10);
        manager.set_output_dir(PathBuf::from("/tmp"));

        manager.unlock();
        assert!(manager.set_video_device("1".into()).is_ok());
    }

    #[test]
    fn test_settings_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let manager = SettingsManager::new(Some(path.clone()));
        manager.set_brightness(40);
        manager.set_video_device("2".into()).unwrap();
        manager.set_output_dir(dir.path().join("out"));

        let reloaded = SettingsManager::new(Some(path));
        let settings = reloaded.snapshot();
        assert_eq!(settings.brightness, 40);
        assert_eq!(settings.video_device.as_deref(), Some("2"));
        assert_eq!(settings.output_dir, Some(dir.path().join("out")));
    }

    #[test]
    fn test_invalid_settings_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let manager = SettingsManager::new(Some(path));
        assert_eq!(manager.snapshot(), Settings::default());
    }

    fn descriptor(id: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            id: id.to_string(),
            name: format!("Camera {id}"),
            kind: DeviceKind::Video,
            is_default: id == "0",
        }
    }

    #[test]
    fn test_device_cache_scans_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");

        let cache = DeviceCache::new(Some(path.clone()));
        let first = cache
            .video_devices(|| Ok::<_, String>(vec![descriptor("0"), descriptor("1")]))
            .unwrap();
        assert_eq!(first.len(), 2);

        // A reloaded cache must not hit the refresh closure again.
        let cache = DeviceCache::new(Some(path));
        let second = cache
            .video_devices(|| -> Result<Vec<DeviceDescriptor>, String> {
                panic!("enumeration should be cached")
            })
            .unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn test_device_cache_refreshes_on_empty_list() {
        let cache = DeviceCache::new(None);
        let empty = cache.video_devices(|| Ok::<_, String>(Vec::new())).unwrap();
        assert!(empty.is_empty());

        let retried = cache
            .video_devices(|| Ok::<_, String>(vec![descriptor("0")]))
            .unwrap();
        assert_eq!(retried.len(), 1);
    }

    #[test]
    fn test_device_cache_does_not_cache_failures() {
        let cache = DeviceCache::new(None);
        let failed = cache.video_devices(|| Err::<Vec<DeviceDescriptor>, _>("no backend".to_string()));
        assert_eq!(failed.unwrap_err(), "no backend");

        // The failure must not poison the cache.
        let recovered = cache
            .video_devices(|| Ok::<_, String>(vec![descriptor("0")]))
            .unwrap();
        assert_eq!(recovered.len(), 1);
    }
}
