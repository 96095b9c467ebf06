//! Core engine orchestrating capture, preview, and recording sessions.
//!
//! The engine runs a blocking command loop on its own thread. The UI talks
//! to it over the bounded channels defined in `camrec-ipc` and renders
//! frames from the shared preview slot.

mod orchestrator;
mod resources;
mod settings;

pub use orchestrator::Engine;
pub use resources::{ActiveResources, ResourceManager};
pub use settings::{config_dir, DeviceCache, SettingsError, SettingsManager};
