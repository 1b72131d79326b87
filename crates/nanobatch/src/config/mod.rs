pub mod loader;
pub mod schema;

pub use loader::SettingsStore;
pub use schema::{AspectRatio, Settings, SettingsUpdate, SettingsView, KNOWN_MOODS, KNOWN_STYLES};
