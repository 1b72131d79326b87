use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::schema::{Settings, SettingsUpdate};
use crate::error::ConfigError;

const CONFIG_DIR_NAME: &str = ".nano-batch";
const CONFIG_FILE_NAME: &str = "config.json";

/// Settings file at a fixed location, read on every access so edits made
/// by another process are picked up by the next job.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store at `~/.nano-batch/config.json`.
    pub fn at_default_location() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(Self::new(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn try_load(&self) -> Result<Settings, ConfigError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::ReadFile {
            path: self.path.clone(),
            source: e,
        })?;
        parse_settings(&content)
    }

    /// Loads settings, falling back to defaults when the file is missing
    /// or unreadable.
    pub fn load(&self) -> Settings {
        match self.try_load() {
            Ok(settings) => settings,
            Err(ConfigError::ReadFile { ref source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Settings::default()
            }
            Err(e) => {
                log::warn!("Using default settings: {}", e);
                Settings::default()
            }
        }
    }

    /// Merges `update` into the stored settings and writes the result.
    ///
    /// A file that cannot be read or is not JSON at all is left untouched
    /// and the error is returned.
    pub fn save(&self, update: SettingsUpdate) -> Result<Settings, ConfigError> {
        let mut settings = match self.try_load() {
            Ok(settings) => settings,
            Err(ConfigError::ReadFile { ref source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Settings::default()
            }
            Err(e) => return Err(e),
        };
        settings.merge(update);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&self.path, json).map_err(|e| ConfigError::WriteFile {
            path: self.path.clone(),
            source: e,
        })?;

        log::info!("Saved settings to {}", self.path.display());
        Ok(settings)
    }
}

/// Parses a settings file, keeping every field that is valid on its own.
///
/// A single bad value (an unknown aspect ratio, a negative concurrency)
/// falls back to its default instead of discarding the whole file.
fn parse_settings(content: &str) -> Result<Settings, ConfigError> {
    let value: Value = serde_json::from_str(content)?;
    if let Ok(settings) = Settings::deserialize(&value) {
        return Ok(settings);
    }

    let Value::Object(fields) = value else {
        return Ok(serde_json::from_value(value)?);
    };

    let mut valid = Map::new();
    for (key, field) in fields {
        let single = Value::Object(Map::from_iter([(key.clone(), field.clone())]));
        match Settings::deserialize(&single) {
            Ok(_) => {
                valid.insert(key, field);
            }
            Err(e) => log::warn!("Ignoring invalid setting '{}': {}", key, e),
        }
    }

    Ok(serde_json::from_value(Value::Object(valid))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AspectRatio;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = SettingsStore::new(temp_dir.path().join("config.json"));

        let settings = store.load();
        assert_eq!(settings.concurrency, 5);
        assert!(!settings.has_api_key());
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(&path);
        assert!(matches!(store.try_load(), Err(ConfigError::ParseJson(_))));
        assert_eq!(store.load().concurrency, 5);
    }

    #[test]
    fn test_load_keeps_valid_fields_next_to_invalid_ones() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"apiKey":"my-key","defaultAspectRatio":"21:9","concurrency":3}"#,
        )
        .unwrap();

        let settings = SettingsStore::new(&path).load();
        assert_eq!(settings.api_key, "my-key");
        assert_eq!(settings.concurrency, 3);
        assert_eq!(settings.default_aspect_ratio, AspectRatio::Square);
    }

    #[test]
    fn test_save_over_invalid_field_keeps_stored_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"apiKey":"my-key","defaultAspectRatio":"21:9","concurrency":-2,"outputFolder":"/data/out"}"#,
        )
        .unwrap();

        let store = SettingsStore::new(&path);
        let saved = store
            .save(SettingsUpdate {
                default_mood: Some("dark".to_string()),
                ..SettingsUpdate::default()
            })
            .unwrap();

        assert_eq!(saved.api_key, "my-key");
        assert_eq!(saved.default_mood, "dark");
        assert_eq!(saved.output_folder, std::path::PathBuf::from("/data/out"));
        assert_eq!(saved.concurrency, 5);

        let reloaded = store.try_load().unwrap();
        assert_eq!(reloaded, saved);
    }

    #[test]
    fn test_save_refuses_to_overwrite_unparseable_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(&path);
        let result = store.save(SettingsUpdate {
            default_mood: Some("dark".to_string()),
            ..SettingsUpdate::default()
        });

        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_save_creates_directory_and_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let store = SettingsStore::new(temp_dir.path().join("nested/dir/config.json"));

        let saved = store
            .save(SettingsUpdate {
                api_key: Some("abc".to_string()),
                concurrency: Some(3),
                default_aspect_ratio: Some(AspectRatio::Landscape),
                ..SettingsUpdate::default()
            })
            .unwrap();
        assert_eq!(saved.concurrency, 3);

        let loaded = store.try_load().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded.api_key, "abc");
        assert_eq!(loaded.default_aspect_ratio, AspectRatio::Landscape);
    }

    #[test]
    fn test_save_partial_update_keeps_other_fields() {
        let temp_dir = TempDir::new().unwrap();
        let store = SettingsStore::new(temp_dir.path().join("config.json"));

        store
            .save(SettingsUpdate {
                api_key: Some("abc".to_string()),
                default_style: Some("anime".to_string()),
                ..SettingsUpdate::default()
            })
            .unwrap();
        let updated = store
            .save(SettingsUpdate {
                default_mood: Some("dark".to_string()),
                ..SettingsUpdate::default()
            })
            .unwrap();

        assert_eq!(updated.api_key, "abc");
        assert_eq!(updated.default_style, "anime");
        assert_eq!(updated.default_mood, "dark");
    }
}
