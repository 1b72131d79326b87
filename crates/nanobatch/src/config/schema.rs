use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Styles the generation UI offers. Rows may still carry other values.
pub const KNOWN_STYLES: &[&str] = &[
    "photorealistic",
    "anime",
    "oil-painting",
    "watercolor",
    "pixel-art",
    "sketch",
    "3d-render",
    "comic",
];

/// Moods the generation UI offers. Rows may still carry other values.
pub const KNOWN_MOODS: &[&str] = &["neutral", "cinematic", "dreamy", "dark", "vibrant", "minimal"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "3:4")]
    StandardPortrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
        AspectRatio::Standard,
        AspectRatio::StandardPortrait,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Standard => "4:3",
            AspectRatio::StandardPortrait => "3:4",
        }
    }

    /// Parses a ratio as typed into a spreadsheet cell. `;` is accepted in
    /// place of `:` since spreadsheet tools like to turn `16:9` into a time.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().replace(';', ":");
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == normalized)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User settings persisted between runs.
///
/// Jobs take a clone of this at submission time, so edits only affect
/// jobs started afterwards.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_style")]
    pub default_style: String,
    #[serde(default = "default_mood")]
    pub default_mood: String,
    #[serde(default)]
    pub default_aspect_ratio: AspectRatio,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_output_folder")]
    pub output_folder: PathBuf,
}

fn default_style() -> String {
    "photorealistic".to_string()
}

fn default_mood() -> String {
    "neutral".to_string()
}

fn default_concurrency() -> usize {
    5
}

fn default_output_folder() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("output")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            default_style: default_style(),
            default_mood: default_mood(),
            default_aspect_ratio: AspectRatio::default(),
            concurrency: default_concurrency(),
            output_folder: default_output_folder(),
        }
    }
}

impl Settings {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Applies a partial update. A blank API key keeps the current one.
    pub fn merge(&mut self, update: SettingsUpdate) {
        if let Some(key) = update.api_key {
            let key = key.trim();
            if !key.is_empty() {
                self.api_key = key.to_string();
            }
        }
        if let Some(style) = update.default_style {
            self.default_style = style;
        }
        if let Some(mood) = update.default_mood {
            self.default_mood = mood;
        }
        if let Some(ratio) = update.default_aspect_ratio {
            self.default_aspect_ratio = ratio;
        }
        if let Some(concurrency) = update.concurrency {
            self.concurrency = concurrency.max(1);
        }
        if let Some(folder) = update.output_folder {
            self.output_folder = folder;
        }
    }

    pub fn view(&self) -> SettingsView {
        SettingsView {
            has_api_key: self.has_api_key(),
            default_style: self.default_style.clone(),
            default_mood: self.default_mood.clone(),
            default_aspect_ratio: self.default_aspect_ratio,
            concurrency: self.concurrency,
            output_folder: self.output_folder.clone(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &if self.has_api_key() { "****" } else { "" })
            .field("default_style", &self.default_style)
            .field("default_mood", &self.default_mood)
            .field("default_aspect_ratio", &self.default_aspect_ratio)
            .field("concurrency", &self.concurrency)
            .field("output_folder", &self.output_folder)
            .finish()
    }
}

/// Partial settings update as posted by the settings editor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub default_style: Option<String>,
    #[serde(default)]
    pub default_mood: Option<String>,
    #[serde(default)]
    pub default_aspect_ratio: Option<AspectRatio>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub output_folder: Option<PathBuf>,
}

/// Reader-facing settings. The API key is reduced to whether one is set.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub has_api_key: bool,
    pub default_style: String,
    pub default_mood: String,
    pub default_aspect_ratio: AspectRatio,
    pub concurrency: usize,
    pub output_folder: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio_parse() {
        assert_eq!(AspectRatio::parse("16:9"), Some(AspectRatio::Landscape));
        assert_eq!(AspectRatio::parse(" 9;16 "), Some(AspectRatio::Portrait));
        assert_eq!(AspectRatio::parse("2:1"), None);
        assert_eq!(AspectRatio::parse(""), None);
    }

    #[test]
    fn test_aspect_ratio_serde_uses_ratio_strings() {
        let json = serde_json::to_string(&AspectRatio::StandardPortrait).unwrap();
        assert_eq!(json, "\"3:4\"");
        let parsed: AspectRatio = serde_json::from_str("\"4:3\"").unwrap();
        assert_eq!(parsed, AspectRatio::Standard);
    }

    #[test]
    fn test_settings_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"concurrency": 2}"#).unwrap();
        assert_eq!(settings.concurrency, 2);
        assert_eq!(settings.default_style, "photorealistic");
        assert_eq!(settings.default_mood, "neutral");
        assert_eq!(settings.default_aspect_ratio, AspectRatio::Square);
        assert!(!settings.has_api_key());
    }

    #[test]
    fn test_merge_keeps_key_when_blank() {
        let mut settings = Settings {
            api_key: "secret".to_string(),
            ..Settings::default()
        };
        settings.merge(SettingsUpdate {
            api_key: Some("   ".to_string()),
            concurrency: Some(0),
            default_mood: Some("dreamy".to_string()),
            ..SettingsUpdate::default()
        });
        assert_eq!(settings.api_key, "secret");
        assert_eq!(settings.concurrency, 1);
        assert_eq!(settings.default_mood, "dreamy");
    }

    #[test]
    fn test_merge_replaces_key_trimmed() {
        let mut settings = Settings::default();
        settings.merge(SettingsUpdate {
            api_key: Some("  new-key ".to_string()),
            ..SettingsUpdate::default()
        });
        assert_eq!(settings.api_key, "new-key");
    }

    #[test]
    fn test_view_hides_key() {
        let settings = Settings {
            api_key: "secret".to_string(),
            ..Settings::default()
        };
        let json = serde_json::to_value(settings.view()).unwrap();
        assert_eq!(json["hasApiKey"], true);
        assert!(json.get("apiKey").is_none());
        assert!(!json.to_string().contains("secret"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let settings = Settings {
            api_key: "secret".to_string(),
            ..Settings::default()
        };
        assert!(!format!("{:?}", settings).contains("secret"));
    }
}
