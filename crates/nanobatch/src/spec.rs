//! Generation specs and the normalization of submitted rows into specs.
//!
//! Rows arrive already tabular (one JSON object per spreadsheet row). This
//! module only normalizes column names and cell values; it never reads a
//! spreadsheet format itself.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{AspectRatio, Settings, KNOWN_MOODS, KNOWN_STYLES};
use crate::error::SpecError;

/// Rows past this index are ignored.
pub const MAX_ROWS: usize = 500;

pub const MIN_COUNT: u8 = 1;
pub const MAX_COUNT: u8 = 4;

pub const KNOWN_COLUMNS: &[&str] = &[
    "prompt",
    "style",
    "mood",
    "aspect_ratio",
    "count",
    "negative_prompt",
    "seed",
    "label",
];

/// One submitted row, keyed by column header.
pub type RawRow = serde_json::Map<String, serde_json::Value>;

/// One requested image-generation unit. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    pub id: String,
    pub row_index: usize,
    pub prompt: String,
    pub style: String,
    pub mood: String,
    pub aspect_ratio: AspectRatio,
    pub count: u8,
    pub negative_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    pub label: String,
}

impl Spec {
    /// Creates a spec with the settings defaults for everything but the prompt.
    pub fn new(row_index: usize, prompt: &str, settings: &Settings) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            row_index,
            prompt: prompt.to_string(),
            style: settings.default_style.clone(),
            mood: settings.default_mood.clone(),
            aspect_ratio: settings.default_aspect_ratio,
            count: MIN_COUNT,
            negative_prompt: String::new(),
            seed: None,
            label: default_label(row_index),
        }
    }

    /// Generation multiplicity clamped into the supported range.
    pub fn clamp_count(count: i64) -> u8 {
        count.clamp(MIN_COUNT as i64, MAX_COUNT as i64) as u8
    }
}

fn default_label(row_index: usize) -> String {
    format!("image-{}", row_index)
}

static RE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\-]+").unwrap());

/// `" Aspect Ratio "` and `"aspect-ratio"` both become `"aspect_ratio"`.
pub fn normalize_key(key: &str) -> String {
    RE_SEPARATOR
        .replace_all(&key.trim().to_lowercase(), "_")
        .into_owned()
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Leading-integer parse: `"3"`, `"3.7"` and `" 3px"` all yield 3.
fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

struct NormalizedRow(std::collections::HashMap<String, String>);

impl NormalizedRow {
    fn from_raw(row: &RawRow) -> Self {
        Self(
            row.iter()
                .map(|(k, v)| (normalize_key(k), cell_text(v)))
                .collect(),
        )
    }

    fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }
}

/// Normalizes submitted rows into specs.
///
/// Rows without a prompt are skipped but still consume a row index, so
/// file names keep pointing at the spreadsheet row they came from.
pub fn normalize_rows(rows: &[RawRow], settings: &Settings) -> Result<Vec<Spec>, SpecError> {
    if rows.is_empty() {
        return Err(SpecError::NoRows);
    }

    let normalized: Vec<NormalizedRow> = rows
        .iter()
        .take(MAX_ROWS)
        .map(NormalizedRow::from_raw)
        .collect();

    let columns: BTreeSet<&str> = normalized
        .iter()
        .flat_map(|row| row.0.keys().map(String::as_str))
        .collect();
    if !columns.contains("prompt") {
        return Err(SpecError::MissingPromptColumn {
            found: columns.into_iter().collect::<Vec<_>>().join(", "),
        });
    }
    for column in columns.iter().filter(|c| !KNOWN_COLUMNS.contains(c)) {
        log::debug!("Ignoring unknown column: {}", column);
    }

    let specs: Vec<Spec> = normalized
        .iter()
        .enumerate()
        .filter_map(|(row_index, row)| normalize_row(row_index, row, settings))
        .collect();

    if specs.is_empty() {
        return Err(SpecError::NoPrompts);
    }
    Ok(specs)
}

fn normalize_row(row_index: usize, row: &NormalizedRow, settings: &Settings) -> Option<Spec> {
    let prompt = row.get("prompt");
    if prompt.is_empty() {
        return None;
    }

    let mut spec = Spec::new(row_index, prompt, settings);

    let count = parse_leading_int(row.get("count"))
        .filter(|n| *n != 0)
        .unwrap_or(1);
    spec.count = Spec::clamp_count(count);
    spec.seed = parse_leading_int(row.get("seed"));

    if let Some(ratio) = AspectRatio::parse(row.get("aspect_ratio")) {
        spec.aspect_ratio = ratio;
    }

    let style = row.get("style");
    if !style.is_empty() {
        if !KNOWN_STYLES.contains(&style) {
            log::debug!("Row {} uses unlisted style '{}'", row_index, style);
        }
        spec.style = style.to_string();
    }

    let mood = row.get("mood");
    if !mood.is_empty() {
        if !KNOWN_MOODS.contains(&mood) {
            log::debug!("Row {} uses unlisted mood '{}'", row_index, mood);
        }
        spec.mood = mood.to_string();
    }

    spec.negative_prompt = row.get("negative_prompt").to_string();

    let label = row.get("label");
    if !label.is_empty() {
        spec.label = label.to_string();
    }

    Some(spec)
}
