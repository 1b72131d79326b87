//! Builders for specs and raw rows.

#![allow(dead_code)]

use nanobatch::config::{AspectRatio, Settings};
use nanobatch::{RawRow, Spec};

/// Builder for a single [`Spec`], starting from default settings.
pub struct SpecBuilder {
    spec: Spec,
}

impl SpecBuilder {
    pub fn new(row_index: usize, prompt: &str) -> Self {
        Self {
            spec: Spec::new(row_index, prompt, &Settings::default()),
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.spec.label = label.to_string();
        self
    }

    pub fn count(mut self, count: u8) -> Self {
        self.spec.count = count;
        self
    }

    pub fn style(mut self, style: &str) -> Self {
        self.spec.style = style.to_string();
        self
    }

    pub fn mood(mut self, mood: &str) -> Self {
        self.spec.mood = mood.to_string();
        self
    }

    pub fn aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.spec.aspect_ratio = ratio;
        self
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.spec.seed = Some(seed);
        self
    }

    pub fn build(self) -> Spec {
        self.spec
    }
}

/// `n` specs with row indices `0..n` and distinct prompts.
pub fn specs(n: usize) -> Vec<Spec> {
    (0..n)
        .map(|i| SpecBuilder::new(i, &format!("prompt {}", i)).build())
        .collect()
}

/// A submitted row from `(column, value)` pairs.
pub fn row(pairs: &[(&str, &str)]) -> RawRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect()
}
