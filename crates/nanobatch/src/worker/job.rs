use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::spec::Spec;

/// Error recorded on results forced to a terminal state by an aborted batch.
pub const INTERRUPTED_ERROR: &str = "batch interrupted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl SpecStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SpecStatus::Done | SpecStatus::Failed)
    }
}

/// Outcome record for one spec within a batch.
///
/// Transitions only move forward: `pending -> running -> done | failed`.
/// Every `mark_*` method returns `false` and leaves the record untouched
/// when the transition is not allowed from the current status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecResult {
    pub spec: Spec,
    pub status: SpecStatus,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Completed processing passes.
    pub attempts: u32,
    /// Primary/secondary cycles the retry loop ran during the last pass.
    pub cycles: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SpecResult {
    pub fn pending(spec: Spec) -> Self {
        Self {
            spec,
            status: SpecStatus::Pending,
            images: Vec::new(),
            error: None,
            attempts: 0,
            cycles: 0,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn mark_running(&mut self) -> bool {
        if self.status != SpecStatus::Pending {
            return false;
        }
        self.status = SpecStatus::Running;
        self.started_at = Some(Utc::now());
        true
    }

    /// `images` must be non-empty; an empty set is recorded as a failure.
    pub fn mark_done(&mut self, images: Vec<String>, cycles: u32) -> bool {
        if images.is_empty() {
            return self.mark_failed("No images were saved".to_string(), cycles);
        }
        if self.status != SpecStatus::Running {
            return false;
        }
        self.status = SpecStatus::Done;
        self.images = images;
        self.error = None;
        self.finish_pass(cycles);
        true
    }

    pub fn mark_failed(&mut self, error: String, cycles: u32) -> bool {
        if self.status != SpecStatus::Running {
            return false;
        }
        self.status = SpecStatus::Failed;
        self.images.clear();
        self.error = Some(non_empty_error(error));
        self.finish_pass(cycles);
        true
    }

    /// Forces a pending or running result to `failed` after a batch abort.
    /// No processing pass completed, so `attempts` is left as is.
    pub fn mark_interrupted(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = SpecStatus::Failed;
        self.images.clear();
        self.error = Some(INTERRUPTED_ERROR.to_string());
        self.completed_at = Some(Utc::now());
        true
    }

    fn finish_pass(&mut self, cycles: u32) {
        self.attempts += 1;
        self.cycles = cycles;
        self.completed_at = Some(Utc::now());
    }
}

fn non_empty_error(error: String) -> String {
    if error.trim().is_empty() {
        "Unknown error".to_string()
    } else {
        error
    }
}
