use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::spec::Spec;

use super::job::{SpecResult, SpecStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Done,
    Partial,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

/// Read model returned to callers polling a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: String,
    pub status: JobStatus,
    pub spec_count: usize,
    pub created_at: DateTime<Utc>,
    pub results: BTreeMap<String, SpecResult>,
}

#[derive(Debug, Default)]
struct RunState {
    finished: bool,
    fault: Option<String>,
}

/// One submission: a fixed list of specs and one result per spec.
///
/// The status is derived from the results plus the completion step, never
/// stored directly. Result updates happen under a write lock, so a reader
/// sees each result either before or after a transition, never halfway.
#[derive(Debug)]
pub struct BatchJob {
    id: String,
    created_at: DateTime<Utc>,
    specs: Vec<Spec>,
    output_base: PathBuf,
    output_dir: PathBuf,
    results: RwLock<BTreeMap<String, SpecResult>>,
    state: Mutex<RunState>,
}

impl BatchJob {
    pub fn new(specs: Vec<Spec>, output_base: &Path) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), specs, output_base)
    }

    pub fn with_id(id: String, specs: Vec<Spec>, output_base: &Path) -> Self {
        let results = specs
            .iter()
            .map(|spec| (spec.id.clone(), SpecResult::pending(spec.clone())))
            .collect();

        Self {
            output_base: output_base.to_path_buf(),
            output_dir: output_base.join(&id),
            id,
            created_at: Utc::now(),
            specs,
            results: RwLock::new(results),
            state: Mutex::new(RunState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn specs(&self) -> &[Spec] {
        &self.specs
    }

    /// Output folder from the settings snapshot taken at submission.
    pub fn output_base(&self) -> &Path {
        &self.output_base
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn result(&self, spec_id: &str) -> Option<SpecResult> {
        self.read_results().get(spec_id).cloned()
    }

    /// Applies `transition` to one result. Returns the updated result when the
    /// transition reported a change.
    pub fn update_result<F>(&self, spec_id: &str, transition: F) -> Option<SpecResult>
    where
        F: FnOnce(&mut SpecResult) -> bool,
    {
        let mut results = self.write_results();
        let result = results.get_mut(spec_id)?;
        if transition(result) {
            Some(result.clone())
        } else {
            None
        }
    }

    /// Forces every unresolved result to `failed`, returning the ones changed.
    pub fn interrupt_unresolved(&self) -> Vec<SpecResult> {
        let mut results = self.write_results();
        self.specs
            .iter()
            .filter_map(|spec| {
                let result = results.get_mut(&spec.id)?;
                result.mark_interrupted().then(|| result.clone())
            })
            .collect()
    }

    /// Marks the run complete. Returns the terminal status, or `None` if the
    /// job was already finished.
    pub fn finish(&self, fault: Option<String>) -> Option<JobStatus> {
        {
            let mut state = self.lock_state();
            if state.finished {
                return None;
            }
            state.finished = true;
            state.fault = fault;
        }
        Some(self.status())
    }

    pub fn is_finished(&self) -> bool {
        self.lock_state().finished
    }

    pub fn fault(&self) -> Option<String> {
        self.lock_state().fault.clone()
    }

    pub fn status(&self) -> JobStatus {
        let (finished, faulted) = {
            let state = self.lock_state();
            (state.finished, state.fault.is_some())
        };
        if !finished {
            return JobStatus::Running;
        }
        if faulted {
            return JobStatus::Partial;
        }

        let all_done = self
            .read_results()
            .values()
            .all(|r| r.status == SpecStatus::Done);
        if all_done {
            JobStatus::Done
        } else {
            JobStatus::Partial
        }
    }

    pub fn view(&self) -> JobView {
        let results = self.read_results().clone();
        JobView {
            id: self.id.clone(),
            status: self.status(),
            spec_count: self.specs.len(),
            created_at: self.created_at,
            results,
        }
    }

    fn read_results(&self) -> RwLockReadGuard<'_, BTreeMap<String, SpecResult>> {
        self.results.read().unwrap_or_else(|poisoned| {
            log::warn!("Results lock poisoned for job {}, recovering", self.id);
            poisoned.into_inner()
        })
    }

    fn write_results(&self) -> RwLockWriteGuard<'_, BTreeMap<String, SpecResult>> {
        self.results.write().unwrap_or_else(|poisoned| {
            log::warn!("Results lock poisoned for job {}, recovering", self.id);
            poisoned.into_inner()
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            log::warn!("Run state lock poisoned for job {}, recovering", self.id);
            poisoned.into_inner()
        })
    }
}
