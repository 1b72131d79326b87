//! Process-lifetime registry of submitted jobs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::worker::{BatchJob, JobView};

/// Jobs by id. Entries live until the process exits.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<String, Arc<BatchJob>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Arc<BatchJob>) {
        let mut jobs = self.jobs.write().unwrap_or_else(|poisoned| {
            log::warn!("JobStore lock poisoned during insert, recovering");
            poisoned.into_inner()
        });
        log::debug!("Registered job {} ({} specs)", job.id(), job.specs().len());
        jobs.insert(job.id().to_string(), job);
    }

    pub fn get(&self, job_id: &str) -> Option<Arc<BatchJob>> {
        let jobs = self.jobs.read().unwrap_or_else(|poisoned| {
            log::warn!("JobStore lock poisoned during get, recovering");
            poisoned.into_inner()
        });
        jobs.get(job_id).cloned()
    }

    pub fn snapshot(&self, job_id: &str) -> Option<JobView> {
        self.get(job_id).map(|job| job.view())
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|jobs| jobs.len()).unwrap_or_else(|poisoned| {
            log::warn!("JobStore lock poisoned during len, recovering");
            poisoned.into_inner().len()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
