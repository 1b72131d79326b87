//! Entry points used by the outer surfaces: submit, read, retrieve, download.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::broadcast::{JobStore, ProgressBroadcaster};
use crate::config::Settings;
use crate::error::{JobError, Result};
use crate::generation::{GeneratorFactory, ProviderFactory, RetryPolicy};
use crate::spec::{normalize_rows, RawRow, Spec};
use crate::storage::filesystem::is_plain_name;
use crate::storage::{self, ArtifactStore};
use crate::worker::{BatchJob, JobView, Scheduler};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: String,
    pub spec_count: usize,
}

/// A packed job archive ready to hand out.
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Download {
    pub fn filename_for(job_id: &str) -> String {
        format!("nano-batch-{}.zip", job_id)
    }
}

/// Owns the job registry and broadcaster and starts a scheduler per job.
pub struct BatchEngine {
    jobs: Arc<JobStore>,
    broadcaster: Arc<ProgressBroadcaster>,
    generators: Arc<dyn GeneratorFactory>,
    retry: RetryPolicy,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl BatchEngine {
    pub fn new(generators: Arc<dyn GeneratorFactory>) -> Self {
        let jobs = Arc::new(JobStore::new());
        Self {
            broadcaster: Arc::new(ProgressBroadcaster::new(Arc::clone(&jobs))),
            jobs,
            generators,
            retry: RetryPolicy::default(),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn broadcaster(&self) -> &Arc<ProgressBroadcaster> {
        &self.broadcaster
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        &self.jobs
    }

    /// Normalizes submitted rows and starts a job for them.
    pub fn submit_rows(&self, rows: &[RawRow], settings: Settings) -> Result<SubmitResponse> {
        let specs = normalize_rows(rows, &settings)?;
        self.submit(specs, settings)
    }

    /// Registers a job and starts processing it in the background.
    ///
    /// `settings` is the snapshot the job runs with. Must be called from
    /// within a Tokio runtime.
    pub fn submit(&self, specs: Vec<Spec>, settings: Settings) -> Result<SubmitResponse> {
        let generator = self.generators.create(&settings)?;

        let job = Arc::new(BatchJob::new(specs, &settings.output_folder));
        self.jobs.insert(Arc::clone(&job));

        let scheduler = Scheduler::new(
            generator,
            ArtifactStore::new(&settings.output_folder),
            Arc::clone(&self.broadcaster),
        )
        .with_retry_policy(self.retry);

        let response = SubmitResponse {
            job_id: job.id().to_string(),
            spec_count: job.specs().len(),
        };

        let concurrency = settings.concurrency;
        let run = {
            let scheduler = scheduler.clone();
            let job = Arc::clone(&job);
            tokio::spawn(async move { scheduler.run(job, concurrency).await })
        };

        // A fault escaping the scheduler itself still has to end the job.
        let handle = tokio::spawn(async move {
            if let Err(e) = run.await {
                log::error!("Scheduler for job {} failed: {}", job.id(), e);
                scheduler.abort(&job, format!("scheduler failed: {}", e));
            }
        });

        let mut tasks = self.lock_tasks();
        tasks.retain(|_, handle| !handle.is_finished());
        tasks.insert(response.job_id.clone(), handle);
        drop(tasks);
        log::info!(
            "Submitted job {} with {} specs",
            response.job_id,
            response.spec_count
        );
        Ok(response)
    }

    pub fn get_job(&self, job_id: &str) -> std::result::Result<JobView, JobError> {
        self.jobs
            .snapshot(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// Waits for a job's background task to end. Returns `false` if no task
    /// is tracked for the id: unknown, already awaited, or finished and
    /// pruned by a later submission.
    pub async fn wait(&self, job_id: &str) -> bool {
        let handle = self.lock_tasks().remove(job_id);
        match handle {
            Some(handle) => {
                if let Err(e) = handle.await {
                    log::error!("Job {} supervisor failed: {}", job_id, e);
                }
                true
            }
            None => false,
        }
    }

    /// Raw bytes of one saved artifact.
    ///
    /// Known jobs read from their own output folder; unknown ids fall back
    /// to the folder in `current`, so artifacts from earlier runs stay
    /// reachable.
    pub fn artifact(
        &self,
        job_id: &str,
        filename: &str,
        current: &Settings,
    ) -> std::result::Result<Vec<u8>, JobError> {
        self.artifact_store(job_id, current).read(job_id, filename)
    }

    /// Every artifact of a job packed into one zip.
    pub fn download(&self, job_id: &str, current: &Settings) -> Result<Download> {
        if !is_plain_name(job_id) {
            return Err(JobError::InvalidArtifactName(job_id.to_string()).into());
        }
        let paths = self.artifact_store(job_id, current).list(job_id)?;
        let bytes = storage::pack(&paths)?;
        log::debug!("Packed {} artifacts for job {}", paths.len(), job_id);
        Ok(Download {
            filename: Download::filename_for(job_id),
            bytes,
        })
    }

    /// Number of background tasks still tracked.
    pub fn tracked_tasks(&self) -> usize {
        self.lock_tasks().len()
    }

    fn artifact_store(&self, job_id: &str, current: &Settings) -> ArtifactStore {
        match self.jobs.get(job_id) {
            Some(job) => ArtifactStore::new(job.output_base()),
            None => ArtifactStore::new(&current.output_folder),
        }
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|poisoned| {
            log::warn!("Task registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl Default for BatchEngine {
    fn default() -> Self {
        Self::new(Arc::new(ProviderFactory::default()))
    }
}
