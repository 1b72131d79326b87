use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::Instrument;

use crate::broadcast::{ProgressBroadcaster, ProgressEvent};
use crate::generation::{generate_with_retry, ImageGenerator, RetryPolicy};
use crate::spec::Spec;
use crate::storage::ArtifactStore;

use super::batch::{BatchJob, JobStatus};
use super::job::SpecResult;

/// Drives every spec of a batch to a terminal result.
///
/// Specs are split across `max(1, min(concurrency, specs))` workers by
/// index modulo worker count. Each worker walks its own share in index
/// order; there is no work stealing, so an expensive tail is not
/// rebalanced.
#[derive(Clone)]
pub struct Scheduler {
    generator: Arc<dyn ImageGenerator>,
    store: ArtifactStore,
    broadcaster: Arc<ProgressBroadcaster>,
    retry: RetryPolicy,
}

impl Scheduler {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        store: ArtifactStore,
        broadcaster: Arc<ProgressBroadcaster>,
    ) -> Self {
        Self {
            generator,
            store,
            broadcaster,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn worker_count(concurrency: usize, spec_count: usize) -> usize {
        concurrency.min(spec_count).max(1)
    }

    /// Spec indices owned by `worker_id`, in processing order.
    pub fn partition(
        worker_id: usize,
        worker_count: usize,
        spec_count: usize,
    ) -> impl Iterator<Item = usize> {
        (worker_id..spec_count).step_by(worker_count.max(1))
    }

    pub async fn run(&self, job: Arc<BatchJob>, concurrency: usize) {
        let spec_count = job.specs().len();
        let worker_count = Self::worker_count(concurrency, spec_count);
        log::info!(
            "Starting job {} with {} specs on {} workers",
            job.id(),
            spec_count,
            worker_count
        );

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let scheduler = self.clone();
            let job = Arc::clone(&job);
            workers.spawn(async move {
                scheduler.run_worker(worker_id, worker_count, &job).await;
            });
        }

        let mut fault: Option<String> = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                log::error!("Worker for job {} failed: {}", job.id(), e);
                fault.get_or_insert_with(|| format!("worker failed: {}", e));
            }
        }

        match fault {
            None => self.complete(&job),
            Some(message) => self.abort(&job, message),
        }
    }

    /// Resolves the job after every worker returned normally.
    pub fn complete(&self, job: &BatchJob) {
        if let Some(status) = job.finish(None) {
            log::info!("Job {} finished: {:?}", job.id(), status);
            self.broadcaster.publish(&ProgressEvent::BatchDone {
                job_id: job.id().to_string(),
                status,
                error: None,
            });
        }
    }

    /// Forces unresolved results to failed and ends the job as partial.
    pub fn abort(&self, job: &BatchJob, message: String) {
        if job.is_finished() {
            return;
        }

        for result in job.interrupt_unresolved() {
            self.publish_update(job, result);
        }

        if job.finish(Some(message.clone())).is_some() {
            log::warn!("Job {} aborted: {}", job.id(), message);
            self.broadcaster.publish(&ProgressEvent::BatchDone {
                job_id: job.id().to_string(),
                status: JobStatus::Partial,
                error: Some(message),
            });
        }
    }

    async fn run_worker(&self, worker_id: usize, worker_count: usize, job: &BatchJob) {
        log::debug!("Worker {} started for job {}", worker_id, job.id());

        for index in Self::partition(worker_id, worker_count, job.specs().len()) {
            let spec = &job.specs()[index];
            let span = tracing::info_span!(
                "spec",
                job_id = %job.id(),
                spec_id = %spec.id,
                row = spec.row_index,
                worker_id
            );
            self.process_spec(job, spec).instrument(span).await;
        }

        log::debug!("Worker {} finished for job {}", worker_id, job.id());
    }

    async fn process_spec(&self, job: &BatchJob, spec: &Spec) {
        match job.update_result(&spec.id, |r| r.mark_running()) {
            Some(result) => self.publish_update(job, result),
            None => {
                tracing::warn!("Result not pending, skipping");
                return;
            }
        }

        let updated = match generate_with_retry(self.generator.as_ref(), spec, &self.retry).await {
            Ok(generated) => {
                let cycles = generated.cycles;
                match self.save(job, spec, generated.images).await {
                    Ok(images) => {
                        tracing::info!(images = images.len(), cycles, "Spec done");
                        job.update_result(&spec.id, |r| r.mark_done(images, cycles))
                    }
                    Err(message) => {
                        tracing::warn!(error = %message, "Saving artifacts failed");
                        job.update_result(&spec.id, |r| r.mark_failed(message, cycles))
                    }
                }
            }
            Err(exhausted) => {
                tracing::warn!(
                    error = %exhausted.last_error,
                    cycles = exhausted.cycles,
                    "Generation failed"
                );
                let message = exhausted.last_error.to_string();
                job.update_result(&spec.id, |r| r.mark_failed(message, exhausted.cycles))
            }
        };

        if let Some(result) = updated {
            self.publish_update(job, result);
        }
    }

    async fn save(&self, job: &BatchJob, spec: &Spec, images: Vec<Vec<u8>>) -> Result<Vec<String>, String> {
        let store = self.store.clone();
        let job_id = job.id().to_string();
        let spec = spec.clone();

        match tokio::task::spawn_blocking(move || store.save(&job_id, &spec, &images)).await {
            Ok(Ok(references)) => Ok(references),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(format!("artifact save task failed: {}", e)),
        }
    }

    fn publish_update(&self, job: &BatchJob, result: SpecResult) {
        self.broadcaster.publish(&ProgressEvent::JobUpdate {
            job_id: job.id().to_string(),
            result,
        });
    }
}
