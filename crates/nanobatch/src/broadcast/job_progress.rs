//! Progress events and the listener registry that fans them out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::worker::{JobStatus, JobView, SpecResult};

use super::job_store::JobStore;

/// Event pushed to subscribers while a batch runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    #[serde(rename_all = "camelCase")]
    JobUpdate { job_id: String, result: SpecResult },
    #[serde(rename_all = "camelCase")]
    BatchDone {
        job_id: String,
        status: JobStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ProgressEvent {
    pub fn job_id(&self) -> &str {
        match self {
            ProgressEvent::JobUpdate { job_id, .. } | ProgressEvent::BatchDone { job_id, .. } => {
                job_id
            }
        }
    }
}

/// The listener can no longer receive events.
#[derive(Debug, Clone, Copy, Error)]
#[error("progress listener closed")]
pub struct ListenerClosed;

pub trait ProgressListener: Send + Sync {
    /// Must not block.
    fn notify(&self, event: &ProgressEvent) -> Result<(), ListenerClosed>;
}

/// Forwards events into an unbounded tokio channel.
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelListener {
    pub fn new(sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressListener for ChannelListener {
    fn notify(&self, event: &ProgressEvent) -> Result<(), ListenerClosed> {
        self.sender.send(event.clone()).map_err(|_| ListenerClosed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Best-effort fan-out of [`ProgressEvent`]s, plus snapshot reads of jobs.
///
/// Publishing never fails: a listener whose `notify` errors is dropped.
pub struct ProgressBroadcaster {
    listeners: RwLock<HashMap<ListenerId, Arc<dyn ProgressListener>>>,
    next_id: AtomicU64,
    jobs: Arc<JobStore>,
}

impl ProgressBroadcaster {
    pub fn new(jobs: Arc<JobStore>) -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            jobs,
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn ProgressListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.write().unwrap_or_else(|poisoned| {
            log::warn!("Listener registry lock poisoned during subscribe, recovering");
            poisoned.into_inner()
        });
        listeners.insert(id, listener);
        log::debug!("Progress listener {:?} subscribed ({} total)", id, listeners.len());
        id
    }

    /// Registers a channel-backed listener and returns its receiving end.
    pub fn subscribe_channel(&self) -> (ListenerId, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.subscribe(Arc::new(ChannelListener::new(tx)));
        (id, rx)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|poisoned| {
            log::warn!("Listener registry lock poisoned during unsubscribe, recovering");
            poisoned.into_inner()
        });
        listeners.remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        match self.listeners.read() {
            Ok(listeners) => listeners.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn publish(&self, event: &ProgressEvent) {
        let targets: Vec<(ListenerId, Arc<dyn ProgressListener>)> = {
            let listeners = self.listeners.read().unwrap_or_else(|poisoned| {
                log::warn!("Listener registry lock poisoned during publish, recovering");
                poisoned.into_inner()
            });
            listeners
                .iter()
                .map(|(id, listener)| (*id, Arc::clone(listener)))
                .collect()
        };

        let closed: Vec<ListenerId> = targets
            .into_iter()
            .filter(|(_, listener)| listener.notify(event).is_err())
            .map(|(id, _)| id)
            .collect();

        if !closed.is_empty() {
            for id in &closed {
                self.unsubscribe(*id);
            }
            log::debug!("Dropped {} closed progress listener(s)", closed.len());
        }
    }

    pub fn snapshot(&self, job_id: &str) -> Option<JobView> {
        self.jobs.snapshot(job_id)
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        &self.jobs
    }
}
