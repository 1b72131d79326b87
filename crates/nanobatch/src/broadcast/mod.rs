//! Progress fan-out and the job read model.

pub mod job_progress;
pub mod job_store;

pub use job_progress::{
    ChannelListener, ListenerClosed, ListenerId, ProgressBroadcaster, ProgressEvent,
    ProgressListener,
};
pub use job_store::JobStore;
