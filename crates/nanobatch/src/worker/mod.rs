pub mod batch;
pub mod job;
pub mod scheduler;

pub use batch::{BatchJob, JobStatus, JobView};
pub use job::{SpecResult, SpecStatus, INTERRUPTED_ERROR};
pub use scheduler::Scheduler;
