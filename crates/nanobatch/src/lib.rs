pub mod broadcast;
pub mod config;
pub mod error;
pub mod generation;
pub mod sanitize;
pub mod service;
pub mod spec;
pub mod storage;
pub mod worker;

pub use broadcast::{ProgressBroadcaster, ProgressEvent, ProgressListener};
pub use config::{Settings, SettingsStore, SettingsUpdate, SettingsView};
pub use error::{NanobatchError, Result};
pub use generation::{GenerationClient, GeneratorFactory, ImageGenerator, RetryPolicy};
pub use service::{BatchEngine, Download, SubmitResponse};
pub use spec::{normalize_rows, RawRow, Spec};
pub use storage::ArtifactStore;
pub use worker::{BatchJob, JobStatus, JobView, SpecResult, SpecStatus};
