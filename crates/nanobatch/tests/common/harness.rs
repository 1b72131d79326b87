//! Test harness and scripted stand-ins for the generation providers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

use nanobatch::config::Settings;
use nanobatch::error::GenerationError;
use nanobatch::generation::{ImageBytes, ImageProvider, ProviderRequest};
use nanobatch::{BatchEngine, ImageGenerator, JobView, ProgressEvent, RetryPolicy, Spec};

/// Retry policy with millisecond backoff so tests stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
    }
}

/// Isolated output folder plus settings pointing at it.
pub struct TestHarness {
    temp_dir: TempDir,
    pub output_dir: PathBuf,
    pub settings: Settings,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let output_dir = temp_dir.path().join("output");
        let settings = Settings {
            api_key: "test-key".to_string(),
            concurrency: 2,
            output_folder: output_dir.clone(),
            ..Settings::default()
        };

        Self {
            temp_dir,
            output_dir,
            settings,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.settings.concurrency = concurrency;
        self
    }

    pub fn root(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    /// Engine whose every job uses `generator`.
    pub fn engine(&self, generator: Arc<dyn ImageGenerator>) -> BatchEngine {
        let factory = move |_settings: &Settings| -> Result<Arc<dyn ImageGenerator>, GenerationError> {
            Ok(Arc::clone(&generator))
        };
        BatchEngine::new(Arc::new(factory)).with_retry_policy(fast_retry())
    }

    /// Submits `specs`, waits for the job to finish and returns its view.
    pub async fn run(&self, engine: &BatchEngine, specs: Vec<Spec>) -> JobView {
        let response = engine
            .submit(specs, self.settings.clone())
            .expect("submit failed");
        assert!(engine.wait(&response.job_id).await);
        engine.get_job(&response.job_id).expect("job missing")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Drains every event already queued on `rx`.
pub fn drain(rx: &mut UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// How a scripted generator answers for one row.
#[derive(Debug, Clone)]
pub enum Script {
    /// Returns this many images.
    Succeed(usize),
    /// Fails the first `n` calls, then returns one image.
    FailTimes(u32),
    FailAlways,
    Panic,
}

/// Generator answering per row index, recording calls and peak parallelism.
pub struct ScriptedGenerator {
    scripts: HashMap<usize, Script>,
    default: Script,
    delay: Duration,
    calls: Mutex<HashMap<usize, u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            default: Script::Succeed(1),
            delay: Duration::ZERO,
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn script(mut self, row_index: usize, script: Script) -> Self {
        self.scripts.insert(row_index, script);
        self
    }

    pub fn default_script(mut self, script: Script) -> Self {
        self.default = script;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self, row_index: usize) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(&row_index)
            .copied()
            .unwrap_or(0)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn image(spec: &Spec, n: usize) -> ImageBytes {
        format!("png:{}:{}", spec.row_index, n).into_bytes()
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    async fn generate(&self, spec: &Spec) -> Result<Vec<ImageBytes>, GenerationError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let entry = calls.entry(spec.row_index).or_insert(0);
            *entry += 1;
            *entry
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let script = self.scripts.get(&spec.row_index).unwrap_or(&self.default);
        match script {
            Script::Succeed(n) => Ok((1..=*n).map(|i| Self::image(spec, i)).collect()),
            Script::FailTimes(failures) if call <= *failures => Err(GenerationError::Status {
                provider: "scripted",
                status: 503,
                body: format!("transient failure {}", call),
            }),
            Script::FailTimes(_) => Ok(vec![Self::image(spec, 1)]),
            Script::FailAlways => Err(GenerationError::Status {
                provider: "scripted",
                status: 500,
                body: "permanent failure".to_string(),
            }),
            Script::Panic => panic!("scripted generator panic"),
        }
    }
}

/// Provider returning a fixed payload or a fixed error.
pub struct FixedProvider {
    name: &'static str,
    payload: Option<Vec<u8>>,
    calls: AtomicUsize,
}

impl FixedProvider {
    pub fn succeeding(name: &'static str, payload: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            name,
            payload: Some(payload.to_vec()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            payload: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageProvider for FixedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn generate(&self, _request: &ProviderRequest) -> Result<Vec<ImageBytes>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.payload {
            Some(payload) => Ok(vec![payload.clone()]),
            None => Err(GenerationError::Status {
                provider: self.name,
                status: 429,
                body: "quota exceeded".to_string(),
            }),
        }
    }
}
