//! Image generation against the remote providers.
//!
//! [`GenerationClient`] tries the primary provider and falls back to the
//! secondary one; [`generate_with_retry`] wraps that pair in a bounded
//! retry loop with exponential backoff.

pub mod client;
pub mod gemini;
pub mod imagen;
pub mod provider;
pub mod retry;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Settings;
use crate::error::GenerationError;
use crate::spec::Spec;

pub use client::{GenerationClient, ProviderFactory};
pub use gemini::GeminiImageProvider;
pub use imagen::ImagenProvider;
pub use provider::{ImageProvider, ProviderRequest, DEFAULT_BASE_URL};
pub use retry::{generate_with_retry, Generated, RetryExhausted, RetryPolicy};

/// Raw bytes of one generated image.
pub type ImageBytes = Vec<u8>;

/// Produces images for a spec. One call is one full generation attempt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, spec: &Spec) -> Result<Vec<ImageBytes>, GenerationError>;
}

/// Creates the generator a job uses, from the job's settings snapshot.
pub trait GeneratorFactory: Send + Sync {
    fn create(&self, settings: &Settings) -> Result<Arc<dyn ImageGenerator>, GenerationError>;
}

impl<F> GeneratorFactory for F
where
    F: Fn(&Settings) -> Result<Arc<dyn ImageGenerator>, GenerationError> + Send + Sync,
{
    fn create(&self, settings: &Settings) -> Result<Arc<dyn ImageGenerator>, GenerationError> {
        self(settings)
    }
}

/// Builds the text prompt sent to the providers.
pub fn build_prompt(spec: &Spec) -> String {
    format!("{}, {} style, {} mood", spec.prompt, spec.style, spec.mood)
}
