use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;

use crate::config::Settings;
use crate::error::GenerationError;
use crate::spec::Spec;

use super::gemini::GeminiImageProvider;
use super::imagen::ImagenProvider;
use super::provider::{ImageProvider, ProviderRequest, DEFAULT_BASE_URL};
use super::{build_prompt, GeneratorFactory, ImageBytes, ImageGenerator};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Primary provider with a single fallback to the secondary.
///
/// One [`ImageGenerator::generate`] call tries primary, then secondary on
/// any primary failure. The secondary's error is the one that surfaces.
pub struct GenerationClient {
    primary: Arc<dyn ImageProvider>,
    secondary: Arc<dyn ImageProvider>,
}

impl GenerationClient {
    pub fn new(primary: Arc<dyn ImageProvider>, secondary: Arc<dyn ImageProvider>) -> Self {
        Self { primary, secondary }
    }

    /// Builds the Imagen/Gemini pair for the given settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, GenerationError> {
        Self::with_base_url(settings, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(settings: &Settings, base_url: &str) -> Result<Self, GenerationError> {
        if !settings.has_api_key() {
            return Err(GenerationError::MissingApiKey);
        }

        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GenerationError::Client(e.to_string()))?;
        let api_key = SecretString::from(settings.api_key.clone());

        Ok(Self::new(
            Arc::new(ImagenProvider::new(http.clone(), api_key.clone(), base_url)),
            Arc::new(GeminiImageProvider::new(http, api_key, base_url)),
        ))
    }

    fn request_for(spec: &Spec) -> ProviderRequest {
        ProviderRequest {
            prompt: build_prompt(spec),
            count: spec.count,
            aspect_ratio: spec.aspect_ratio,
            negative_prompt: Some(spec.negative_prompt.clone()).filter(|s| !s.trim().is_empty()),
            seed: spec.seed,
        }
    }
}

#[async_trait]
impl ImageGenerator for GenerationClient {
    async fn generate(&self, spec: &Spec) -> Result<Vec<ImageBytes>, GenerationError> {
        let request = Self::request_for(spec);

        let primary_err = match self.primary.generate(&request).await {
            Ok(images) => return Ok(images),
            Err(e) => e,
        };

        tracing::warn!(
            spec_id = %spec.id,
            provider = self.primary.name(),
            error = %primary_err,
            "Primary provider failed, trying {}",
            self.secondary.name()
        );

        self.secondary.generate(&request).await.map_err(|secondary_err| {
            GenerationError::AllProvidersFailed {
                primary: Box::new(primary_err),
                secondary: Box::new(secondary_err),
            }
        })
    }
}

/// Builds a [`GenerationClient`] against the real provider API.
#[derive(Debug, Clone)]
pub struct ProviderFactory {
    base_url: String,
}

impl ProviderFactory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for ProviderFactory {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl GeneratorFactory for ProviderFactory {
    fn create(&self, settings: &Settings) -> Result<Arc<dyn ImageGenerator>, GenerationError> {
        Ok(Arc::new(GenerationClient::with_base_url(settings, &self.base_url)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubProvider {
        name: &'static str,
        succeed: bool,
        calls: AtomicUsize,
        last_request: Mutex<Option<ProviderRequest>>,
    }

    impl StubProvider {
        fn new(name: &'static str, succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                succeed,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn generate(&self, request: &ProviderRequest) -> Result<Vec<ImageBytes>, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            if self.succeed {
                Ok(vec![self.name.as_bytes().to_vec()])
            } else {
                Err(GenerationError::Status {
                    provider: self.name,
                    status: 500,
                    body: "boom".to_string(),
                })
            }
        }
    }

    fn spec() -> Spec {
        let mut spec = Spec::new(0, "a cat", &Settings::default());
        spec.count = 3;
        spec.negative_prompt = "   ".to_string();
        spec
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let primary = StubProvider::new("primary", true);
        let secondary = StubProvider::new("secondary", true);
        let client = GenerationClient::new(primary.clone(), secondary.clone());

        let images = client.generate(&spec()).await.unwrap();
        assert_eq!(images, vec![b"primary".to_vec()]);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);

        let request = primary.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.prompt, "a cat, photorealistic style, neutral mood");
        assert_eq!(request.count, 3);
        assert_eq!(request.negative_prompt, None);
    }

    #[tokio::test]
    async fn test_falls_back_to_secondary() {
        let primary = StubProvider::new("primary", false);
        let secondary = StubProvider::new("secondary", true);
        let client = GenerationClient::new(primary.clone(), secondary.clone());

        let images = client.generate(&spec()).await.unwrap();
        assert_eq!(images, vec![b"secondary".to_vec()]);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_both_fail_surfaces_secondary_error() {
        let client = GenerationClient::new(
            StubProvider::new("primary", false),
            StubProvider::new("secondary", false),
        );

        let err = client.generate(&spec()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("secondary error 500: boom"), "{}", message);
        assert!(message.contains("primary error 500"));
    }

    #[test]
    fn test_factory_requires_api_key() {
        let factory = ProviderFactory::default();
        assert!(matches!(
            factory.create(&Settings::default()),
            Err(GenerationError::MissingApiKey)
        ));

        let settings = Settings {
            api_key: "test-key".to_string(),
            ..Settings::default()
        };
        assert!(factory.create(&settings).is_ok());
    }

    #[test]
    fn test_from_settings_requires_api_key() {
        let result = GenerationClient::from_settings(&Settings::default());
        assert!(matches!(result, Err(GenerationError::MissingApiKey)));
    }
}
