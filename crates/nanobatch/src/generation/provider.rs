use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::AspectRatio;
use crate::error::GenerationError;
use crate::sanitize;

use super::ImageBytes;

/// Google Generative Language API root shared by both providers.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The key travels in a header so it never shows up in URLs or error text.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Parameters for one provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub prompt: String,
    pub count: u8,
    pub aspect_ratio: AspectRatio,
    pub negative_prompt: Option<String>,
    pub seed: Option<i64>,
}

/// A remote endpoint that turns a prompt into images.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, request: &ProviderRequest) -> Result<Vec<ImageBytes>, GenerationError>;
}

/// POSTs `body` as JSON and decodes a JSON response.
///
/// Non-2xx responses become [`GenerationError::Status`] with a truncated body.
pub(crate) async fn post_json<B, T>(
    http: &Client,
    url: &str,
    api_key: &SecretString,
    body: &B,
    provider: &'static str,
) -> Result<T, GenerationError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let response = http
        .post(url)
        .header(API_KEY_HEADER, api_key.expose_secret())
        .json(body)
        .send()
        .await
        .map_err(|e| GenerationError::Transport {
            provider,
            message: e.without_url().to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GenerationError::Status {
            provider,
            status: status.as_u16(),
            body: sanitize::truncate_body(&body),
        });
    }

    let bytes = response.bytes().await.map_err(|e| GenerationError::Transport {
        provider,
        message: e.without_url().to_string(),
    })?;

    serde_json::from_slice(&bytes).map_err(|e| GenerationError::Decode {
        provider,
        message: e.to_string(),
    })
}

pub(crate) fn decode_image(provider: &'static str, data: &str) -> Result<ImageBytes, GenerationError> {
    STANDARD
        .decode(data.trim())
        .map_err(|e| GenerationError::Decode {
            provider,
            message: format!("invalid base64 image payload: {}", e),
        })
}
