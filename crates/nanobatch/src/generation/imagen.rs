//! Primary provider: Imagen 4 `:predict` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

use super::provider::{decode_image, post_json, ImageProvider, ProviderRequest};
use super::ImageBytes;

pub const IMAGEN_MODEL: &str = "imagen-4.0-generate-001";
const PROVIDER_NAME: &str = "Imagen 4";

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: [PredictInstance<'a>; 1],
    parameters: PredictParameters<'a>,
}

#[derive(Debug, Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters<'a> {
    sample_count: u8,
    aspect_ratio: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
}

fn build_request(request: &ProviderRequest) -> PredictRequest<'_> {
    PredictRequest {
        instances: [PredictInstance {
            prompt: &request.prompt,
        }],
        parameters: PredictParameters {
            sample_count: request.count,
            aspect_ratio: request.aspect_ratio.as_str(),
            negative_prompt: request
                .negative_prompt
                .as_deref()
                .filter(|s| !s.is_empty()),
            seed: request.seed,
        },
    }
}

/// Predictions without image bytes (e.g. filtered by the provider) are
/// skipped; a response with none left counts as a failure.
pub(crate) fn extract_images(response: PredictResponse) -> Result<Vec<ImageBytes>, GenerationError> {
    let images = response
        .predictions
        .iter()
        .filter_map(|p| p.bytes_base64_encoded.as_deref())
        .map(|data| decode_image(PROVIDER_NAME, data))
        .collect::<Result<Vec<_>, _>>()?;

    if images.is_empty() {
        return Err(GenerationError::Empty {
            provider: PROVIDER_NAME,
        });
    }
    Ok(images)
}

pub struct ImagenProvider {
    http: Client,
    api_key: SecretString,
    url: String,
}

impl ImagenProvider {
    pub fn new(http: Client, api_key: SecretString, base_url: &str) -> Self {
        Self {
            http,
            api_key,
            url: format!(
                "{}/models/{}:predict",
                base_url.trim_end_matches('/'),
                IMAGEN_MODEL
            ),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ImageProvider for ImagenProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<Vec<ImageBytes>, GenerationError> {
        let body = build_request(request);
        let response: PredictResponse =
            post_json(&self.http, &self.url, &self.api_key, &body, PROVIDER_NAME).await?;
        extract_images(response)
    }
}
