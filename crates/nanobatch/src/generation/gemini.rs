//! Secondary provider: Gemini image model via `:generateContent`.
//!
//! Accepts only the prompt; count, aspect ratio and seed are not
//! forwarded.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

use super::provider::{decode_image, post_json, ImageProvider, ProviderRequest};
use super::ImageBytes;

pub const GEMINI_IMAGE_MODEL: &str = "nano-banana-pro-preview";
const PROVIDER_NAME: &str = "nano-banana fallback";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: [&'static str; 1],
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(default)]
    data: Option<String>,
}

fn build_request(prompt: &str) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        contents: [Content {
            parts: [TextPart { text: prompt }],
        }],
        generation_config: GenerationConfig {
            response_modalities: ["IMAGE"],
        },
    }
}

/// Collects inline image payloads from the first candidate.
pub(crate) fn extract_images(
    response: GenerateContentResponse,
) -> Result<Vec<ImageBytes>, GenerationError> {
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    let images = parts
        .iter()
        .filter_map(|p| p.inline_data.as_ref())
        .filter_map(|d| d.data.as_deref())
        .filter(|data| !data.is_empty())
        .map(|data| decode_image(PROVIDER_NAME, data))
        .collect::<Result<Vec<_>, _>>()?;

    if images.is_empty() {
        return Err(GenerationError::Empty {
            provider: PROVIDER_NAME,
        });
    }
    Ok(images)
}

pub struct GeminiImageProvider {
    http: Client,
    api_key: SecretString,
    url: String,
}

impl GeminiImageProvider {
    pub fn new(http: Client, api_key: SecretString, base_url: &str) -> Self {
        Self {
            http,
            api_key,
            url: format!(
                "{}/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                GEMINI_IMAGE_MODEL
            ),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ImageProvider for GeminiImageProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<Vec<ImageBytes>, GenerationError> {
        let body = build_request(&request.prompt);
        let response: GenerateContentResponse =
            post_json(&self.http, &self.url, &self.api_key, &body, PROVIDER_NAME).await?;
        extract_images(response)
    }
}
