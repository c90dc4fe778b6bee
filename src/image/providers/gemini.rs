//! Gemini Flash (Google) image generation provider.

use crate::config::BackendSelection;
use crate::error::{sanitize_error_message, ImageGenError, Result};
use crate::image::provider::ImageProvider;
use crate::image::types::{GeneratedImage, GenerationMetadata, ImageFormat};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used for image generation.
pub const GEMINI_FLASH_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Builder for GeminiProvider.
#[derive(Debug, Clone, Default)]
pub struct GeminiProviderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Overrides the API host.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the provider.
    ///
    /// A missing key does not fail here; requests fail with
    /// [`ImageGenError::Auth`] instead.
    pub fn build(self) -> Result<GeminiProvider> {
        let api_key = self.api_key.filter(|k| !k.is_empty());

        Ok(GeminiProvider {
            client: reqwest::Client::new(),
            api_key,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

/// Gemini image generation provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ImageGenError::Auth("GOOGLE_API_KEY is not set".into()))
    }

    async fn generate_impl(&self, prompt: &str) -> Result<GeneratedImage> {
        let api_key = self.api_key()?;
        let start = Instant::now();

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            GEMINI_FLASH_IMAGE_MODEL,
        );

        let body = GeminiRequest::new(prompt);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ImageGenError::Api {
                status: status.as_u16(),
                message: sanitize_error_message(&text),
            });
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let data = extract_image(gemini_response)?;

        Ok(GeneratedImage::new(
            data,
            // Saved as .jpg whatever mime type Gemini reports
            ImageFormat::Jpeg,
            BackendSelection::GeminiFlash,
            GenerationMetadata {
                model: Some(GEMINI_FLASH_IMAGE_MODEL.to_string()),
                duration_ms: Some(start.elapsed().as_millis() as u64),
            },
        ))
    }
}

/// Pulls the first inline image out of a response, logging every text part.
fn extract_image(response: GeminiResponse) -> Result<Vec<u8>> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(ImageGenError::UnexpectedResponse(format!(
            "prompt blocked by Gemini: {reason}"
        )));
    }

    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        ImageGenError::UnexpectedResponse("No candidates in Gemini response".into())
    })?;

    let content = candidate.content.ok_or_else(|| {
        let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
        ImageGenError::UnexpectedResponse(format!(
            "No content in Gemini candidate (finish reason: {reason})"
        ))
    })?;

    let mut image = None;
    for part in content.parts {
        if let Some(text) = part.text {
            tracing::info!(provider = "gemini_flash", "model text: {text}");
        } else if let Some(inline) = part.inline_data {
            image.get_or_insert(inline.data);
        }
    }

    let data = image.ok_or_else(|| {
        ImageGenError::UnexpectedResponse("No image data in Gemini response".into())
    })?;
    base64::engine::general_purpose::STANDARD
        .decode(&data)
        .map_err(|e| ImageGenError::Decode(e.to_string()))
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        self.generate_impl(prompt).await
    }

    fn kind(&self) -> BackendSelection {
        BackendSelection::GeminiFlash
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn new(prompt: &str) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![GeminiTextPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    #[allow(dead_code)]
    mime_type: Option<String>,
    data: String,
}
