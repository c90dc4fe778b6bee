//! OpenAI DALL-E 3 image generation provider.

use crate::config::BackendSelection;
use crate::error::{sanitize_error_message, ImageGenError, Result};
use crate::image::provider::ImageProvider;
use crate::image::types::{GeneratedImage, GenerationMetadata, ImageFormat};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

const DALLE3_MODEL: &str = "dall-e-3";
const DALLE3_SIZE: &str = "1024x1024";
const DALLE3_QUALITY: &str = "standard";

/// Builder for OpenAiImageProvider.
#[derive(Debug, Clone, Default)]
pub struct OpenAiImageProviderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
}

impl OpenAiImageProviderBuilder {
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
    pub fn build(self) -> Result<OpenAiImageProvider> {
        let api_key = self.api_key.filter(|k| !k.is_empty());

        Ok(OpenAiImageProvider {
            client: reqwest::Client::new(),
            api_key,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

/// OpenAI image generation provider, pinned to DALL-E 3.
pub struct OpenAiImageProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiImageProvider {
    /// Creates a new `OpenAiImageProviderBuilder`.
    pub fn builder() -> OpenAiImageProviderBuilder {
        OpenAiImageProviderBuilder::new()
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ImageGenError::Auth("OPENAI_API_KEY is not set".into()))
    }

    /// Fetches the hosted image OpenAI points us at.
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ImageGenError::Api {
                status: response.status().as_u16(),
                message: "Failed to download image from URL".into(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ImageProvider for OpenAiImageProvider {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        let api_key = self.api_key()?;
        let start = Instant::now();

        let url = format!(
            "{}/v1/images/generations",
            self.base_url.trim_end_matches('/')
        );
        let body = OpenAiImageRequest::dalle3(prompt);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
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

        let openai_response: OpenAiImageResponse = response.json().await?;

        let image_url = openai_response
            .data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .ok_or_else(|| {
                ImageGenError::UnexpectedResponse("No image URL in OpenAI response".into())
            })?;

        let data = self.download(&image_url).await?;
        let format = ImageFormat::from_magic_bytes(&data).unwrap_or(ImageFormat::Png);

        Ok(GeneratedImage::new(
            data,
            format,
            BackendSelection::DallE3,
            GenerationMetadata {
                model: Some(DALLE3_MODEL.to_string()),
                duration_ms: Some(start.elapsed().as_millis() as u64),
            },
        ))
    }

    fn kind(&self) -> BackendSelection {
        BackendSelection::DallE3
    }
}

#[derive(Debug, Serialize)]
struct OpenAiImageRequest {
    model: &'static str,
    prompt: String,
    n: u32,
    size: &'static str,
    quality: &'static str,
}

impl OpenAiImageRequest {
    fn dalle3(prompt: &str) -> Self {
        Self {
            model: DALLE3_MODEL,
            prompt: prompt.to_string(),
            n: 1,
            size: DALLE3_SIZE,
            quality: DALLE3_QUALITY,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiImageResponse {
    #[serde(default)]
    data: Vec<OpenAiImageData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    revised_prompt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = OpenAiImageProviderBuilder::new().api_key("sk-test").build();
        assert!(provider.is_ok());
    }

    #[test]
    fn test_request_construction() {
        let req = OpenAiImageRequest::dalle3("A sunset");
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["model"], "dall-e-3");
        assert_eq!(json["prompt"], "A sunset");
        assert_eq!(json["n"], 1);
        assert_eq!(json["size"], "1024x1024");
        assert_eq!(json["quality"], "standard");
    }

    #[test]
    fn test_response_deserialization_url() {
        let json = r#"{"created": 1, "data": [{"url": "https://example.com/img.png", "revised_prompt": "A beautiful sunset over the ocean"}]}"#;
        let resp: OpenAiImageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data.len(), 1);
        assert_eq!(
            resp.data[0].url.as_deref(),
            Some("https://example.com/img.png")
        );
        assert!(resp.data[0].revised_prompt.is_some());
    }

    #[test]
    fn test_response_without_data() {
        let resp: OpenAiImageResponse = serde_json::from_str(r#"{"created": 1}"#).unwrap();
        assert!(resp.data.is_empty());
    }
}
