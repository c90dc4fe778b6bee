//! Self-hosted image generation server (Automatic1111-compatible).
//!
//! The configured URL is the full endpoint, path included, for example
//! `http://127.0.0.1:7860/sdapi/v1/txt2img` for Automatic1111 or
//! `http://127.0.0.1:7860/v1/generation/text-to-image` for Fooocus. The
//! server may answer with raw image bytes (`Content-Type: image/*`) or with
//! JSON carrying a base64 image.

use crate::config::BackendSelection;
use crate::error::{sanitize_error_message, ImageGenError, Result};
use crate::image::provider::ImageProvider;
use crate::image::types::{GeneratedImage, GenerationMetadata, ImageFormat};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Generation on consumer GPUs is slow; give the server five minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const NEGATIVE_PROMPT: &str = "blurry, bad quality, distorted, ugly, deformed";
const STEPS: u32 = 20;
const IMAGE_SIZE: u32 = 1024;
const CFG_SCALE: u32 = 7;
const SAMPLER: &str = "Euler a";

/// JSON keys checked, in order, after `images`.
const FALLBACK_IMAGE_KEYS: [&str; 3] = ["image", "output", "result"];

/// Builder for LocalServerProvider.
#[derive(Debug, Clone)]
pub struct LocalServerProviderBuilder {
    url: Option<String>,
    model: Option<String>,
    timeout: Duration,
}

impl Default for LocalServerProviderBuilder {
    fn default() -> Self {
        Self {
            url: None,
            model: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl LocalServerProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the full endpoint URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets a checkpoint override (`sd_model_checkpoint`).
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the provider. Fails before any I/O if no URL is configured.
    pub fn build(self) -> Result<LocalServerProvider> {
        let url = self
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                ImageGenError::Config("LOCAL_IMAGE_URL environment variable is not set".into())
            })?;

        Ok(LocalServerProvider {
            client: reqwest::Client::new(),
            url,
            model: self.model.filter(|m| !m.trim().is_empty()),
            timeout: self.timeout,
        })
    }
}

/// Client for a user-hosted generation server.
pub struct LocalServerProvider {
    client: reqwest::Client,
    url: String,
    model: Option<String>,
    timeout: Duration,
}

impl LocalServerProvider {
    /// Creates a new `LocalServerProviderBuilder`.
    pub fn builder() -> LocalServerProviderBuilder {
        LocalServerProviderBuilder::new()
    }

    /// Returns the configured endpoint.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ImageProvider for LocalServerProvider {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        let start = Instant::now();
        let payload = Txt2ImgRequest::new(prompt, self.model.as_deref());

        tracing::debug!(url = %self.url, model = ?self.model, "posting to local image server");

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| ImageGenError::Unreachable {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            return Err(ImageGenError::Api {
                status: status.as_u16(),
                message: sanitize_error_message(&text),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let (data, format) = if content_type.starts_with("image/") {
            let bytes = response.bytes().await?;
            (bytes.to_vec(), ImageFormat::from_content_type(&content_type))
        } else {
            let body: Value = response.json().await?;
            let encoded = extract_base64(&body)?;
            (decode_base64_lenient(encoded)?, ImageFormat::Png)
        };

        Ok(GeneratedImage::new(
            data,
            format,
            BackendSelection::LocalServer,
            GenerationMetadata {
                model: self.model.clone(),
                duration_ms: Some(start.elapsed().as_millis() as u64),
            },
        ))
    }

    fn kind(&self) -> BackendSelection {
        BackendSelection::LocalServer
    }
}

#[derive(Debug, Serialize)]
struct Txt2ImgRequest {
    prompt: String,
    negative_prompt: &'static str,
    steps: u32,
    width: u32,
    height: u32,
    cfg_scale: u32,
    sampler_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    override_settings: Option<OverrideSettings>,
}

#[derive(Debug, Serialize)]
struct OverrideSettings {
    sd_model_checkpoint: String,
}

impl Txt2ImgRequest {
    fn new(prompt: &str, model: Option<&str>) -> Self {
        Self {
            prompt: prompt.to_string(),
            negative_prompt: NEGATIVE_PROMPT,
            steps: STEPS,
            width: IMAGE_SIZE,
            height: IMAGE_SIZE,
            cfg_scale: CFG_SCALE,
            sampler_name: SAMPLER,
            override_settings: model.map(|m| OverrideSettings {
                sd_model_checkpoint: m.to_string(),
            }),
        }
    }
}

/// Finds the base64 image in a JSON response.
///
/// Checked in order: `images[0]` (a string, or an object with `base64`),
/// then `image`, `output`, `result`.
fn extract_base64(body: &Value) -> Result<&str> {
    let obj = body.as_object().ok_or_else(|| {
        ImageGenError::UnexpectedResponse("Local image server returned non-object JSON".into())
    })?;

    let found = match obj
        .get("images")
        .and_then(Value::as_array)
        .and_then(|images| images.first())
    {
        Some(first) => Some(first.get("base64").unwrap_or(first)),
        None => FALLBACK_IMAGE_KEYS.iter().find_map(|key| obj.get(*key)),
    };

    let value = found.ok_or_else(|| {
        let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        ImageGenError::UnexpectedResponse(format!("No images found in response. Keys: {keys:?}"))
    })?;

    value.as_str().ok_or_else(|| {
        ImageGenError::UnexpectedResponse("Image field in response is not a string".into())
    })
}

/// Decodes base64 that may carry a data URI prefix, whitespace or no padding.
fn decode_base64_lenient(input: &str) -> Result<Vec<u8>> {
    use base64::Engine;

    let b64 = match input.find(";base64,") {
        Some(pos) => &input[pos + 8..],
        None => input,
    };
    let cleaned: String = b64.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
        return Ok(data);
    }
    base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(&cleaned)
        .map_err(|e| ImageGenError::Decode(e.to_string()))
}
