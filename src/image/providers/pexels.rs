//! Pexels stock photo search.

use crate::config::BackendSelection;
use crate::error::{sanitize_error_message, ImageGenError, Result};
use crate::image::provider::StockImageSource;
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.pexels.com";

/// Builder for PexelsProvider.
#[derive(Debug, Clone, Default)]
pub struct PexelsProviderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
}

impl PexelsProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Overrides the API host, e.g. for a proxy.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the provider.
    ///
    /// A missing key does not fail here; requests fail with
    /// [`ImageGenError::Auth`] instead.
    pub fn build(self) -> Result<PexelsProvider> {
        let api_key = self.api_key.filter(|k| !k.is_empty());

        Ok(PexelsProvider {
            client: reqwest::Client::new(),
            api_key,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

/// Pexels photo search.
pub struct PexelsProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl PexelsProvider {
    /// Creates a new `PexelsProviderBuilder`.
    pub fn builder() -> PexelsProviderBuilder {
        PexelsProviderBuilder::new()
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ImageGenError::Auth("PEXELS_API_KEY is not set".into()))
    }
}

#[async_trait]
impl StockImageSource for PexelsProvider {
    async fn search(&self, query: &str) -> Result<String> {
        let api_key = self.api_key()?;
        let url = format!("{}/v1/search", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            // Pexels takes the bare key, no scheme
            .header("Authorization", api_key)
            .query(&[("query", query), ("per_page", "1")])
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

        let body: PexelsSearchResponse = response.json().await?;
        body.photos
            .into_iter()
            .next()
            .map(|photo| photo.src.large)
            .ok_or_else(|| ImageGenError::NoResults(query.to_string()))
    }

    fn kind(&self) -> BackendSelection {
        BackendSelection::Pexels
    }
}

#[derive(Debug, Deserialize)]
struct PexelsSearchResponse {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    src: PexelsPhotoSources,
}

#[derive(Debug, Deserialize)]
struct PexelsPhotoSources {
    large: String,
}
