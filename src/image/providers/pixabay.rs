//! Pixabay stock photo search.

use crate::config::BackendSelection;
use crate::error::{sanitize_error_message, ImageGenError, Result};
use crate::image::provider::StockImageSource;
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://pixabay.com";

/// Number of hits requested per search; the first one is used.
const RESULTS_PER_PAGE: &str = "3";

/// Builder for PixabayProvider.
#[derive(Debug, Clone, Default)]
pub struct PixabayProviderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
}

impl PixabayProviderBuilder {
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
    pub fn build(self) -> Result<PixabayProvider> {
        let api_key = self.api_key.filter(|k| !k.is_empty());

        Ok(PixabayProvider {
            client: reqwest::Client::new(),
            api_key,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

/// Pixabay photo search.
pub struct PixabayProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl PixabayProvider {
    /// Creates a new `PixabayProviderBuilder`.
    pub fn builder() -> PixabayProviderBuilder {
        PixabayProviderBuilder::new()
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ImageGenError::Auth("PIXABAY_API_KEY is not set".into()))
    }
}

#[async_trait]
impl StockImageSource for PixabayProvider {
    async fn search(&self, query: &str) -> Result<String> {
        let api_key = self.api_key()?;
        let url = format!("{}/api/", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", api_key),
                ("q", query),
                ("image_type", "photo"),
                ("per_page", RESULTS_PER_PAGE),
            ])
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

        let body: PixabaySearchResponse = response.json().await?;
        body.hits
            .into_iter()
            .next()
            .map(|hit| hit.large_image_url)
            .ok_or_else(|| ImageGenError::NoResults(query.to_string()))
    }

    fn kind(&self) -> BackendSelection {
        BackendSelection::Pixabay
    }
}

#[derive(Debug, Deserialize)]
struct PixabaySearchResponse {
    #[serde(default)]
    hits: Vec<PixabayHit>,
}

#[derive(Debug, Deserialize)]
struct PixabayHit {
    #[serde(rename = "largeImageURL")]
    large_image_url: String,
}
