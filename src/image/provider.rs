//! Provider traits.

use crate::config::BackendSelection;
use crate::error::Result;
use crate::image::types::GeneratedImage;
use async_trait::async_trait;

/// A backend that synthesizes new pixels from a prompt.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generates an image from the given prompt.
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage>;

    /// Returns the backend this provider implements.
    fn kind(&self) -> BackendSelection;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str {
        self.kind().display_name()
    }
}

/// A backend that searches an existing photo library by keyword.
#[async_trait]
pub trait StockImageSource: Send + Sync {
    /// Returns the URL of the best match for `query`.
    async fn search(&self, query: &str) -> Result<String>;

    /// Returns the backend this source implements.
    fn kind(&self) -> BackendSelection;
}
