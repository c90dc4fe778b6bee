//! Backend selection and the degrade-to-placeholder request path.

use crate::config::{BackendSelection, ImageConfig};
use crate::error::{ImageGenError, Result};
use crate::image::providers::{
    GeminiProvider, LocalServerProvider, OpenAiImageProvider, PexelsProvider, PixabayProvider,
};
use crate::image::{ImageProvider, StockImageSource};
use crate::prompt::ImagePrompt;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Static image served whenever no real image can be produced.
pub const PLACEHOLDER_IMAGE_PATH: &str = "/static/images/placeholder.jpg";

/// Where a saved image came from, kept for later attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageAttribution {
    /// The caller's prompt, without theme.
    pub prompt: String,
    /// The caller's theme, if any.
    pub theme_prompt: Option<String>,
}

/// Outcome of one image request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ImageResult {
    /// Hosted image link returned by a stock search.
    RemoteUrl(String),
    /// Image written to the output directory.
    SavedFile {
        /// Location of the file.
        path: PathBuf,
        /// Prompt and theme the image was made from.
        metadata: ImageAttribution,
    },
    /// The fixed placeholder path.
    Placeholder(&'static str),
}

impl ImageResult {
    /// Returns true for the placeholder fallback.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    /// Returns the URL or path as a string.
    pub fn location(&self) -> String {
        match self {
            Self::RemoteUrl(url) => url.clone(),
            Self::SavedFile { path, .. } => path.display().to_string(),
            Self::Placeholder(path) => (*path).to_string(),
        }
    }
}

/// The one backend a dispatcher is bound to.
pub enum Backend {
    /// Pixabay search.
    Pixabay(PixabayProvider),
    /// Pexels search.
    Pexels(PexelsProvider),
    /// Gemini Flash generation.
    GeminiFlash(GeminiProvider),
    /// DALL-E 3 generation.
    DallE3(OpenAiImageProvider),
    /// Local Automatic1111-compatible server.
    LocalServer(LocalServerProvider),
}

/// Raw backend answer before it is checked.
#[derive(Debug)]
enum BackendOutput {
    Url(String),
    File(PathBuf),
}

impl Backend {
    /// Builds the provider for `selection` from configuration.
    ///
    /// Returns `Ok(None)` for [`BackendSelection::Disabled`]. A missing local
    /// server URL fails here, before any request is made. Missing API keys
    /// do not: those backends bind and fail per request.
    pub fn from_config(selection: BackendSelection, config: &ImageConfig) -> Result<Option<Self>> {
        let backend = match selection {
            BackendSelection::Disabled => return Ok(None),
            BackendSelection::Pixabay => {
                let mut builder = PixabayProvider::builder();
                if let Some(key) = &config.pixabay_api_key {
                    builder = builder.api_key(key);
                }
                Self::Pixabay(builder.build()?)
            }
            BackendSelection::Pexels => {
                let mut builder = PexelsProvider::builder();
                if let Some(key) = &config.pexels_api_key {
                    builder = builder.api_key(key);
                }
                Self::Pexels(builder.build()?)
            }
            BackendSelection::GeminiFlash => {
                let mut builder = GeminiProvider::builder();
                if let Some(key) = &config.google_api_key {
                    builder = builder.api_key(key);
                }
                Self::GeminiFlash(builder.build()?)
            }
            BackendSelection::DallE3 => {
                let mut builder = OpenAiImageProvider::builder();
                if let Some(key) = &config.openai_api_key {
                    builder = builder.api_key(key);
                }
                Self::DallE3(builder.build()?)
            }
            BackendSelection::LocalServer => {
                let mut builder = LocalServerProvider::builder();
                if let Some(url) = &config.local_image_url {
                    builder = builder.url(url);
                }
                if let Some(model) = &config.local_image_model {
                    builder = builder.model(model);
                }
                Self::LocalServer(builder.build()?)
            }
        };
        Ok(Some(backend))
    }

    /// Returns which backend this is.
    pub fn selection(&self) -> BackendSelection {
        match self {
            Self::Pixabay(_) => BackendSelection::Pixabay,
            Self::Pexels(_) => BackendSelection::Pexels,
            Self::GeminiFlash(_) => BackendSelection::GeminiFlash,
            Self::DallE3(_) => BackendSelection::DallE3,
            Self::LocalServer(_) => BackendSelection::LocalServer,
        }
    }

    async fn invoke(&self, prompt: &str, output_dir: &Path) -> Result<BackendOutput> {
        match self {
            Self::Pixabay(source) => search(source, prompt).await,
            Self::Pexels(source) => search(source, prompt).await,
            Self::GeminiFlash(provider) => generate_to(provider, prompt, output_dir).await,
            Self::DallE3(provider) => generate_to(provider, prompt, output_dir).await,
            Self::LocalServer(provider) => generate_to(provider, prompt, output_dir).await,
        }
    }
}

async fn search(source: &dyn StockImageSource, query: &str) -> Result<BackendOutput> {
    let url = source.search(query).await?;
    tracing::info!(provider = %source.kind(), url = %url, "stock image found");
    Ok(BackendOutput::Url(url))
}

async fn generate_to(
    provider: &dyn ImageProvider,
    prompt: &str,
    output_dir: &Path,
) -> Result<BackendOutput> {
    let image = provider.generate(prompt).await?;
    let path = image.save_to_dir(output_dir).await?;
    tracing::info!(
        provider = provider.name(),
        model = ?image.metadata.model,
        duration_ms = ?image.metadata.duration_ms,
        size_bytes = image.size(),
        format = image.format.mime_type(),
        path = %path.display(),
        "image generated"
    );
    Ok(BackendOutput::File(path))
}

/// Checks a backend answer and turns it into an [`ImageResult`].
async fn normalize(output: BackendOutput, prompt: &ImagePrompt) -> Result<ImageResult> {
    match output {
        BackendOutput::Url(url) if url.starts_with("http://") || url.starts_with("https://") => {
            Ok(ImageResult::RemoteUrl(url))
        }
        BackendOutput::Url(url) => Err(ImageGenError::UnexpectedResponse(format!(
            "backend returned a non-HTTP image location: {url:?}"
        ))),
        BackendOutput::File(path) => {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                Ok(ImageResult::SavedFile {
                    path,
                    metadata: ImageAttribution {
                        prompt: prompt.prompt.clone(),
                        theme_prompt: prompt.theme_prompt.clone(),
                    },
                })
            } else {
                Err(ImageGenError::UnexpectedResponse(format!(
                    "Image not found at {}",
                    path.display()
                )))
            }
        }
    }
}

/// Routes image requests to the one configured backend.
///
/// The binding is fixed at construction. `generate` never fails: every
/// per-request error is logged and answered with the placeholder.
pub struct ImageDispatcher {
    output_dir: PathBuf,
    selection: Option<BackendSelection>,
    backend: Option<Backend>,
}

impl ImageDispatcher {
    /// Resolves the selection in `config` and binds its backend.
    ///
    /// Configuration errors (missing API key or local server URL for the
    /// selected backend) are returned here.
    pub fn from_config(output_dir: impl Into<PathBuf>, config: &ImageConfig) -> Result<Self> {
        let output_dir = output_dir.into();
        let selection = config.resolve();
        let backend = match selection {
            Some(selection) => Backend::from_config(selection, config)?,
            None => None,
        };

        match selection {
            Some(selection) => tracing::info!(provider = %selection, "image backend bound"),
            None => tracing::warn!(
                configured = ?config.image_provider,
                "no image backend selected"
            ),
        }

        Ok(Self {
            output_dir,
            selection,
            backend,
        })
    }

    /// Binds an already built backend.
    pub fn new(output_dir: impl Into<PathBuf>, backend: Backend) -> Self {
        Self {
            output_dir: output_dir.into(),
            selection: Some(backend.selection()),
            backend: Some(backend),
        }
    }

    /// A dispatcher that always answers with the placeholder.
    pub fn disabled(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            selection: Some(BackendSelection::Disabled),
            backend: None,
        }
    }

    /// Returns the resolved selection; `None` when nothing was selected.
    pub fn selection(&self) -> Option<BackendSelection> {
        self.selection
    }

    /// Returns the directory generated images are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns the bound backend, if any.
    pub fn backend(&self) -> Option<&Backend> {
        self.backend.as_ref()
    }

    /// Acquires one image for `prompt`.
    pub async fn generate(&self, prompt: &ImagePrompt) -> ImageResult {
        let Some(backend) = &self.backend else {
            if self.selection == Some(BackendSelection::Disabled) {
                tracing::info!("image generation is disabled, using placeholder image");
            } else {
                tracing::warn!("no image backend bound, using placeholder image");
            }
            return ImageResult::Placeholder(PLACEHOLDER_IMAGE_PATH);
        };

        let selection = backend.selection();
        let effective = prompt.effective_prompt(!selection.is_stock());
        tracing::info!(provider = %selection, prompt = %effective, "generating image");

        let outcome = match backend.invoke(&effective, &self.output_dir).await {
            Ok(output) => normalize(output, prompt).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    provider = %selection,
                    kind = %e.kind(),
                    error = %e,
                    "image generation failed, using placeholder image"
                );
                ImageResult::Placeholder(PLACEHOLDER_IMAGE_PATH)
            }
        }
    }
}
