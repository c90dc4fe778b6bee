#![warn(missing_docs)]
//! imagegen - one image per prompt, from whichever backend is configured.
//!
//! Supported backends:
//! - Pixabay and Pexels stock photo search (returns a hosted URL)
//! - Gemini Flash and DALL-E 3 generation (writes a file)
//! - A self-hosted Automatic1111-compatible server (writes a file)
//!
//! The backend is picked once from [`ImageConfig`]. Requests that fail for
//! any reason are answered with a fixed placeholder path instead of an
//! error.
//!
//! # Quick Start
//!
//! ```no_run
//! use imagegen::{ImageConfig, ImageDispatcher, ImagePrompt, ImageResult};
//!
//! #[tokio::main]
//! async fn main() -> imagegen::Result<()> {
//!     let config = ImageConfig::from_env();
//!     let dispatcher = ImageDispatcher::from_config("./images", &config)?;
//!
//!     let prompt = ImagePrompt::new("sunset over mountains").with_theme("warm, cinematic");
//!     match dispatcher.generate(&prompt).await {
//!         ImageResult::RemoteUrl(url) => println!("hosted at {url}"),
//!         ImageResult::SavedFile { path, .. } => println!("saved to {}", path.display()),
//!         ImageResult::Placeholder(path) => println!("fell back to {path}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! [`ImageConfig::from_env`] reads `DISABLE_IMAGE_GENERATION`,
//! `IMAGE_PROVIDER` (`pixabay`, `pexels`, `gemini_flash`, `dall-e-3`,
//! `local`), `PEXELS_API_KEY`, `PIXABAY_API_KEY`, `GOOGLE_API_KEY`,
//! `OPENAI_API_KEY`, `LOCAL_IMAGE_URL` and `LOCAL_IMAGE_MODEL`.

mod config;
mod dispatcher;
mod error;
pub mod image;
mod prompt;

pub use config::{BackendSelection, ImageConfig};
pub use dispatcher::{
    Backend, ImageAttribution, ImageDispatcher, ImageResult, PLACEHOLDER_IMAGE_PATH,
};
pub use error::{ErrorKind, ImageGenError, Result};
pub use image::providers::{
    GeminiProvider, GeminiProviderBuilder, LocalServerProvider, LocalServerProviderBuilder,
    OpenAiImageProvider, OpenAiImageProviderBuilder, PexelsProvider, PexelsProviderBuilder,
    PixabayProvider, PixabayProviderBuilder,
};
pub use image::{GeneratedImage, GenerationMetadata, ImageFormat, ImageProvider, StockImageSource};
pub use prompt::ImagePrompt;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{BackendSelection, ImageConfig};
    pub use crate::dispatcher::{ImageDispatcher, ImageResult};
    pub use crate::error::{ImageGenError, Result};
    pub use crate::image::{ImageProvider, StockImageSource};
    pub use crate::prompt::ImagePrompt;
}
