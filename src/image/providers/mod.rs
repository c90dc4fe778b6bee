//! Image acquisition backends.

mod gemini;
mod local;
mod openai;
mod pexels;
mod pixabay;

pub use gemini::{GeminiProvider, GeminiProviderBuilder, GEMINI_FLASH_IMAGE_MODEL};
pub use local::{LocalServerProvider, LocalServerProviderBuilder};
pub use openai::{OpenAiImageProvider, OpenAiImageProviderBuilder};
pub use pexels::{PexelsProvider, PexelsProviderBuilder};
pub use pixabay::{PixabayProvider, PixabayProviderBuilder};
