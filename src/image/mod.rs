//! Image backends and the types they produce.

mod provider;
pub mod providers;
mod types;

pub use provider::{ImageProvider, StockImageSource};
pub use types::{GeneratedImage, GenerationMetadata, ImageFormat};
