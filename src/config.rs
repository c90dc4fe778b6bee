//! Provider selection and per-provider settings.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which image backend is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendSelection {
    /// Image acquisition is switched off; every request gets the placeholder.
    Disabled,
    /// Pixabay stock photo search.
    Pixabay,
    /// Pexels stock photo search.
    Pexels,
    /// Gemini 2.5 Flash image generation (Google).
    GeminiFlash,
    /// DALL-E 3 image generation (OpenAI).
    #[serde(rename = "dall-e-3")]
    DallE3,
    /// Self-hosted Automatic1111-compatible server.
    #[serde(rename = "local")]
    LocalServer,
}

impl BackendSelection {
    /// Order in which selection flags are checked when binding a backend.
    pub const PRIORITY: [BackendSelection; 5] = [
        Self::Pixabay,
        Self::Pexels,
        Self::GeminiFlash,
        Self::DallE3,
        Self::LocalServer,
    ];

    /// Returns the configuration name of this selection.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Pixabay => "pixabay",
            Self::Pexels => "pexels",
            Self::GeminiFlash => "gemini_flash",
            Self::DallE3 => "dall-e-3",
            Self::LocalServer => "local",
        }
    }

    /// Returns a display name for this backend.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Disabled => "Disabled",
            Self::Pixabay => "Pixabay",
            Self::Pexels => "Pexels",
            Self::GeminiFlash => "Gemini Flash (Google)",
            Self::DallE3 => "DALL-E 3 (OpenAI)",
            Self::LocalServer => "Local server (Automatic1111-compatible)",
        }
    }

    /// Stock backends search an existing photo library by keyword.
    pub fn is_stock(&self) -> bool {
        matches!(self, Self::Pixabay | Self::Pexels)
    }

    /// Environment variable holding this backend's credential or endpoint.
    pub fn env_var(&self) -> Option<&'static str> {
        match self {
            Self::Disabled => None,
            Self::Pixabay => Some("PIXABAY_API_KEY"),
            Self::Pexels => Some("PEXELS_API_KEY"),
            Self::GeminiFlash => Some("GOOGLE_API_KEY"),
            Self::DallE3 => Some("OPENAI_API_KEY"),
            Self::LocalServer => Some("LOCAL_IMAGE_URL"),
        }
    }
}

impl std::fmt::Display for BackendSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendSelection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "none" => Ok(Self::Disabled),
            "pixabay" => Ok(Self::Pixabay),
            "pexels" | "pixels" => Ok(Self::Pexels),
            "gemini_flash" | "gemini-flash" | "gemini" => Ok(Self::GeminiFlash),
            "dall-e-3" | "dalle3" | "dall_e_3" | "openai" => Ok(Self::DallE3),
            "local" | "local_server" | "automatic1111" => Ok(Self::LocalServer),
            other => Err(format!("unknown image provider: {other}")),
        }
    }
}

/// Externally supplied settings, read once when a dispatcher is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Turns image acquisition off regardless of `image_provider`.
    pub disable_image_generation: bool,
    /// Name of the selected provider (e.g. `pexels`, `gemini_flash`).
    pub image_provider: Option<String>,
    /// Pexels API key.
    pub pexels_api_key: Option<String>,
    /// Pixabay API key.
    pub pixabay_api_key: Option<String>,
    /// Google API key used by Gemini.
    pub google_api_key: Option<String>,
    /// OpenAI API key used by DALL-E 3.
    pub openai_api_key: Option<String>,
    /// Full local server endpoint, path included
    /// (e.g. `http://127.0.0.1:7860/sdapi/v1/txt2img`).
    pub local_image_url: Option<String>,
    /// Optional checkpoint override sent to the local server.
    pub local_image_model: Option<String>,
}

impl ImageConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Self {
        Self {
            disable_image_generation: env_var("DISABLE_IMAGE_GENERATION")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            image_provider: env_var("IMAGE_PROVIDER"),
            pexels_api_key: env_var("PEXELS_API_KEY"),
            pixabay_api_key: env_var("PIXABAY_API_KEY"),
            google_api_key: env_var("GOOGLE_API_KEY"),
            openai_api_key: env_var("OPENAI_API_KEY"),
            local_image_url: env_var("LOCAL_IMAGE_URL"),
            local_image_model: env_var("LOCAL_IMAGE_MODEL"),
        }
    }

    /// Sets the provider by name.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.image_provider = Some(provider.into());
        self
    }

    /// Returns true if the given backend is the selected one.
    pub fn is_selected(&self, backend: BackendSelection) -> bool {
        self.image_provider
            .as_deref()
            .and_then(|name| name.parse::<BackendSelection>().ok())
            == Some(backend)
    }

    /// Resolves the active backend.
    ///
    /// Disabled wins over everything; otherwise the first selected backend in
    /// [`BackendSelection::PRIORITY`] is returned. `None` means nothing
    /// matched and requests are served the placeholder.
    pub fn resolve(&self) -> Option<BackendSelection> {
        if self.disable_image_generation || self.is_selected(BackendSelection::Disabled) {
            return Some(BackendSelection::Disabled);
        }
        BackendSelection::PRIORITY
            .into_iter()
            .find(|backend| self.is_selected(*backend))
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
