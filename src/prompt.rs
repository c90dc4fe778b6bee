//! Image prompts.

use serde::{Deserialize, Serialize};

/// A prompt for one image, with optional thematic context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePrompt {
    /// The subject of the image.
    pub prompt: String,
    /// Styling or thematic context folded in for generative backends.
    pub theme_prompt: Option<String>,
}

impl ImagePrompt {
    /// Creates a prompt without a theme.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            theme_prompt: None,
        }
    }

    /// Sets the theme.
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme_prompt = Some(theme.into());
        self
    }

    /// Returns the text actually sent to a backend.
    ///
    /// Stock searches want raw keywords, so callers pass `with_theme = false`
    /// for them. A blank theme is ignored.
    pub fn effective_prompt(&self, with_theme: bool) -> String {
        match self.theme_prompt.as_deref().map(str::trim) {
            Some(theme) if with_theme && !theme.is_empty() => {
                format!("{}, {}", self.prompt, theme)
            }
            _ => self.prompt.clone(),
        }
    }
}
