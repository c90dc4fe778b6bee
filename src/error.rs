//! Error types for image acquisition.

/// Maximum number of characters of a provider body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Errors that can occur while acquiring an image.
#[derive(Debug, thiserror::Error)]
pub enum ImageGenError {
    /// Required configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// API key missing for the selected provider.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Provider returned a non-success HTTP status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, trimmed.
        message: String,
    },

    /// Stock search returned no usable hit.
    #[error("no results for query: {0}")]
    NoResults(String),

    /// Provider answered with a body we could not use.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The local generation server could not be reached.
    #[error("failed to connect to local image server at {url}: {source}")]
    Unreachable {
        /// Endpoint that was being called.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of [`ImageGenError`], used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Setup mistake, surfaced before any I/O.
    Configuration,
    /// Provider rejected the request or found nothing.
    ProviderHttp,
    /// Provider answered with an unusable body.
    ProviderResponse,
    /// Transport failure or timeout.
    Connectivity,
    /// Writing the image to disk failed.
    Filesystem,
}

impl ErrorKind {
    /// Returns a short, stable label for log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::ProviderHttp => "provider_http",
            Self::ProviderResponse => "provider_response",
            Self::Connectivity => "connectivity",
            Self::Filesystem => "filesystem",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ImageGenError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Auth(_) => ErrorKind::Configuration,
            Self::Api { .. } | Self::NoResults(_) => ErrorKind::ProviderHttp,
            Self::UnexpectedResponse(_) | Self::Decode(_) | Self::Json(_) => {
                ErrorKind::ProviderResponse
            }
            // reqwest reports body decoding failures through the same type
            Self::Network(e) if e.is_decode() => ErrorKind::ProviderResponse,
            Self::Network(e) if e.is_status() => ErrorKind::ProviderHttp,
            Self::Network(_) | Self::Unreachable { .. } => ErrorKind::Connectivity,
            Self::Io(_) => ErrorKind::Filesystem,
        }
    }

    /// Returns true if this error means the service was set up wrong.
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

/// Trims a provider error body to something fit for logs and error messages.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    out.push_str("...");
    out
}

/// Result type alias for image acquisition operations.
pub type Result<T> = std::result::Result<T, ImageGenError>;
