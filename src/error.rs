use thiserror::Error;

/// Pipeline stage names used when reporting cancellation.
pub const STAGE_FETCH: &str = "fetch";
pub const STAGE_EXTRACT: &str = "extract";
pub const STAGE_NORMALIZE: &str = "normalize";
pub const STAGE_VALIDATE: &str = "validate";
pub const STAGE_ASSEMBLE: &str = "assemble";

#[derive(Error, Debug)]
pub enum SchemaMarkupError {
    /// The whole input is uninterpretable (empty, oversized, bad URL).
    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    /// URL mode only: the remote page could not be retrieved in time.
    #[error("Failed to fetch {url}: {message}")]
    FetchFailed { url: String, message: String },

    #[error("Unsupported format: {message}")]
    UnsupportedFormat { message: String },

    #[error("Analysis cancelled during {stage}")]
    Cancelled { stage: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Vocabulary error: {message}")]
    Vocabulary { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl SchemaMarkupError {
    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    pub fn fetch_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            message: message.into(),
        }
    }

    pub fn cancelled(stage: impl Into<String>) -> Self {
        Self::Cancelled {
            stage: stage.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn vocabulary(message: impl Into<String>) -> Self {
        Self::Vocabulary {
            message: message.into(),
        }
    }

    /// Whether the error came from the fetch collaborator rather than the engine.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::FetchFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, SchemaMarkupError>;
