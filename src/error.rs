use std::time::Duration;
use thiserror::Error;

/// Errors produced by providers, the ensemble, the judge and the correction loop.
#[derive(Error, Debug)]
pub enum CraftError {
    /// Low-level HTTP transport failure (connection refused, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed at the serde level.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem failure while reading or writing solution files.
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error with status code, response body, and optional Retry-After hint.
    ///
    /// Returned by [`Backend`](crate::backend::Backend) implementations when
    /// the provider returns a non-success status code. The `retry_after` field
    /// is populated from the `Retry-After` response header when present.
    #[error("HTTP {status}: {body}")]
    HttpError {
        /// HTTP status code (e.g. 429, 500, 503).
        status: u16,
        /// Response body text.
        body: String,
        /// Parsed `Retry-After` header value, if present.
        retry_after: Option<Duration>,
    },

    /// A provider has no usable credential and is disabled.
    #[error("provider '{provider}' has no credential configured")]
    Credential { provider: String },

    /// A single provider call failed: transport, malformed envelope,
    /// empty completion or safety block.
    #[error("provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    /// The judge failed to generate, refine or synthesize an answer.
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// The solution could not be launched or its output could not be captured.
    #[error("execution failed: {0}")]
    Execution(String),

    /// The solution manifest is missing or unusable.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Invalid configuration detected at build time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl CraftError {
    /// Wrap any provider-side failure under the given provider id.
    ///
    /// Credential and provider errors pass through untouched so the original
    /// provider attribution survives.
    pub fn for_provider(provider: &str, err: CraftError) -> Self {
        match err {
            e @ (CraftError::Credential { .. } | CraftError::Provider { .. }) => e,
            other => CraftError::Provider {
                provider: provider.to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<anyhow::Error> for CraftError {
    fn from(err: anyhow::Error) -> Self {
        CraftError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CraftError>;
