//! Backend trait and normalized request/response types.
//!
//! The [`Backend`] trait abstracts over LLM vendors, translating between the
//! vendor-agnostic (instructions, prompt) → text contract and each vendor's
//! HTTP API. Built-in implementations: [`OpenAiBackend`], [`GeminiBackend`],
//! [`AnthropicBackend`], and [`MockBackend`] for tests.
//!
//! ## Architecture
//!
//! ```text
//! Provider ──► LlmRequest ──► with_backoff(Backend::complete) ──► LlmResponse
//!                                      │
//!              ┌───────────────────────┼───────────────────────┐
//!        OpenAiBackend           GeminiBackend          AnthropicBackend
//!    /v1/chat/completions   /v1beta/models/*:generate   /v1/messages
//! ```

pub mod anthropic;
pub mod backoff;
pub mod gemini;
pub mod mock;
pub mod openai;

pub use anthropic::AnthropicBackend;
pub use backoff::BackoffConfig;
pub use gemini::GeminiBackend;
pub use mock::MockBackend;
pub use openai::OpenAiBackend;

use crate::client::LlmConfig;
use crate::error::Result;
use crate::CraftError;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Type alias for the callback invoked before each transport retry.
///
/// Arguments: `(attempt_number, delay_before_retry, reason_for_retry)`.
pub type RetryCallback<'a> = Option<&'a mut (dyn FnMut(u32, Duration, &str) + Send)>;

/// A normalized, provider-agnostic LLM request.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Model identifier (e.g. `"gpt-4o"`, `"gemini-2.0-flash"`).
    pub model: String,

    /// System instructions. Empty instructions are omitted from the wire body.
    pub system_prompt: Option<String>,

    /// The user prompt text.
    pub prompt: String,

    /// Sampling configuration (temperature, max_tokens).
    pub config: LlmConfig,
}

/// A normalized LLM response.
#[derive(Debug)]
pub struct LlmResponse {
    /// The generated text content.
    pub text: String,

    /// HTTP status code (for diagnostics/logging).
    pub status: u16,

    /// Provider-specific metadata (token counts, model info).
    pub metadata: Option<serde_json::Value>,
}

/// Abstraction over LLM vendors.
///
/// This trait is object-safe and designed to be used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute one completion call.
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse>;

    /// Human-readable vendor name for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Whether a credential is configured. Backends that need none return `true`.
    fn has_credential(&self) -> bool {
        true
    }
}

/// Parse a `Retry-After` header value as whole seconds.
pub(crate) fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Turn a non-success HTTP response into [`CraftError::HttpError`].
pub(crate) async fn http_error(resp: reqwest::Response) -> CraftError {
    let status = resp.status().as_u16();
    let retry_after = resp
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);
    let body = resp.text().await.unwrap_or_default();
    CraftError::HttpError {
        status,
        body,
        retry_after,
    }
}

/// Check whether a [`CraftError`] is retryable based on the backoff config.
///
/// Retryable conditions:
/// - [`CraftError::HttpError`] with a status in `config.retryable_statuses`
/// - [`CraftError::Request`] (connection/transport errors)
pub fn is_retryable(error: &CraftError, config: &BackoffConfig) -> bool {
    match error {
        CraftError::HttpError { status, .. } => config.retryable_statuses.contains(status),
        CraftError::Request(_) => true,
        _ => false,
    }
}

/// Execute a backend call with transport-level retry and exponential backoff.
///
/// Retries transient failures (429, 5xx, connection errors) according to
/// `config`. Returns the first successful response, or the last error once
/// retries are exhausted.
pub async fn with_backoff(
    backend: &Arc<dyn Backend>,
    client: &Client,
    base_url: &str,
    request: &LlmRequest,
    config: &BackoffConfig,
    mut on_retry: RetryCallback<'_>,
) -> Result<LlmResponse> {
    let mut last_error: Option<CraftError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = match &last_error {
                Some(CraftError::HttpError {
                    retry_after: Some(ra),
                    ..
                }) if config.respect_retry_after => *ra,
                _ => config.delay_for_attempt(attempt - 1),
            };

            let reason = last_error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default();

            if let Some(ref mut cb) = on_retry {
                cb(attempt, delay, &reason);
            }

            tokio::time::sleep(delay).await;
        }

        match backend.complete(client, base_url, request).await {
            Ok(response) => return Ok(response),
            Err(e) => {
                if attempt < config.max_retries && is_retryable(&e, config) {
                    last_error = Some(e);
                    continue;
                }
                return Err(e);
            }
        }
    }

    Err(last_error.unwrap_or(CraftError::Other(
        "backoff loop exited unexpectedly".into(),
    )))
}
