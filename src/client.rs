//! Provider client: one configured LLM endpoint.
//!
//! A [`Provider`] binds a [`Backend`] to its model, base URL, sampling
//! config and retry policy, and exposes the vendor-agnostic
//! `complete(instructions, prompt) -> text` contract. Every failure is
//! reported under the provider's id:
//!
//! - no credential → [`CraftError::Credential`], without any network call
//! - transport, HTTP, malformed envelope, safety block, empty text →
//!   [`CraftError::Provider`]

use crate::backend::{with_backoff, Backend, BackoffConfig, LlmRequest, MockBackend};
use crate::error::Result;
use crate::CraftError;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, warn};

/// Sampling configuration sent with every request.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f64,

    /// Maximum tokens to generate. Whole files come back in one reply, so
    /// this is larger than a chat default.
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

impl LlmConfig {
    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }
}

/// One LLM endpoint with everything needed to call it.
#[derive(Clone)]
pub struct Provider {
    id: String,
    backend: Arc<dyn Backend>,
    client: Client,
    base_url: String,
    model: String,
    config: LlmConfig,
    backoff: BackoffConfig,
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.id)
            .field("backend", &self.backend.name())
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl Provider {
    /// Create a provider. The id defaults to the backend's name.
    pub fn new(
        backend: Arc<dyn Backend>,
        client: Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: backend.name().to_string(),
            backend,
            client,
            base_url: base_url.into(),
            model: model.into(),
            config: LlmConfig::default(),
            backoff: BackoffConfig::none(),
        }
    }

    /// A provider backed by a [`MockBackend`], for tests and dry runs.
    pub fn mock(id: impl Into<String>, backend: MockBackend) -> Self {
        Self::new(Arc::new(backend), Client::new(), "http://mock.invalid", "mock").with_id(id)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_config(mut self, config: LlmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether a credential is configured. Providers without one are skipped
    /// by the ensemble.
    pub fn is_available(&self) -> bool {
        self.backend.has_credential()
    }

    /// Send `(instructions, prompt)` and return the raw reply text.
    pub async fn complete(&self, instructions: &str, prompt: &str) -> Result<String> {
        if !self.is_available() {
            return Err(CraftError::Credential {
                provider: self.id.clone(),
            });
        }

        let request = LlmRequest {
            model: self.model.clone(),
            system_prompt: (!instructions.is_empty()).then(|| instructions.to_string()),
            prompt: prompt.to_string(),
            config: self.config.clone(),
        };

        let id = self.id.as_str();
        let mut on_retry = |attempt: u32, delay: std::time::Duration, reason: &str| {
            warn!(provider = %id, attempt, ?delay, reason, "retrying provider call");
        };

        let response = with_backoff(
            &self.backend,
            &self.client,
            &self.base_url,
            &request,
            &self.backoff,
            Some(&mut on_retry),
        )
        .await
        .map_err(|e| CraftError::for_provider(id, e))?;

        if response.text.trim().is_empty() {
            return Err(CraftError::Provider {
                provider: self.id.clone(),
                message: "empty completion".into(),
            });
        }

        debug!(
            provider = %id,
            status = response.status,
            chars = response.text.len(),
            "provider replied"
        );
        Ok(response.text)
    }
}
