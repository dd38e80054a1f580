//! Backend for Anthropic's Messages API.
//!
//! Endpoint: `POST {base}/v1/messages` with `x-api-key` and
//! `anthropic-version` headers. Reply text is the concatenation of every
//! `text` block in `content`.

use super::openai::redact;
use super::{http_error, Backend, LlmRequest, LlmResponse};
use crate::error::Result;
use crate::CraftError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
pub const AUTH_ENV_VAR: &str = "ANTHROPIC_API_KEY";
const API_VERSION: &str = "2023-06-01";

#[derive(Clone, Default)]
pub struct AnthropicBackend {
    api_key: Option<String>,
}

impl std::fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicBackend")
            .field("api_key", &self.api_key.as_deref().map(redact))
            .finish()
    }
}

impl AnthropicBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn build_body(request: &LlmRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "max_tokens": request.config.max_tokens,
            "temperature": request.config.temperature,
            "messages": [{"role": "user", "content": request.prompt}],
        });
        if let Some(sys) = request.system_prompt.as_deref().filter(|s| !s.trim().is_empty()) {
            body["system"] = json!(sys);
        }
        body
    }

    fn build_http_request(
        &self,
        client: &Client,
        url: &str,
        body: &Value,
    ) -> reqwest::RequestBuilder {
        let mut req = client
            .post(url)
            .header("anthropic-version", API_VERSION)
            .json(body);
        if let Some(ref key) = self.api_key {
            req = req.header("x-api-key", key);
        }
        req
    }

    fn extract_text(body: &Value) -> Result<String> {
        let blocks = body["content"].as_array().ok_or_else(|| CraftError::Provider {
            provider: "anthropic".into(),
            message: "malformed response: missing content".into(),
        })?;
        Ok(blocks
            .iter()
            .filter(|b| b["type"].as_str() == Some("text"))
            .filter_map(|b| b["text"].as_str())
            .collect())
    }
}

#[async_trait]
impl Backend for AnthropicBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        let url = format!("{}/v1/messages", base_url.trim_end_matches('/'));
        let body = Self::build_body(request);

        let resp = self.build_http_request(client, &url, &body).send().await?;
        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            return Err(http_error(resp).await);
        }

        let json_resp: Value = resp.json().await?;
        Ok(LlmResponse {
            text: Self::extract_text(&json_resp)?,
            status,
            metadata: json_resp.get("usage").cloned(),
        })
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}
