//! Backend for OpenAI-compatible chat APIs.
//!
//! Endpoint: `POST {base}/v1/chat/completions`, bearer auth, reply text at
//! `choices[0].message.content`.

use super::{http_error, Backend, LlmRequest, LlmResponse};
use crate::error::Result;
use crate::CraftError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const AUTH_ENV_VAR: &str = "OPENAI_API_KEY";

/// Backend for any OpenAI-compatible API.
///
/// # Example
///
/// ```
/// use solution_craft::backend::OpenAiBackend;
///
/// let backend = OpenAiBackend::new().with_api_key("sk-...");
/// assert!(backend.has_api_key());
/// ```
#[derive(Clone, Default)]
pub struct OpenAiBackend {
    api_key: Option<String>,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("api_key", &self.api_key.as_deref().map(redact))
            .finish()
    }
}

/// Show only the first six characters of a secret.
pub(crate) fn redact(key: &str) -> String {
    match key.get(..6) {
        Some(prefix) if key.len() > 6 => format!("{}***", prefix),
        _ => "***".to_string(),
    }
}

impl OpenAiBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    fn build_messages(request: &LlmRequest) -> Vec<Value> {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = request.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            messages.push(json!({"role": "system", "content": sys}));
        }
        messages.push(json!({"role": "user", "content": request.prompt}));
        messages
    }

    fn build_body(request: &LlmRequest) -> Value {
        json!({
            "model": request.model,
            "messages": Self::build_messages(request),
            "temperature": request.config.temperature,
            "max_tokens": request.config.max_tokens,
        })
    }

    fn build_http_request(
        &self,
        client: &Client,
        url: &str,
        body: &Value,
    ) -> reqwest::RequestBuilder {
        let mut req = client.post(url).json(body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Pull the reply text out of a chat completion envelope.
    fn extract_text(json_resp: &Value) -> Result<String> {
        json_resp
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| CraftError::Provider {
                provider: "openai".into(),
                message: "malformed response: missing choices[0].message.content".into(),
            })
    }

    fn extract_metadata(json_resp: &Value) -> Option<Value> {
        let mut meta = serde_json::Map::new();
        for key in ["usage", "model", "id"] {
            if let Some(v) = json_resp.get(key) {
                meta.insert(key.into(), v.clone());
            }
        }
        (!meta.is_empty()).then_some(Value::Object(meta))
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        let url = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));
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
            metadata: Self::extract_metadata(&json_resp),
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }

    fn has_credential(&self) -> bool {
        self.has_api_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LlmConfig;

    const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

    fn test_request() -> LlmRequest {
        LlmRequest {
            model: "gpt-4o".into(),
            system_prompt: None,
            prompt: "Fix helper.py".into(),
            config: LlmConfig::default(),
        }
    }

    #[test]
    fn test_chat_body() {
        let mut request = test_request();
        request.system_prompt = Some("Reply NO or one code block.".into());

        let body = OpenAiBackend::build_body(&request);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["max_tokens"], 4096);

        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "Fix helper.py");
    }

    #[test]
    fn test_empty_system_prompt_omitted() {
        let mut request = test_request();
        request.system_prompt = Some(String::new());
        let body = OpenAiBackend::build_body(&request);
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_extract_text() {
        let ok = json!({"choices": [{"message": {"role": "assistant", "content": "NO"}}]});
        assert_eq!(OpenAiBackend::extract_text(&ok).unwrap(), "NO");

        let malformed = json!({"error": {"message": "nope"}});
        assert!(matches!(
            OpenAiBackend::extract_text(&malformed),
            Err(CraftError::Provider { .. })
        ));
    }

    #[test]
    fn test_auth_header() {
        let backend = OpenAiBackend::new().with_api_key("sk-test123");
        let req = backend
            .build_http_request(&Client::new(), CHAT_URL, &json!({}))
            .build()
            .expect("build request");
        assert_eq!(req.headers().get("Authorization").unwrap(), "Bearer sk-test123");

        let anonymous = OpenAiBackend::new()
            .build_http_request(&Client::new(), CHAT_URL, &json!({}))
            .build()
            .expect("build request");
        assert!(anonymous.headers().get("Authorization").is_none());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let backend = OpenAiBackend::new().with_api_key("sk-1234567890abcdef");
        let debug_output = format!("{:?}", backend);
        assert!(!debug_output.contains("1234567890abcdef"));
        assert!(debug_output.contains("sk-123***"));
    }

    #[test]
    fn test_blank_key_is_no_credential() {
        assert!(!OpenAiBackend::new().has_credential());
        assert!(!OpenAiBackend::new().with_api_key("  ").has_credential());
        assert!(OpenAiBackend::new().with_api_key("sk-x").has_credential());
    }
}
