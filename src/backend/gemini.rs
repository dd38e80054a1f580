//! Backend for Google's Gemini `generateContent` API.
//!
//! Endpoint: `POST {base}/v1beta/models/{model}:generateContent`, with the
//! key in the `x-goog-api-key` header so it never appears in a URL (and so
//! never in a transport error's text). The instructions travel as
//! `systemInstruction`, the prompt as a single
//! user turn in `contents`. Reply text is the concatenation of
//! `candidates[0].content.parts[*].text`.

use super::openai::redact;
use super::{http_error, Backend, LlmRequest, LlmResponse};
use crate::error::Result;
use crate::CraftError;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const AUTH_ENV_VAR: &str = "GEMINI_API_KEY";
const AUTH_HEADER: &str = "x-goog-api-key";

#[derive(Clone, Default)]
pub struct GeminiBackend {
    api_key: Option<String>,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("api_key", &self.api_key.as_deref().map(redact))
            .finish()
    }
}

impl GeminiBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn endpoint(base_url: &str, model: &str) -> Result<Url> {
        let raw = format!(
            "{}/v1beta/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            model
        );
        Url::parse(&raw).map_err(|e| {
            CraftError::InvalidConfig(format!("invalid gemini endpoint {}: {}", raw, e))
        })
    }

    fn build_http_request(
        &self,
        client: &Client,
        url: Url,
        body: &Value,
    ) -> reqwest::RequestBuilder {
        let mut req = client.post(url).json(body);
        if let Some(ref key) = self.api_key {
            req = req.header(AUTH_HEADER, key);
        }
        req
    }

    fn build_body(request: &LlmRequest) -> Value {
        let mut body = json!({
            "contents": [{"role": "user", "parts": [{"text": request.prompt}]}],
            "generationConfig": {
                "temperature": request.config.temperature,
                "maxOutputTokens": request.config.max_tokens,
            },
        });
        if let Some(sys) = request.system_prompt.as_deref().filter(|s| !s.trim().is_empty()) {
            body["systemInstruction"] = json!({"parts": [{"text": sys}]});
        }
        body
    }

    /// Pull the reply text out of a `generateContent` envelope.
    ///
    /// A blocked prompt or a candidate stopped for safety with no text is a
    /// provider error, as is an envelope with no candidate text at all.
    fn extract_text(body: &Value) -> Result<String> {
        let fail = |message: String| CraftError::Provider {
            provider: "gemini".into(),
            message,
        };

        if let Some(reason) = body["promptFeedback"]["blockReason"].as_str() {
            return Err(fail(format!("prompt blocked: {}", reason)));
        }

        let candidate = body["candidates"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| fail("malformed response: no candidates".into()))?;

        let text = candidate["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.is_empty() {
            let finish = candidate["finishReason"].as_str().unwrap_or("");
            return Err(if finish == "SAFETY" {
                fail("completion blocked for safety".into())
            } else {
                fail(format!(
                    "malformed response: no candidate text (finishReason '{}')",
                    finish
                ))
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl Backend for GeminiBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        let url = Self::endpoint(base_url, &request.model)?;
        let body = Self::build_body(request);

        let resp = self.build_http_request(client, url, &body).send().await?;
        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            return Err(http_error(resp).await);
        }

        let json_resp: Value = resp.json().await?;
        Ok(LlmResponse {
            text: Self::extract_text(&json_resp)?,
            status,
            metadata: json_resp.get("usageMetadata").cloned(),
        })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }

    fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LlmConfig;

    fn request(system: Option<&str>) -> LlmRequest {
        LlmRequest {
            model: DEFAULT_MODEL.into(),
            system_prompt: system.map(str::to_string),
            prompt: "Evaluate these replies".into(),
            config: LlmConfig::default(),
        }
    }

    #[test]
    fn test_body_shape() {
        let body = GeminiBackend::build_body(&request(Some("You are the judge.")));
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Evaluate these replies");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are the judge.");
        assert_eq!(body["generationConfig"]["temperature"], 0.7);

        let bare = GeminiBackend::build_body(&request(None));
        assert!(bare.get("systemInstruction").is_none());
    }

    #[test]
    fn test_key_travels_in_header_not_url() {
        let backend = GeminiBackend::new().with_api_key("abc123");
        let url = GeminiBackend::endpoint(
            "https://generativelanguage.googleapis.com/",
            "gemini-2.0-flash",
        )
        .unwrap();
        let req = backend
            .build_http_request(&Client::new(), url, &json!({}))
            .build()
            .unwrap();
        assert_eq!(req.url().host_str(), Some("generativelanguage.googleapis.com"));
        assert_eq!(
            req.url().path(),
            "/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert!(req.url().query().is_none());
        assert_eq!(req.headers()[AUTH_HEADER], "abc123");
    }

    #[tokio::test]
    async fn test_transport_error_does_not_leak_key() {
        let provider = crate::client::Provider::new(
            std::sync::Arc::new(GeminiBackend::new().with_api_key("SECRET123")),
            Client::new(),
            "http://127.0.0.1:1",
            "m",
        );
        let err = provider.complete("i", "p").await.unwrap_err();
        assert!(matches!(err, CraftError::Provider { .. }));
        assert!(!err.to_string().contains("SECRET123"), "{err}");
    }

    #[test]
    fn test_extract_joins_parts() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": "def add"}, {"text": "(a, b)"}]}}]
        });
        assert_eq!(GeminiBackend::extract_text(&body).unwrap(), "def add(a, b)");
    }

    #[test]
    fn test_extract_safety_block() {
        let blocked = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = GeminiBackend::extract_text(&blocked).unwrap_err();
        assert!(err.to_string().contains("blocked"));

        let stopped = json!({"candidates": [{"finishReason": "SAFETY"}]});
        let err = GeminiBackend::extract_text(&stopped).unwrap_err();
        assert!(err.to_string().contains("safety"));
    }

    #[test]
    fn test_extract_malformed() {
        assert!(matches!(
            GeminiBackend::extract_text(&json!({})),
            Err(CraftError::Provider { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let out = format!("{:?}", GeminiBackend::new().with_api_key("AIzaSyVerySecret"));
        assert!(!out.contains("VerySecret"));
    }
}
