//! Mock backend for testing without a live LLM.
//!
//! [`MockBackend`] returns pre-configured replies in order, so correction
//! loops can be driven deterministically.
//!
//! # Example
//!
//! ```
//! use solution_craft::backend::MockBackend;
//!
//! let mock = MockBackend::new(vec!["NO".to_string()]);
//! let down = MockBackend::failing("connection refused");
//! let unset = MockBackend::fixed("NO").without_credential();
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;

use super::{Backend, LlmRequest, LlmResponse};
use crate::error::Result;
use crate::CraftError;

/// A test backend that returns canned replies in order.
///
/// Cycles back to the beginning when all replies have been consumed. Every
/// request it receives is recorded and can be inspected with
/// [`requests`](Self::requests).
#[derive(Debug)]
pub struct MockBackend {
    responses: Vec<String>,
    failure: Option<String>,
    credential: bool,
    index: AtomicUsize,
    seen: Mutex<Vec<LlmRequest>>,
}

impl MockBackend {
    /// Create a mock backend with the given canned replies.
    ///
    /// An empty list behaves like a provider that answers with empty text.
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            failure: None,
            credential: true,
            index: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns the same reply.
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Create a mock whose every call fails with a transport-style error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(Vec::new())
        }
    }

    /// Report no configured credential. Providers skip such backends.
    pub fn without_credential(mut self) -> Self {
        self.credential = false;
        self
    }

    /// Number of completed calls.
    pub fn calls(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn next_response(&self) -> String {
        if self.responses.is_empty() {
            return String::new();
        }
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.responses.len();
        self.responses[idx].clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn complete(
        &self,
        _client: &Client,
        _base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request.clone());
        }
        if let Some(ref message) = self.failure {
            return Err(CraftError::Other(message.clone()));
        }
        Ok(LlmResponse {
            text: self.next_response(),
            status: 200,
            metadata: None,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn has_credential(&self) -> bool {
        self.credential
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LlmConfig;

    fn request(prompt: &str) -> LlmRequest {
        LlmRequest {
            model: "test".to_string(),
            system_prompt: None,
            prompt: prompt.to_string(),
            config: LlmConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_mock_fixed_response() {
        let mock = MockBackend::fixed("Hello!");
        let resp = mock
            .complete(&Client::new(), "http://unused", &request("hi"))
            .await
            .unwrap();
        assert_eq!(resp.text, "Hello!");
        assert_eq!(resp.status, 200);
    }

    #[tokio::test]
    async fn test_mock_cycles_responses() {
        let mock = MockBackend::new(vec!["first".into(), "second".into()]);
        let client = Client::new();
        let r = request("x");
        let r1 = mock.complete(&client, "http://unused", &r).await.unwrap();
        let r2 = mock.complete(&client, "http://unused", &r).await.unwrap();
        let r3 = mock.complete(&client, "http://unused", &r).await.unwrap();
        assert_eq!(r1.text, "first");
        assert_eq!(r2.text, "second");
        assert_eq!(r3.text, "first");
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_failing_records_request() {
        let mock = MockBackend::failing("boom");
        let err = mock
            .complete(&Client::new(), "http://unused", &request("fix it"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(mock.requests()[0].prompt, "fix it");
    }

    #[test]
    fn test_mock_credential_flag() {
        assert!(MockBackend::fixed("x").has_credential());
        assert!(!MockBackend::fixed("x").without_credential().has_credential());
    }
}
