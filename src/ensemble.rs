//! Concurrent fan-out of one request to every available provider.
//!
//! [`EnsembleConnector::query`] starts one call per credentialed provider and
//! waits for all of them (no early cancellation, no first-success racing).
//! Each call's outcome is captured individually, so one provider failing
//! never affects the others: the reply set simply has one entry fewer, and
//! the failure is reported alongside it.

use crate::client::Provider;
use crate::error::CraftError;
use futures::future::join_all;
use tracing::{debug, info, warn};

/// One successful provider reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReply {
    pub provider: String,
    pub text: String,
}

/// One provider call that failed.
#[derive(Debug)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: CraftError,
}

/// The outcome of one ensemble request.
#[derive(Debug, Default)]
pub struct ReplySet {
    /// Successful replies, at most one per provider.
    pub replies: Vec<ProviderReply>,
    /// Providers whose call failed. They have no entry in `replies`.
    pub failures: Vec<ProviderFailure>,
    /// Providers skipped without a call because no credential is configured.
    pub skipped: Vec<String>,
}

impl ReplySet {
    pub fn len(&self) -> usize {
        self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }

    /// Reply text from `provider`, if it succeeded.
    pub fn get(&self, provider: &str) -> Option<&str> {
        self.replies
            .iter()
            .find(|r| r.provider == provider)
            .map(|r| r.text.as_str())
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.replies.iter().map(|r| r.provider.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnsembleConnector {
    providers: Vec<Provider>,
}

impl EnsembleConnector {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Number of providers with a configured credential.
    pub fn available(&self) -> usize {
        self.providers.iter().filter(|p| p.is_available()).count()
    }

    /// Send `(instructions, prompt)` to every available provider concurrently.
    ///
    /// Never fails. With no available provider, no call is made and the
    /// returned set is empty.
    pub async fn query(&self, instructions: &str, prompt: &str) -> ReplySet {
        let mut set = ReplySet::default();

        let (active, idle): (Vec<&Provider>, Vec<&Provider>) =
            self.providers.iter().partition(|p| p.is_available());
        for p in idle {
            debug!(provider = %p.id(), "no credential, skipping");
            set.skipped.push(p.id().to_string());
        }
        if active.is_empty() {
            warn!("no credentialed provider available");
            return set;
        }

        let calls = active.into_iter().map(|p| async move {
            let outcome = p.complete(instructions, prompt).await;
            (p.id().to_string(), outcome)
        });

        for (provider, outcome) in join_all(calls).await {
            match outcome {
                Ok(text) => set.replies.push(ProviderReply { provider, text }),
                Err(error) => {
                    warn!(provider = %provider, error = %error, "provider call failed");
                    set.failures.push(ProviderFailure { provider, error });
                }
            }
        }

        info!(
            replies = set.replies.len(),
            failures = set.failures.len(),
            skipped = set.skipped.len(),
            "ensemble query complete"
        );
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    #[tokio::test]
    async fn all_providers_reply() {
        let ensemble = EnsembleConnector::new(vec![
            Provider::mock("a", MockBackend::fixed("reply a")),
            Provider::mock("b", MockBackend::fixed("reply b")),
        ]);
        let set = ensemble.query("i", "p").await;
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("a"), Some("reply a"));
        assert_eq!(set.get("b"), Some("reply b"));
        assert!(set.failures.is_empty());
    }

    #[tokio::test]
    async fn one_failure_leaves_the_rest() {
        let ensemble = EnsembleConnector::new(vec![
            Provider::mock("a", MockBackend::fixed("reply a")),
            Provider::mock("b", MockBackend::failing("503 upstream")),
            Provider::mock("c", MockBackend::fixed("reply c")),
        ]);
        let set = ensemble.query("i", "p").await;
        assert_eq!(set.len(), 2);
        assert!(set.get("b").is_none());
        assert_eq!(set.failures.len(), 1);
        assert_eq!(set.failures[0].provider, "b");
        assert!(matches!(set.failures[0].error, CraftError::Provider { .. }));
    }

    #[tokio::test]
    async fn uncredentialed_providers_are_not_called() {
        let ensemble = EnsembleConnector::new(vec![
            Provider::mock("a", MockBackend::fixed("x").without_credential()),
            Provider::mock("b", MockBackend::fixed("y").without_credential()),
        ]);
        assert_eq!(ensemble.available(), 0);
        let set = ensemble.query("i", "p").await;
        assert!(set.is_empty());
        assert!(set.failures.is_empty());
        assert_eq!(set.skipped, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn no_providers_is_empty_set() {
        let set = EnsembleConnector::default().query("i", "p").await;
        assert!(set.is_empty());
        assert_eq!(set.providers().count(), 0);
    }
}
