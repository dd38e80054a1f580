//! Judge step: turn a reply set into one final answer.
//!
//! | Replies | Judge is asked to |
//! |---------|-------------------|
//! | 0 | answer the original request directly |
//! | 1 | return the reply unchanged or improve it |
//! | 2+ | pick the best reply or synthesize a new one |
//!
//! The judge's text is returned as is. Any judge failure becomes
//! [`CraftError::Synthesis`].
//!
//! [`Consultant`] wraps either a single provider or the ensemble plus judge
//! behind one `consult` call.

use crate::client::Provider;
use crate::ensemble::{EnsembleConnector, ReplySet};
use crate::error::{CraftError, Result};
use crate::events::{emit, Event, EventHandler};
use crate::prompt;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct DecisionSynthesizer {
    judge: Provider,
}

impl DecisionSynthesizer {
    pub fn new(judge: Provider) -> Self {
        Self { judge }
    }

    pub fn judge(&self) -> &Provider {
        &self.judge
    }

    pub async fn select_or_synthesize(
        &self,
        instructions: &str,
        user_prompt: &str,
        replies: &ReplySet,
    ) -> Result<String> {
        let pairs: Vec<(&str, &str)> = replies
            .replies
            .iter()
            .map(|r| (r.provider.as_str(), r.text.as_str()))
            .collect();

        let (judge_instructions, judge_prompt, mode) = match pairs.len() {
            0 => (instructions.to_string(), user_prompt.to_string(), "generate"),
            1 => (
                prompt::REFINE_INSTRUCTIONS.to_string(),
                prompt::evaluation_prompt(instructions, user_prompt, &pairs),
                "refine",
            ),
            _ => (
                prompt::SYNTHESIZE_INSTRUCTIONS.to_string(),
                prompt::evaluation_prompt(instructions, user_prompt, &pairs),
                "synthesize",
            ),
        };

        debug!(judge = %self.judge.id(), mode, replies = pairs.len(), "consulting judge");
        self.judge
            .complete(&judge_instructions, &judge_prompt)
            .await
            .map_err(|e| {
                warn!(judge = %self.judge.id(), mode, error = %e, "judge failed");
                CraftError::Synthesis(format!(
                    "{} with judge '{}' failed: {}",
                    mode,
                    self.judge.id(),
                    e
                ))
            })
    }
}

/// Where an answer comes from: one provider, or the ensemble plus a judge.
#[derive(Debug, Clone)]
pub enum Consultant {
    Single(Provider),
    Ensemble {
        ensemble: EnsembleConnector,
        decision: DecisionSynthesizer,
    },
}

impl Consultant {
    pub fn single(provider: Provider) -> Self {
        Consultant::Single(provider)
    }

    pub fn ensemble(members: Vec<Provider>, judge: Provider) -> Self {
        Consultant::Ensemble {
            ensemble: EnsembleConnector::new(members),
            decision: DecisionSynthesizer::new(judge),
        }
    }

    /// Get one final answer for `(instructions, prompt)`.
    ///
    /// Ensemble member failures are reported through `events` and otherwise
    /// absorbed; only a judge failure (or the single provider's failure) is
    /// returned.
    pub async fn consult(
        &self,
        instructions: &str,
        prompt: &str,
        events: &Option<Arc<dyn EventHandler>>,
    ) -> Result<String> {
        match self {
            Consultant::Single(provider) => provider.complete(instructions, prompt).await,
            Consultant::Ensemble { ensemble, decision } => {
                let replies = ensemble.query(instructions, prompt).await;
                for failure in &replies.failures {
                    emit(
                        events,
                        Event::ProviderFailed {
                            provider: failure.provider.clone(),
                            reason: failure.error.to_string(),
                        },
                    );
                }
                decision
                    .select_or_synthesize(instructions, prompt, &replies)
                    .await
            }
        }
    }
}
