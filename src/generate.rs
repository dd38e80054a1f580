//! Generate a new solution from a goal description.
//!
//! Two phases: ask for a component plan in manifest syntax, then ask for each
//! planned file in turn, showing the model every file written so far. The
//! files and the descriptor are written only once every component has been
//! generated.

use crate::component::Component;
use crate::decision::Consultant;
use crate::error::{CraftError, Result};
use crate::events::EventHandler;
use crate::manifest::{self, ManifestEntry};
use crate::output_parser::{parse_reply, ReplyOutcome};
use crate::prompt;
use crate::solution::Solution;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_ATTEMPTS: u32 = 3;

pub struct SolutionGenerator {
    consultant: Consultant,
    attempts: u32,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl fmt::Debug for SolutionGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolutionGenerator")
            .field("consultant", &self.consultant)
            .field("attempts", &self.attempts)
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

impl SolutionGenerator {
    pub fn new(consultant: Consultant) -> Self {
        Self {
            consultant,
            attempts: DEFAULT_ATTEMPTS,
            event_handler: None,
        }
    }

    /// Tries per component before giving up. Clamped to at least 1.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Receives `ProviderFailed` events from ensemble consultations.
    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Plan, write and persist a solution named `name` in `folder`.
    ///
    /// Returns a PENDING solution. Nothing is written when any step fails.
    pub async fn generate(&self, name: &str, description: &str, folder: &Path) -> Result<Solution> {
        let entries = self.plan(name, description).await?;
        info!(solution = %name, components = entries.len(), "component plan ready");

        let mut solution = Solution::new(name, folder).with_description(description);
        for entry in &entries {
            let component = self.write_one(&solution, entry).await?;
            solution.add_component(component)?;
        }

        manifest::save(&solution)?;
        info!(solution = %name, folder = %folder.display(), "solution generated");
        Ok(solution)
    }

    async fn plan(&self, name: &str, description: &str) -> Result<Vec<ManifestEntry>> {
        let reply = self
            .consultant
            .consult(
                prompt::PLAN_INSTRUCTIONS,
                &prompt::plan_prompt(name, description),
                &self.event_handler,
            )
            .await?;
        let plan = manifest::parse(&reply);
        if plan.entries.is_empty() {
            return Err(CraftError::Manifest(format!(
                "plan for '{}' names no components",
                name
            )));
        }
        if let Some(bad) = plan
            .entries
            .iter()
            .find(|e| !Component::is_plain_file_name(&e.file_name()))
        {
            return Err(CraftError::Manifest(format!(
                "plan for '{}' names file '{}' outside the solution folder",
                name,
                bad.file_name()
            )));
        }
        Ok(plan.entries)
    }

    async fn write_one(&self, solution: &Solution, entry: &ManifestEntry) -> Result<Component> {
        let file_name = entry.file_name();
        let user_prompt = prompt::component_prompt(
            &solution.name,
            &solution.description,
            &entry.description,
            &file_name,
            solution.components(),
        );

        for attempt in 1..=self.attempts {
            let reply = match self
                .consultant
                .consult(prompt::COMPONENT_INSTRUCTIONS, &user_prompt, &self.event_handler)
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    warn!(component = %file_name, attempt, error = %e, "component request failed");
                    continue;
                }
            };
            match parse_reply(&reply) {
                ReplyOutcome::Content(extracted) => {
                    debug!(
                        component = %file_name,
                        attempt,
                        rule = ?extracted.rule,
                        "component written"
                    );
                    return Ok(Component::new(
                        entry.name.clone(),
                        entry.extension.clone(),
                        extracted.content,
                    )
                    .with_description(entry.description.clone()));
                }
                _ => warn!(component = %file_name, attempt, "no fenced content in reply"),
            }
        }

        Err(CraftError::Other(format!(
            "could not generate component '{}' after {} attempts",
            file_name, self.attempts
        )))
    }
}
