//! The run/diagnose/correct loop.
//!
//! ```text
//!   RUN ──SUCCESS──────────────────────────────► STOP (AlreadySucceeded)
//!    │
//!  ERROR
//!    ▼
//!  DIAGNOSE ─► CORRECT (each component once) ─► RUN ─SUCCESS─► STOP (Succeeded)
//!    ▲                                            │
//!    └────────────── ERROR, passes left ◄─────────┘
//!                                                 │
//!                      ERROR, budget spent ───────► STOP (BudgetExhausted)
//! ```
//!
//! A component's file is written only after a complete replacement has been
//! extracted from the reply. A `NO` reply, an unparseable reply and a failed
//! consultation all leave the component untouched and the pass continues
//! with the next component.

use crate::config::CraftConfig;
use crate::decision::Consultant;
use crate::diagnostics::{ComponentOutcome, LoopOutcome, LoopStatus, PassReport};
use crate::error::{CraftError, Result};
use crate::events::{emit, Event, EventHandler};
use crate::executor::Executor;
use crate::output_parser::{parse_reply, ReplyOutcome};
use crate::prompt;
use crate::solution::{Solution, SolutionStatus};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

pub struct CorrectionLoop {
    consultant: Consultant,
    executor: Executor,
    max_iterations: u32,
    user_instructions: Option<String>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl std::fmt::Debug for CorrectionLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrectionLoop")
            .field("consultant", &self.consultant)
            .field("executor", &self.executor)
            .field("max_iterations", &self.max_iterations)
            .field("has_user_instructions", &self.user_instructions.is_some())
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

impl CorrectionLoop {
    pub fn new(consultant: Consultant, executor: Executor) -> Self {
        Self {
            consultant,
            executor,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            user_instructions: None,
            event_handler: None,
        }
    }

    /// Ensemble of every configured provider, judged by the configured judge.
    pub fn from_config(config: &CraftConfig) -> Self {
        Self::new(
            Consultant::ensemble(config.providers(), config.judge()),
            Executor::new(config.executor.clone()),
        )
        .with_max_iterations(config.max_iterations)
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Guidance appended to every diagnostic prompt.
    pub fn with_user_instructions(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.user_instructions = (!text.trim().is_empty()).then_some(text);
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Run the solution and correct it until it succeeds or the pass budget
    /// is spent.
    ///
    /// Only a solution whose first run ends in ERROR is corrected. Fails only
    /// when the solution has no entry component.
    pub async fn run(&self, solution: &mut Solution) -> Result<LoopOutcome> {
        let mut passes = Vec::new();

        let first = self.execute(solution).await?;
        let early = match first {
            SolutionStatus::Success => Some(LoopStatus::AlreadySucceeded),
            SolutionStatus::Error if !self.executor.has_environment(solution) => {
                Some(LoopStatus::EnvironmentMissing)
            }
            SolutionStatus::Error => None,
            _ => Some(LoopStatus::NotApplicable),
        };
        if let Some(status) = early {
            info!(solution = %solution.name, ?status, "no correction needed");
            return Ok(LoopOutcome {
                status,
                iterations: 0,
                passes,
            });
        }

        for iteration in 1..=self.max_iterations {
            info!(
                solution = %solution.name,
                iteration,
                max = self.max_iterations,
                "correction pass"
            );
            emit(
                &self.event_handler,
                Event::PassStart {
                    solution: solution.name.clone(),
                    iteration,
                },
            );

            let mut report = self.correct_once(solution, iteration).await;
            let status = self.execute(solution).await?;
            report.status_after = Some(status);
            passes.push(report);

            if status == SolutionStatus::Success {
                info!(solution = %solution.name, iteration, "solution corrected");
                return Ok(LoopOutcome {
                    status: LoopStatus::Succeeded,
                    iterations: iteration,
                    passes,
                });
            }
            if !self.executor.has_environment(solution) {
                return Ok(LoopOutcome {
                    status: LoopStatus::EnvironmentMissing,
                    iterations: iteration,
                    passes,
                });
            }
        }

        warn!(
            solution = %solution.name,
            iterations = self.max_iterations,
            "iteration budget exhausted, solution still failing"
        );
        Ok(LoopOutcome {
            status: LoopStatus::BudgetExhausted,
            iterations: self.max_iterations,
            passes,
        })
    }

    /// One DIAGNOSE/CORRECT sweep over every component, without running.
    ///
    /// Every prompt is built from the solution as it was when the sweep
    /// started, so all components are diagnosed against the same code the
    /// transcript came from.
    pub async fn correct_once(&self, solution: &mut Solution, iteration: u32) -> PassReport {
        let snapshot = solution.clone();
        let mut report = PassReport::new(iteration);

        for component in snapshot.components() {
            let file_name = component.file_name();
            let user_prompt =
                prompt::correction_prompt(&snapshot, component, self.user_instructions.as_deref());
            let outcome = self
                .revise(solution, &file_name, prompt::CORRECTION_INSTRUCTIONS, &user_prompt)
                .await;
            report.outcomes.push((file_name, outcome));
        }

        debug!(
            solution = %solution.name,
            iteration,
            revised = report.revised(),
            "correction sweep finished"
        );
        report
    }

    /// Correct the single component `file_name` (`name.ext`) without running.
    ///
    /// `user_instructions` overrides the loop's own guidance for this call.
    pub async fn correct_component(
        &self,
        solution: &mut Solution,
        file_name: &str,
        user_instructions: Option<&str>,
    ) -> Result<ComponentOutcome> {
        let component = solution.component(file_name).ok_or_else(|| {
            CraftError::Other(format!(
                "component '{}' not found in solution '{}'",
                file_name, solution.name
            ))
        })?;
        let guidance = user_instructions.or(self.user_instructions.as_deref());
        let user_prompt = prompt::correction_prompt(solution, component, guidance);
        Ok(self
            .revise(solution, file_name, prompt::CORRECTION_INSTRUCTIONS, &user_prompt)
            .await)
    }

    /// Offer `feature` to every component once. Does not run the solution.
    pub async fn add_feature(&self, solution: &mut Solution, feature: &str) -> Result<PassReport> {
        if feature.trim().is_empty() {
            return Err(CraftError::Other("feature description is empty".into()));
        }
        let snapshot = solution.clone();
        let mut report = PassReport::new(1);
        for component in snapshot.components() {
            let file_name = component.file_name();
            let user_prompt = prompt::feature_prompt(&snapshot, component, feature);
            let outcome = self
                .revise(solution, &file_name, prompt::FEATURE_INSTRUCTIONS, &user_prompt)
                .await;
            report.outcomes.push((file_name, outcome));
        }
        info!(solution = %solution.name, revised = report.revised(), "feature applied");
        Ok(report)
    }

    async fn execute(&self, solution: &mut Solution) -> Result<SolutionStatus> {
        let status = self.executor.run(solution).await?;
        emit(
            &self.event_handler,
            Event::RunFinished {
                solution: solution.name.clone(),
                status,
            },
        );
        Ok(status)
    }

    /// Consult, parse, and write back one component.
    async fn revise(
        &self,
        solution: &mut Solution,
        file_name: &str,
        instructions: &str,
        user_prompt: &str,
    ) -> ComponentOutcome {
        let reply = match self
            .consultant
            .consult(instructions, user_prompt, &self.event_handler)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    component = %file_name,
                    error = %e,
                    "consultation failed, component left unchanged"
                );
                emit(
                    &self.event_handler,
                    Event::ConsultFailed {
                        solution: solution.name.clone(),
                        component: file_name.to_string(),
                        reason: e.to_string(),
                    },
                );
                return ComponentOutcome::ConsultFailed(e.to_string());
            }
        };

        match parse_reply(&reply) {
            ReplyOutcome::NoChange => {
                debug!(component = %file_name, "no change needed");
                emit(
                    &self.event_handler,
                    Event::ComponentUnchanged {
                        solution: solution.name.clone(),
                        component: file_name.to_string(),
                    },
                );
                ComponentOutcome::NoChange
            }
            ReplyOutcome::Unparseable => {
                warn!(component = %file_name, chars = reply.len(), "no fenced block in reply");
                emit(
                    &self.event_handler,
                    Event::ReplyUnparseable {
                        solution: solution.name.clone(),
                        component: file_name.to_string(),
                    },
                );
                ComponentOutcome::Unparseable
            }
            ReplyOutcome::Content(extracted) => {
                match solution.write_component(file_name, &extracted.content) {
                    Ok(()) => {
                        info!(component = %file_name, rule = ?extracted.rule, "component revised");
                        emit(
                            &self.event_handler,
                            Event::ComponentRevised {
                                solution: solution.name.clone(),
                                component: file_name.to_string(),
                            },
                        );
                        ComponentOutcome::Revised {
                            rule: extracted.rule,
                        }
                    }
                    Err(e) => {
                        warn!(component = %file_name, error = %e, "writing component failed");
                        ComponentOutcome::WriteFailed(e.to_string())
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::client::Provider;
    use crate::component::Component;

    fn solution(dir: &std::path::Path) -> Solution {
        let mut s = Solution::new("calc", dir)
            .with_description("Add two numbers.")
            .with_component(Component::new("helper", "py", "def add(a,b): return a+b+"))
            .unwrap()
            .with_component(Component::new("main", "py", "from helper import add\nprint(add(2,2))"))
            .unwrap();
        s.persist_components().unwrap();
        s.status = SolutionStatus::Error;
        s.result_description = "Error:\nSyntaxError\n".into();
        s
    }

    fn looper(replies: Vec<&str>) -> CorrectionLoop {
        let backend = MockBackend::new(replies.into_iter().map(String::from).collect());
        CorrectionLoop::new(
            Consultant::single(Provider::mock("solo", backend)),
            Executor::default(),
        )
    }

    #[tokio::test]
    async fn sweep_applies_each_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = solution(dir.path());
        let l = looper(vec!["```python\ndef add(a,b): return a+b\n```", "NO"]);

        let report = l.correct_once(&mut s, 1).await;
        assert!(report.outcome("helper.py").unwrap().is_revised());
        assert_eq!(report.outcome("main.py"), Some(&ComponentOutcome::NoChange));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("helper.py")).unwrap(),
            "def add(a,b): return a+b"
        );
        assert_eq!(s.component("helper.py").unwrap().content, "def add(a,b): return a+b");
        assert_eq!(
            s.component("main.py").unwrap().content,
            "from helper import add\nprint(add(2,2))"
        );
        assert!(report.status_after.is_none());
    }

    #[tokio::test]
    async fn unparseable_and_failed_replies_leave_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = solution(dir.path());
        let l = looper(vec!["Looks fine to me."]);
        let report = l.correct_once(&mut s, 1).await;
        assert_eq!(report.outcome("helper.py"), Some(&ComponentOutcome::Unparseable));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("helper.py")).unwrap(),
            "def add(a,b): return a+b+"
        );

        let failing = CorrectionLoop::new(
            Consultant::single(Provider::mock("solo", MockBackend::failing("down"))),
            Executor::default(),
        );
        let report = failing.correct_once(&mut s, 2).await;
        assert!(matches!(
            report.outcome("main.py"),
            Some(ComponentOutcome::ConsultFailed(_))
        ));
        assert_eq!(report.revised(), 0);
    }

    #[tokio::test]
    async fn prompts_use_the_pre_sweep_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = solution(dir.path());
        let mock = Arc::new(MockBackend::new(vec![
            "```python\ndef add(a,b): return a+b\n```".into(),
            "NO".into(),
        ]));
        let provider = Provider::new(mock.clone(), reqwest::Client::new(), "http://unused", "m");
        let l = CorrectionLoop::new(Consultant::single(provider), Executor::default());

        l.correct_once(&mut s, 1).await;
        let second = &mock.requests()[1];
        assert!(second.prompt.contains("Review the component 'main.py'"));
        assert!(second.prompt.contains("def add(a,b): return a+b+"));
        assert_eq!(second.system_prompt.as_deref(), Some(prompt::CORRECTION_INSTRUCTIONS));
    }

    #[tokio::test]
    async fn correct_component_targets_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = solution(dir.path());
        let mock = Arc::new(MockBackend::fixed("```\nprint(4)\n```"));
        let provider = Provider::new(mock.clone(), reqwest::Client::new(), "http://unused", "m");
        let l = CorrectionLoop::new(Consultant::single(provider), Executor::default())
            .with_user_instructions("keep it short");

        let outcome = l.correct_component(&mut s, "main.py", None).await.unwrap();
        assert!(outcome.is_revised());
        assert_eq!(mock.calls(), 1);
        assert!(mock.requests()[0].prompt.ends_with("User Instructions:\nkeep it short"));
        assert_eq!(s.component("helper.py").unwrap().content, "def add(a,b): return a+b+");

        let err = l.correct_component(&mut s, "ghost.py", None).await.unwrap_err();
        assert!(matches!(err, CraftError::Other(_)));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn add_feature_offers_every_component() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = solution(dir.path());
        let mock = Arc::new(MockBackend::new(vec![
            "NO".into(),
            "```python\nfrom helper import add\nprint(add(2,2) * 2)\n```".into(),
        ]));
        let provider = Provider::new(mock.clone(), reqwest::Client::new(), "http://unused", "m");
        let l = CorrectionLoop::new(Consultant::single(provider), Executor::default());

        let report = l.add_feature(&mut s, "double the result").await.unwrap();
        assert_eq!(report.revised(), 1);
        assert!(s.component("main.py").unwrap().content.contains("* 2"));
        assert!(mock.requests()[0].prompt.contains("Improvement or issue: double the result"));

        assert!(l.add_feature(&mut s, "  ").await.is_err());
    }
}
