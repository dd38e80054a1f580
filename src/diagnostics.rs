//! Per-component and per-pass records of a correction run.
//!
//! [`PassReport`] records what each component's consultation produced during
//! one DIAGNOSE/CORRECT/RUN pass and the status the following run ended in.
//! [`LoopOutcome`] collects the passes and the reason the loop stopped.

use crate::output_parser::FenceRule;
use crate::solution::SolutionStatus;

/// What happened to one component during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentOutcome {
    /// The file was replaced with extracted content.
    Revised { rule: FenceRule },
    /// The reply was `NO`.
    NoChange,
    /// The reply was neither `NO` nor a fenced block. The file is untouched.
    Unparseable,
    /// The judge or provider failed. The file is untouched.
    ConsultFailed(String),
    /// Extraction succeeded but the file could not be written.
    WriteFailed(String),
}

impl ComponentOutcome {
    pub fn is_revised(&self) -> bool {
        matches!(self, ComponentOutcome::Revised { .. })
    }
}

/// One DIAGNOSE/CORRECT/RUN pass.
#[derive(Debug, Clone)]
pub struct PassReport {
    /// 1-indexed.
    pub iteration: u32,
    /// `(name.ext, outcome)` in component order.
    pub outcomes: Vec<(String, ComponentOutcome)>,
    /// Solution status after the pass's run. `None` for passes that do not
    /// run the solution (feature revision, targeted correction).
    pub status_after: Option<SolutionStatus>,
}

impl PassReport {
    pub fn new(iteration: u32) -> Self {
        Self {
            iteration,
            outcomes: Vec::new(),
            status_after: None,
        }
    }

    pub fn revised(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_revised()).count()
    }

    pub fn outcome(&self, file_name: &str) -> Option<&ComponentOutcome> {
        self.outcomes
            .iter()
            .find(|(f, _)| f == file_name)
            .map(|(_, o)| o)
    }
}

/// Why the correction loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    /// The first run succeeded. No pass was made.
    AlreadySucceeded,
    /// The first run ended neither in SUCCESS nor ERROR. Nothing to correct.
    NotApplicable,
    /// A pass ended with a successful run.
    Succeeded,
    /// Every allowed pass ran and the solution is still in ERROR.
    BudgetExhausted,
    /// The solution's execution environment does not exist.
    EnvironmentMissing,
}

#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub status: LoopStatus,
    /// Number of passes made. `0` when the first run already decided the
    /// outcome.
    pub iterations: u32,
    pub passes: Vec<PassReport>,
}

impl LoopOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(
            self.status,
            LoopStatus::AlreadySucceeded | LoopStatus::Succeeded
        )
    }
}
