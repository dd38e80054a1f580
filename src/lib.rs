//! # Solution Craft
//!
//! Generate, run and self-repair multi-file programs with one or more LLM
//! providers.
//!
//! A [`Solution`] is an ordered set of [`Component`] files whose last
//! component (`main.py`) is the entry point. The [`Executor`] runs it in its
//! own prepared environment and records a transcript. When the run fails,
//! the [`CorrectionLoop`] shows every component plus the transcript to the
//! [`Consultant`], writes back whatever replacement the reply carries, and
//! runs again, up to a fixed number of passes.
//!
//! ## Core Concepts
//!
//! - **[`Provider`]**: one LLM vendor behind the object-safe
//!   [`Backend`](backend::Backend) trait (OpenAI, Gemini, Anthropic, mock).
//! - **[`EnsembleConnector`]**: fans one request out to every credentialed
//!   provider concurrently; failures become typed entries, never aborts.
//! - **[`DecisionSynthesizer`]**: a judge provider that generates (no
//!   replies), refines (one reply) or synthesizes (several replies).
//! - **[`output_parser`]**: pulls one fenced block out of a noisy reply, or
//!   recognises the `NO` (no change) signal.
//! - **[`CraftConfig`]**: explicit configuration, read once from the
//!   environment or built in code.
//!
//! ## Quick Start
//!
//! ```no_run
//! use solution_craft::{manifest, CorrectionLoop, CraftConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     solution_craft::logging::init(false);
//!     let config = CraftConfig::from_env()?;
//!
//!     let mut solution = manifest::load(Path::new("solutions/calc"), "calc")?;
//!     let outcome = CorrectionLoop::from_config(&config)
//!         .run(&mut solution)
//!         .await?;
//!
//!     println!("{:?} after {} passes: {}", outcome.status, outcome.iterations, solution);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod client;
pub mod component;
pub mod config;
pub mod correction;
pub mod decision;
pub mod diagnostics;
pub mod ensemble;
pub mod error;
pub mod events;
pub mod executor;
pub mod generate;
pub mod language;
pub mod logging;
pub mod manifest;
pub mod output_parser;
pub mod prompt;
pub mod solution;

pub use backend::{AnthropicBackend, BackoffConfig, GeminiBackend, MockBackend, OpenAiBackend};
pub use client::{LlmConfig, Provider};
pub use component::{Component, ComponentStatus};
pub use config::{CraftConfig, CraftConfigBuilder, ProviderSettings, Vendor};
pub use correction::CorrectionLoop;
pub use decision::{Consultant, DecisionSynthesizer};
pub use diagnostics::{ComponentOutcome, LoopOutcome, LoopStatus, PassReport};
pub use ensemble::{EnsembleConnector, ProviderFailure, ProviderReply, ReplySet};
pub use error::{CraftError, Result};
pub use events::{Event, EventHandler, FnEventHandler};
pub use executor::{ExecutionResult, Executor, ExecutorConfig};
pub use generate::SolutionGenerator;
pub use language::Language;
pub use output_parser::{parse_reply, ReplyOutcome};
pub use solution::{Solution, SolutionStatus};
