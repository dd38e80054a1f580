//! Lifecycle events emitted by the correction loop.
//!
//! Provides an optional, non-intrusive way to observe a correction run:
//! implement [`EventHandler`] (or wrap a closure in [`FnEventHandler`]) to
//! drive progress output or collect statistics. Everything works without a
//! handler; the loop also logs the same milestones through `tracing`.

use crate::solution::SolutionStatus;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Event {
    /// A DIAGNOSE/CORRECT/RUN pass is starting.
    PassStart {
        solution: String,
        /// 1-indexed pass number.
        iteration: u32,
    },
    /// A component file was overwritten with a corrected version.
    ComponentRevised { solution: String, component: String },
    /// The consultant replied `NO` for a component.
    ComponentUnchanged { solution: String, component: String },
    /// The reply was neither `NO` nor a fenced block.
    ReplyUnparseable { solution: String, component: String },
    /// The judge (or single provider) failed for a component.
    ConsultFailed {
        solution: String,
        component: String,
        reason: String,
    },
    /// One ensemble member failed and was left out of the reply set.
    ProviderFailed { provider: String, reason: String },
    /// The executor finished a run.
    RunFinished {
        solution: String,
        status: SolutionStatus,
    },
}

/// Handler for correction lifecycle events.
///
/// # Example
///
/// ```
/// use solution_craft::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         match event {
///             Event::PassStart { iteration, .. } => println!("pass {}", iteration),
///             Event::RunFinished { status, .. } => println!("run: {}", status),
///             _ => {}
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: Event);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(ref h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
///
/// # Example
///
/// ```
/// use solution_craft::events::{Event, FnEventHandler};
/// use std::sync::Arc;
///
/// let handler = Arc::new(FnEventHandler(|event: Event| {
///     if let Event::ComponentRevised { component, .. } = event {
///         println!("revised {}", component);
///     }
/// }));
/// ```
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closure_handler_receives_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: Option<Arc<dyn EventHandler>> = Some(Arc::new(FnEventHandler(move |e| {
            sink.lock().unwrap().push(e);
        })));

        emit(
            &handler,
            Event::PassStart {
                solution: "calc".into(),
                iteration: 1,
            },
        );
        emit(&None, Event::ProviderFailed {
            provider: "x".into(),
            reason: "y".into(),
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], Event::PassStart { iteration: 1, .. }));
    }
}
