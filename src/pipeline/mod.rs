//! Orchestration of a single course-building run.
//!
//! The loop follows a small state machine:
//! 1. Validate the topic (`Init`)
//! 2. Research, then judge the findings
//! 3. On a failing verdict, research again with the judge's feedback until
//!    the iteration budget is spent
//! 4. Build the course document from the accepted findings
//!
//! Any unretryable failure aborts the run without a document.

mod orchestrator;
mod state;

pub use orchestrator::{Orchestrator, RunOutcome};
pub use state::{Decision, IterationState, LoopState};
