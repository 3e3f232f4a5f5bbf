//! Loop-local bookkeeping for one run.

use std::fmt;

use serde::Serialize;

use crate::agents::{JudgeVerdict, VerdictStatus};

/// Observable state of the orchestration loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Init,
    Researching,
    Judging,
    Building,
    Done,
    Aborted,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Researching => "researching",
            Self::Judging => "judging",
            Self::Building => "building",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// What the loop does after a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Verdict passed; build from the current findings.
    Accept,
    /// Verdict failed and budget remains; research again with the feedback.
    Retry,
    /// Verdict failed and the budget is spent; build anyway, flagged.
    ForceAccept,
}

/// Round counter plus the feedback of every failed verdict, oldest first.
#[derive(Debug, Default)]
pub struct IterationState {
    rounds: usize,
    feedback_history: Vec<String>,
}

impl IterationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a research round; returns its 1-based number.
    pub fn start_round(&mut self) -> usize {
        self.rounds += 1;
        self.rounds
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Feedback to hand the next research call, if the last verdict failed.
    pub fn pending_feedback(&self) -> Option<&str> {
        self.feedback_history.last().map(String::as_str)
    }

    pub fn feedback_history(&self) -> &[String] {
        &self.feedback_history
    }

    /// Apply a verdict. Only failing feedback is remembered, and only when
    /// another round will consume it.
    pub fn decide(&mut self, verdict: JudgeVerdict, max_iterations: usize) -> Decision {
        match verdict.status {
            VerdictStatus::Pass => Decision::Accept,
            VerdictStatus::Fail if self.rounds < max_iterations => {
                self.feedback_history.push(verdict.feedback);
                Decision::Retry
            }
            VerdictStatus::Fail => Decision::ForceAccept,
        }
    }
}
