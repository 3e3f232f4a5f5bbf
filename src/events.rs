//! Status events emitted while a run progresses.
//!
//! Events are an observability side channel: the orchestration loop emits
//! them but never waits on, or branches on, their delivery.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::agents::VerdictStatus;
use crate::error::{ErrorKind, RoleKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A research attempt started. `round` is 1-based.
    Researching { round: usize },
    Judging { round: usize },
    Verdict {
        round: usize,
        status: VerdictStatus,
        feedback: String,
    },
    /// A role call failed transiently and will be re-attempted.
    Retrying {
        role: RoleKind,
        attempt: u32,
        delay_ms: u64,
        reason: String,
    },
    Building { forced: bool },
    Done {
        forced: bool,
        rounds: usize,
        document: String,
    },
    Error { kind: ErrorKind, message: String },
}

impl PipelineEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            PipelineEvent::Researching { .. } => "researching",
            PipelineEvent::Judging { .. } => "judging",
            PipelineEvent::Verdict { .. } => "verdict",
            PipelineEvent::Retrying { .. } => "retrying",
            PipelineEvent::Building { .. } => "building",
            PipelineEvent::Done { .. } => "done",
            PipelineEvent::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::Done { .. } | PipelineEvent::Error { .. })
    }
}

/// An event plus the wall-clock time it was emitted.
#[derive(Debug, Clone, Serialize)]
pub struct TimedEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: PipelineEvent,
}

/// Where a run reports its progress. Cheap to clone; a closed or absent
/// receiver silently drops events.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<TimedEvent>>,
}

impl EventSink {
    /// A sink that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TimedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(TimedEvent {
                at: Utc::now(),
                event,
            });
        }
    }
}
