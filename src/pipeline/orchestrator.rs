//! Research/judge feedback loop.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::state::{Decision, IterationState, LoopState};
use crate::agents::{CourseDocument, ResearchFindings, Roles, Topic};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, RoleKind, Service};
use crate::events::{EventSink, PipelineEvent};

/// Terminal success of a run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub document: CourseDocument,
    /// Set when the last verdict failed and the findings were accepted only
    /// because the iteration budget was spent.
    pub forced_acceptance: bool,
    /// Research/judge rounds performed.
    pub rounds: usize,
}

/// Loop position, carrying the artifact the next step needs.
enum Stage {
    Researching,
    Judging(ResearchFindings),
    Building {
        findings: ResearchFindings,
        forced: bool,
    },
}

impl Stage {
    fn state(&self) -> LoopState {
        match self {
            Stage::Researching => LoopState::Researching,
            Stage::Judging(_) => LoopState::Judging,
            Stage::Building { .. } => LoopState::Building,
        }
    }
}

/// Drives Researcher ⇄ Judge until a pass or budget exhaustion, then the
/// ContentBuilder.
///
/// The orchestrator holds no per-run state, so one instance serves any number
/// of concurrent runs.
pub struct Orchestrator {
    roles: Roles,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(roles: Roles, config: PipelineConfig) -> Self {
        Self { roles, config }
    }

    /// Run with a fresh id, no event stream and no external cancellation.
    pub async fn run_topic(&self, topic: &str) -> Result<RunOutcome, PipelineError> {
        self.run(Uuid::new_v4(), topic, &EventSink::disabled(), &CancellationToken::new())
            .await
    }

    /// Execute one run to completion.
    ///
    /// Exactly one terminal event (`done` or `error`) is emitted, matching the
    /// returned result.
    pub async fn run(
        &self,
        run_id: Uuid,
        topic: &str,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, PipelineError> {
        let span = tracing::info_span!("run", run_id = %run_id);
        let result = self.drive(topic, events, cancel).instrument(span.clone()).await;

        span.in_scope(|| match &result {
            Ok(outcome) => {
                tracing::info!(
                    state = %LoopState::Done,
                    rounds = outcome.rounds,
                    forced = outcome.forced_acceptance,
                    "Run finished"
                );
                events.emit(PipelineEvent::Done {
                    forced: outcome.forced_acceptance,
                    rounds: outcome.rounds,
                    document: outcome.document.as_markdown().to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(state = %LoopState::Aborted, kind = %e.kind(), error = %e, "Run aborted");
                events.emit(PipelineEvent::Error {
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        });
        result
    }

    async fn drive(
        &self,
        raw_topic: &str,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, PipelineError> {
        tracing::debug!(state = %LoopState::Init, "Validating topic");
        let topic = Topic::parse(raw_topic)?;
        let max_iterations = self.config.max_iterations.max(1);
        let mut iteration = IterationState::new();
        let mut stage = Stage::Researching;

        loop {
            tracing::debug!(state = %stage.state(), round = iteration.rounds(), "Loop transition");

            stage = match stage {
                Stage::Researching => {
                    let round = iteration.start_round();
                    events.emit(PipelineEvent::Researching { round });
                    tracing::info!(round, refined = iteration.pending_feedback().is_some(), "Researching");

                    let feedback = iteration.pending_feedback();
                    let findings = self
                        .call(RoleKind::Researcher, events, cancel, || {
                            self.roles.researcher.research(&topic, feedback)
                        })
                        .await?;
                    Stage::Judging(findings)
                }

                Stage::Judging(findings) => {
                    let round = iteration.rounds();
                    events.emit(PipelineEvent::Judging { round });

                    let verdict = self
                        .call(RoleKind::Judge, events, cancel, || {
                            self.roles.judge.evaluate(&topic, &findings)
                        })
                        .await?;

                    tracing::info!(round, status = %verdict.status, "Verdict received");
                    events.emit(PipelineEvent::Verdict {
                        round,
                        status: verdict.status,
                        feedback: verdict.feedback.clone(),
                    });

                    match iteration.decide(verdict, max_iterations) {
                        Decision::Accept => Stage::Building {
                            findings,
                            forced: false,
                        },
                        Decision::Retry => Stage::Researching,
                        Decision::ForceAccept => {
                            tracing::warn!(
                                rounds = round,
                                max_iterations,
                                "Iteration budget exhausted; accepting last findings"
                            );
                            Stage::Building {
                                findings,
                                forced: true,
                            }
                        }
                    }
                }

                Stage::Building { findings, forced } => {
                    events.emit(PipelineEvent::Building { forced });

                    let document = self
                        .call(RoleKind::ContentBuilder, events, cancel, || {
                            self.roles.content_builder.build(&topic, &findings)
                        })
                        .await?;

                    return Ok(RunOutcome {
                        document,
                        forced_acceptance: forced,
                        rounds: iteration.rounds(),
                    });
                }
            };
        }
    }

    /// One role call under the per-call timeout, the retry budget and the
    /// run's cancellation token.
    async fn call<T, F, Fut>(
        &self,
        role: RoleKind,
        events: &EventSink,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let policy = &self.config.retry;
        let timeout = self.config.per_call_timeout;
        let mut failures: u32 = 0;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                outcome = tokio::time::timeout(timeout, op()) => outcome,
            };

            let error = match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => PipelineError::timed_out(Service::Completion, timeout),
            };

            failures += 1;
            if !error.is_retryable() {
                tracing::warn!(role = %role, error = %error, "Role call failed");
                return Err(error);
            }
            if failures >= policy.max_attempts() {
                tracing::warn!(
                    role = %role,
                    attempts = failures,
                    error = %error,
                    "Retry budget exhausted"
                );
                return Err(error);
            }

            let delay = policy.backoff.jittered_delay_for(failures - 1);
            tracing::warn!(
                role = %role,
                attempt = failures + 1,
                max_attempts = policy.max_attempts(),
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying role call"
            );
            events.emit(PipelineEvent::Retrying {
                role,
                attempt: failures + 1,
                delay_ms: delay.as_millis() as u64,
                reason: error.to_string(),
            });

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
