//! Scripted roles and services shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use coursewright::agents::{
    ContentBuilder, CourseDocument, Judge, JudgeVerdict, ResearchFindings, Researcher, Roles,
    Topic,
};
use coursewright::config::PipelineConfig;
use coursewright::error::{PipelineError, RoleKind, Service, ServiceError};
use coursewright::events::{PipelineEvent, TimedEvent};
use coursewright::llm::{Completion, CompletionRequest, CompletionService};
use coursewright::retry::{BackoffConfig, RetryPolicy};
use coursewright::tools::{SearchHit, SearchTool};
use tokio::sync::mpsc;

/// Loop config with tiny delays so retry tests stay fast.
pub fn fast_config(max_iterations: usize) -> PipelineConfig {
    PipelineConfig {
        max_iterations,
        per_call_timeout: Duration::from_secs(5),
        retry: RetryPolicy {
            max_retries: 2,
            backoff: BackoffConfig {
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                multiplier: 2.0,
                jitter: 0.0,
            },
        },
        search_enabled: true,
        search_max_results: 5,
    }
}

pub fn unavailable(retryable: bool) -> PipelineError {
    PipelineError::ServiceUnavailable {
        service: Service::Completion,
        message: "HTTP 503 Service Unavailable".to_string(),
        retryable,
    }
}

/// What a scripted role does on a given call.
#[derive(Debug, Clone)]
pub enum Step<T> {
    Return(T),
    Unavailable { retryable: bool },
    Malformed,
    Hang,
}

async fn play<T: Clone>(step: Step<T>, role: RoleKind) -> Result<T, PipelineError> {
    match step {
        Step::Return(value) => Ok(value),
        Step::Unavailable { retryable } => Err(unavailable(retryable)),
        Step::Malformed => Err(PipelineError::malformed(role, "scripted malformed output")),
        Step::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(unavailable(true))
        }
    }
}

/// Pops steps in order; the last step repeats once the script runs out.
struct Script<T> {
    steps: Mutex<Vec<Step<T>>>,
}

impl<T: Clone> Script<T> {
    fn new(steps: Vec<Step<T>>) -> Self {
        assert!(!steps.is_empty(), "script needs at least one step");
        Self {
            steps: Mutex::new(steps),
        }
    }

    fn next(&self) -> Step<T> {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.remove(0)
        } else {
            steps[0].clone()
        }
    }
}

/// Researcher that records the feedback it was given.
pub struct ScriptedResearcher {
    script: Script<()>,
    feedback_seen: Mutex<Vec<Option<String>>>,
    calls: AtomicUsize,
}

impl ScriptedResearcher {
    pub fn ok() -> Self {
        Self::with_steps(vec![Step::Return(())])
    }

    pub fn with_steps(steps: Vec<Step<()>>) -> Self {
        Self {
            script: Script::new(steps),
            feedback_seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn feedback_seen(&self) -> Vec<Option<String>> {
        self.feedback_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Researcher for ScriptedResearcher {
    async fn research(
        &self,
        topic: &Topic,
        prior_feedback: Option<&str>,
    ) -> Result<ResearchFindings, PipelineError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.feedback_seen
            .lock()
            .unwrap()
            .push(prior_feedback.map(str::to_string));
        play(self.script.next(), RoleKind::Researcher).await?;
        Ok(ResearchFindings::new(format!("Findings v{} on {}", n, topic)).unwrap())
    }
}

/// Judge that replays a verdict script and records what it judged.
pub struct ScriptedJudge {
    script: Script<JudgeVerdict>,
    judged: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedJudge {
    pub fn verdicts(verdicts: Vec<JudgeVerdict>) -> Self {
        Self::with_steps(verdicts.into_iter().map(Step::Return).collect())
    }

    pub fn always_fail(feedback: &str) -> Self {
        Self::verdicts(vec![JudgeVerdict::fail(feedback)])
    }

    pub fn always_pass() -> Self {
        Self::verdicts(vec![JudgeVerdict::pass("Sufficient.")])
    }

    pub fn with_steps(steps: Vec<Step<JudgeVerdict>>) -> Self {
        Self {
            script: Script::new(steps),
            judged: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn judged(&self) -> Vec<String> {
        self.judged.lock().unwrap().clone()
    }
}

#[async_trait]
impl Judge for ScriptedJudge {
    async fn evaluate(
        &self,
        _topic: &Topic,
        findings: &ResearchFindings,
    ) -> Result<JudgeVerdict, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.judged.lock().unwrap().push(findings.as_str().to_string());
        play(self.script.next(), RoleKind::Judge).await
    }
}

/// Builder that wraps whatever findings it gets in a fixed document.
pub struct RecordingBuilder {
    script: Script<()>,
    built_from: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl RecordingBuilder {
    pub fn ok() -> Self {
        Self::with_steps(vec![Step::Return(())])
    }

    pub fn with_steps(steps: Vec<Step<()>>) -> Self {
        Self {
            script: Script::new(steps),
            built_from: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn built_from(&self) -> Vec<String> {
        self.built_from.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentBuilder for RecordingBuilder {
    async fn build(
        &self,
        topic: &Topic,
        findings: &ResearchFindings,
    ) -> Result<CourseDocument, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.built_from.lock().unwrap().push(findings.as_str().to_string());
        play(self.script.next(), RoleKind::ContentBuilder).await?;
        Ok(CourseDocument::new(format!(
            "# {}\n\n## Overview\n{}\n\n## Key Points\n- one\n",
            topic,
            findings.as_str()
        )))
    }
}

/// Scripted roles plus handles for inspecting them after a run.
pub struct Harness {
    pub researcher: Arc<ScriptedResearcher>,
    pub judge: Arc<ScriptedJudge>,
    pub builder: Arc<RecordingBuilder>,
}

impl Harness {
    pub fn new(researcher: ScriptedResearcher, judge: ScriptedJudge, builder: RecordingBuilder) -> Self {
        Self {
            researcher: Arc::new(researcher),
            judge: Arc::new(judge),
            builder: Arc::new(builder),
        }
    }

    pub fn with_judge(judge: ScriptedJudge) -> Self {
        Self::new(ScriptedResearcher::ok(), judge, RecordingBuilder::ok())
    }

    pub fn roles(&self) -> Roles {
        Roles {
            researcher: self.researcher.clone(),
            judge: self.judge.clone(),
            content_builder: self.builder.clone(),
        }
    }
}

/// Everything currently queued on an event receiver.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<TimedEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(timed) = rx.try_recv() {
        events.push(timed.event);
    }
    events
}

pub fn names(events: &[PipelineEvent]) -> Vec<&'static str> {
    events.iter().map(PipelineEvent::event_name).collect()
}

/// Completion service answering by role instruction, deterministic per input.
pub struct StubCompletion {
    pub requests: Mutex<Vec<CompletionRequest>>,
    judge_reply: String,
}

impl StubCompletion {
    pub fn passing() -> Self {
        Self::with_judge_reply(r#"{"status":"pass","feedback":"Covers the topic."}"#)
    }

    pub fn with_judge_reply(reply: &str) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            judge_reply: reply.to_string(),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for StubCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ServiceError> {
        let content = if request.output_schema.is_some() {
            self.judge_reply.clone()
        } else if request.instruction.contains("course creator") {
            "```markdown\n# Roman Aqueducts\n\n## Origins\n- Aqua Appia, 312 BC\n\n## Engineering\n- Gravity flow\n```".to_string()
        } else {
            "The Romans built eleven aqueducts feeding the city.".to_string()
        };
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        Ok(Completion {
            content,
            model,
            usage: None,
        })
    }
}

/// Search tool that always fails.
pub struct FailingSearch {
    pub calls: AtomicUsize,
}

impl FailingSearch {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SearchTool for FailingSearch {
    fn name(&self) -> &str {
        "failing_search"
    }

    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ServiceError::Decode("search backend exploded".to_string()))
    }
}

/// Search tool returning the same hits for every query.
pub struct StaticSearch {
    pub hits: Vec<SearchHit>,
    pub queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SearchTool for StaticSearch {
    fn name(&self) -> &str {
        "static_search"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ServiceError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.hits.clone())
    }
}
