//! Judge: structured pass/fail evaluation of findings.

use std::sync::Arc;

use async_trait::async_trait;

use super::prompt::{judge_prompt, JUDGE_INSTRUCTION};
use super::types::{JudgeVerdict, ResearchFindings, Topic};
use super::verdict::{parse_verdict, verdict_schema};
use super::Judge;
use crate::error::{PipelineError, Service};
use crate::llm::{ChatMessage, CompletionRequest, CompletionService};

pub struct LlmJudge {
    llm: Arc<dyn CompletionService>,
    model: String,
}

impl LlmJudge {
    pub fn new(llm: Arc<dyn CompletionService>, model: String) -> Self {
        Self { llm, model }
    }
}

#[async_trait]
impl Judge for LlmJudge {
    async fn evaluate(
        &self,
        topic: &Topic,
        findings: &ResearchFindings,
    ) -> Result<JudgeVerdict, PipelineError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            instruction: JUDGE_INSTRUCTION.to_string(),
            conversation: vec![ChatMessage::user(judge_prompt(topic, findings))],
            output_schema: Some(verdict_schema()),
        };

        let completion = self
            .llm
            .complete(request)
            .await
            .map_err(|e| e.into_pipeline(Service::Completion))?;

        let verdict = parse_verdict(&completion.content)?;
        tracing::debug!(model = %completion.model, status = %verdict.status, "Judge verdict parsed");
        Ok(verdict)
    }
}
