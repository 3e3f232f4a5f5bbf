//! Content builder: accepted findings to a Markdown course module.

use std::sync::Arc;

use async_trait::async_trait;

use super::prompt::{build_prompt, CONTENT_BUILDER_INSTRUCTION};
use super::types::{heading_text, CourseDocument, ResearchFindings, Topic};
use super::verdict::strip_code_fence;
use super::ContentBuilder;
use crate::error::{PipelineError, RoleKind, Service};
use crate::llm::{ChatMessage, CompletionRequest, CompletionService};

pub struct LlmContentBuilder {
    llm: Arc<dyn CompletionService>,
    model: String,
}

impl LlmContentBuilder {
    pub fn new(llm: Arc<dyn CompletionService>, model: String) -> Self {
        Self { llm, model }
    }
}

#[async_trait]
impl ContentBuilder for LlmContentBuilder {
    async fn build(
        &self,
        topic: &Topic,
        findings: &ResearchFindings,
    ) -> Result<CourseDocument, PipelineError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            instruction: CONTENT_BUILDER_INSTRUCTION.to_string(),
            conversation: vec![ChatMessage::user(build_prompt(topic, findings))],
            output_schema: None,
        };

        let completion = self
            .llm
            .complete(request)
            .await
            .map_err(|e| e.into_pipeline(Service::Completion))?;

        normalize_document(topic, &completion.content)
    }
}

/// Strip a wrapping code fence and make sure the document opens with an H1.
pub(crate) fn normalize_document(topic: &Topic, raw: &str) -> Result<CourseDocument, PipelineError> {
    let body = strip_code_fence(raw.trim()).trim();
    if body.is_empty() {
        return Err(PipelineError::malformed(RoleKind::ContentBuilder, "empty document"));
    }

    let has_title = body
        .lines()
        .find(|l| !l.trim().is_empty())
        .and_then(|first| heading_text(first.trim_start(), 1))
        .is_some();

    let markdown = if has_title {
        format!("{}\n", body)
    } else {
        tracing::debug!("Course document had no H1; adding one from the topic");
        format!("# {}\n\n{}\n", topic, body)
    };

    Ok(CourseDocument::new(markdown))
}
