//! Researcher: search, then synthesize findings.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use super::prompt::{research_prompt, search_queries, RESEARCHER_INSTRUCTION};
use super::types::{ResearchFindings, Topic};
use super::Researcher;
use crate::error::{PipelineError, RoleKind, Service};
use crate::llm::{ChatMessage, CompletionRequest, CompletionService};
use crate::tools::{SearchHit, SearchTool};

/// Researcher backed by a completion service and an optional search tool.
///
/// # Algorithm
/// 1. Build queries from the topic (and the feedback, on retries)
/// 2. Run the searches; failed or slow searches are dropped with a warning
/// 3. Ask the model for a findings summary from topic + feedback + hits
///
/// Without usable hits the summary is synthesized from the topic alone.
pub struct LlmResearcher {
    llm: Arc<dyn CompletionService>,
    search: Option<Arc<dyn SearchTool>>,
    model: String,
    search_timeout: Duration,
    max_hits: usize,
}

impl LlmResearcher {
    pub fn new(
        llm: Arc<dyn CompletionService>,
        model: String,
        search: Option<Arc<dyn SearchTool>>,
    ) -> Self {
        Self {
            llm,
            search,
            model,
            search_timeout: Duration::from_secs(20),
            max_hits: 10,
        }
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    pub fn with_max_hits(mut self, max_hits: usize) -> Self {
        self.max_hits = max_hits;
        self
    }

    async fn gather(&self, topic: &Topic, prior_feedback: Option<&str>) -> Vec<SearchHit> {
        let Some(search) = &self.search else {
            return Vec::new();
        };

        let queries = search_queries(topic, prior_feedback);
        let outcomes = join_all(queries.iter().map(|q| async move {
            let outcome = tokio::time::timeout(self.search_timeout, search.search(q)).await;
            (q, outcome)
        }))
        .await;

        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        for (query, outcome) in outcomes {
            match outcome {
                Ok(Ok(found)) => {
                    for hit in found {
                        let key = if hit.url.is_empty() { hit.title.clone() } else { hit.url.clone() };
                        if seen.insert(key) {
                            hits.push(hit);
                        }
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        tool = search.name(),
                        query = %query,
                        error = %e.into_pipeline(Service::Search),
                        "Search failed; continuing without its results"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        tool = search.name(),
                        query = %query,
                        error = %PipelineError::timed_out(Service::Search, self.search_timeout),
                        "Search timed out; continuing without its results"
                    );
                }
            }
        }

        hits.truncate(self.max_hits);
        if hits.is_empty() {
            tracing::warn!(topic = %topic, "No search results gathered; synthesizing from the topic alone");
        }
        hits
    }
}

#[async_trait]
impl Researcher for LlmResearcher {
    async fn research(
        &self,
        topic: &Topic,
        prior_feedback: Option<&str>,
    ) -> Result<ResearchFindings, PipelineError> {
        let hits = self.gather(topic, prior_feedback).await;

        let request = CompletionRequest {
            model: self.model.clone(),
            instruction: RESEARCHER_INSTRUCTION.to_string(),
            conversation: vec![ChatMessage::user(research_prompt(topic, prior_feedback, &hits))],
            output_schema: None,
        };

        let completion = self
            .llm
            .complete(request)
            .await
            .map_err(|e| e.into_pipeline(Service::Completion))?;

        tracing::debug!(
            model = %completion.model,
            hits = hits.len(),
            refined = prior_feedback.is_some(),
            chars = completion.content.len(),
            "Research synthesized"
        );

        ResearchFindings::new(completion.content)
            .ok_or_else(|| PipelineError::malformed(RoleKind::Researcher, "empty findings"))
    }
}
