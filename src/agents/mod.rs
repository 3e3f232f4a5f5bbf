//! The three cooperating roles.
//!
//! Each role is a trait so the orchestration loop can be driven by the
//! LLM-backed implementations in production and by scripted stand-ins in
//! tests. Roles never retry: failures go back to the loop unmodified.

mod content_builder;
mod judge;
pub mod prompt;
mod researcher;
pub mod types;
pub mod verdict;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{PipelineError, RoleKind, ServiceError};
use crate::llm::{CompletionService, OpenRouterClient};
use crate::tools::{DuckDuckGoSearch, SearchTool};

pub use content_builder::LlmContentBuilder;
pub use judge::LlmJudge;
pub use researcher::LlmResearcher;
pub use types::{CourseDocument, JudgeVerdict, ResearchFindings, Topic, VerdictStatus};

#[async_trait]
pub trait Researcher: Send + Sync {
    /// Produce findings for `topic`. `prior_feedback` is set only on retries.
    async fn research(
        &self,
        topic: &Topic,
        prior_feedback: Option<&str>,
    ) -> Result<ResearchFindings, PipelineError>;
}

#[async_trait]
pub trait Judge: Send + Sync {
    async fn evaluate(
        &self,
        topic: &Topic,
        findings: &ResearchFindings,
    ) -> Result<JudgeVerdict, PipelineError>;
}

#[async_trait]
pub trait ContentBuilder: Send + Sync {
    async fn build(
        &self,
        topic: &Topic,
        findings: &ResearchFindings,
    ) -> Result<CourseDocument, PipelineError>;
}

/// One instance of each role, shared by every run.
#[derive(Clone)]
pub struct Roles {
    pub researcher: Arc<dyn Researcher>,
    pub judge: Arc<dyn Judge>,
    pub content_builder: Arc<dyn ContentBuilder>,
}

impl Roles {
    /// Wire the LLM-backed roles over a shared completion service.
    pub fn with_services(
        config: &Config,
        llm: Arc<dyn CompletionService>,
        search: Option<Arc<dyn SearchTool>>,
    ) -> Self {
        let search = search.filter(|_| config.pipeline.search_enabled);
        if search.is_none() {
            tracing::info!("Web search disabled; researcher runs in degraded mode");
        }

        let search_timeout = (config.pipeline.per_call_timeout / 4).max(std::time::Duration::from_secs(1));
        let models = &config.models;
        let researcher = LlmResearcher::new(
            Arc::clone(&llm),
            models.for_role(RoleKind::Researcher).to_string(),
            search,
        )
        .with_search_timeout(search_timeout)
        .with_max_hits(config.pipeline.search_max_results.saturating_mul(2).max(1));

        Self {
            researcher: Arc::new(researcher),
            judge: Arc::new(LlmJudge::new(
                Arc::clone(&llm),
                models.for_role(RoleKind::Judge).to_string(),
            )),
            content_builder: Arc::new(LlmContentBuilder::new(
                llm,
                models.for_role(RoleKind::ContentBuilder).to_string(),
            )),
        }
    }

    /// Production wiring: OpenAI-compatible completions plus DuckDuckGo search.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let llm: Arc<dyn CompletionService> = Arc::new(OpenRouterClient::with_base_url(
            config.api_key.clone(),
            config.completion_base_url.clone(),
        ));
        let search: Option<Arc<dyn SearchTool>> = if config.pipeline.search_enabled {
            Some(Arc::new(DuckDuckGoSearch::new(config.pipeline.search_max_results)?))
        } else {
            None
        };
        Ok(Self::with_services(config, llm, search))
    }
}
