//! Tools available to the researcher.

mod web;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

pub use web::DuckDuckGoSearch;

/// A single ranked search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Web search capability.
#[async_trait]
pub trait SearchTool: Send + Sync {
    fn name(&self) -> &str;

    /// Run a query and return hits, best first.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ServiceError>;
}
