//! API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::pipeline::RunOutcome;

/// Request to build a course module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRunRequest {
    /// The user's topic
    pub topic: String,
}

/// Completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    pub run_id: Uuid,

    /// Markdown course document
    pub document: String,

    /// Text of the H1, when present
    pub title: Option<String>,

    /// H2 section headings, in order
    pub table_of_contents: Vec<String>,

    /// True when the findings were accepted only because the iteration budget ran out
    pub forced_acceptance: bool,

    /// Research/judge rounds performed
    pub rounds: usize,
}

impl RunResponse {
    pub fn from_outcome(run_id: Uuid, outcome: RunOutcome) -> Self {
        let title = outcome.document.title().map(str::to_string);
        let table_of_contents = outcome
            .document
            .table_of_contents()
            .into_iter()
            .map(str::to_string)
            .collect();
        Self {
            run_id,
            document: outcome.document.into_markdown(),
            title,
            table_of_contents,
            forced_acceptance: outcome.forced_acceptance,
            rounds: outcome.rounds,
        }
    }
}

/// Error body returned for failed runs.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}
