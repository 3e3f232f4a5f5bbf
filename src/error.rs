//! Error types shared by the role adapters and the orchestration loop.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// External dependency a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Completion,
    Search,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completion => write!(f, "completion service"),
            Self::Search => write!(f, "search tool"),
        }
    }
}

/// Which cooperating role produced a result or an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Researcher,
    Judge,
    ContentBuilder,
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Researcher => write!(f, "researcher"),
            Self::Judge => write!(f, "judge"),
            Self::ContentBuilder => write!(f, "content_builder"),
        }
    }
}

/// Coarse classification reported to callers of the run entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    ServiceUnavailable,
    MalformedOutput,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid_input"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::MalformedOutput => write!(f, "malformed_output"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Failure of a pipeline run or of a single role call.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{service} unavailable: {message}")]
    ServiceUnavailable {
        service: Service,
        message: String,
        /// Whether another attempt could plausibly succeed.
        retryable: bool,
    },

    #[error("malformed output from {role}: {message}")]
    MalformedOutput { role: RoleKind, message: String },

    #[error("run cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            Self::MalformedOutput { .. } => ErrorKind::MalformedOutput,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Only transient service failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable { retryable: true, .. })
    }

    pub fn malformed(role: RoleKind, message: impl Into<String>) -> Self {
        Self::MalformedOutput {
            role,
            message: message.into(),
        }
    }

    pub fn timed_out(service: Service, after: std::time::Duration) -> Self {
        Self::ServiceUnavailable {
            service,
            message: format!("timed out after {:.1}s", after.as_secs_f64()),
            retryable: true,
        }
    }
}

/// Transport-level failure talking to an external HTTP service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Transport errors, timeouts, 408, 429 and 5xx are transient; other 4xx are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_builder(),
            Self::Status { status, .. } => {
                status.is_server_error()
                    || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    || *status == reqwest::StatusCode::REQUEST_TIMEOUT
            }
            Self::Decode(_) => false,
        }
    }

    pub fn into_pipeline(self, service: Service) -> PipelineError {
        let retryable = self.is_retryable();
        PipelineError::ServiceUnavailable {
            service,
            message: self.to_string(),
            retryable,
        }
    }
}
