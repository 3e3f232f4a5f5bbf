//! Artifacts passed between the roles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Longest topic accepted, in characters.
pub const MAX_TOPIC_CHARS: usize = 2000;

/// The user's request. Immutable for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic(String);

impl Topic {
    /// Validate and trim a raw topic string.
    pub fn parse(raw: &str) -> Result<Self, PipelineError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::InvalidInput("topic must not be empty".to_string()));
        }
        let chars = trimmed.chars().count();
        if chars > MAX_TOPIC_CHARS {
            return Err(PipelineError::InvalidInput(format!(
                "topic is {} characters long, limit is {}",
                chars, MAX_TOPIC_CHARS
            )));
        }
        if trimmed.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
            return Err(PipelineError::InvalidInput(
                "topic contains control characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Findings summary produced by the researcher. Each retry replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchFindings(String);

impl ResearchFindings {
    /// `None` when the text is blank.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            None
        } else {
            Some(Self(text.trim().to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Pass,
    Fail,
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// The judge's decision on one version of the findings.
///
/// `feedback` only drives further research when `status` is `Fail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JudgeVerdict {
    pub status: VerdictStatus,
    pub feedback: String,
}

impl JudgeVerdict {
    pub fn pass(feedback: impl Into<String>) -> Self {
        Self {
            status: VerdictStatus::Pass,
            feedback: feedback.into(),
        }
    }

    pub fn fail(feedback: impl Into<String>) -> Self {
        Self {
            status: VerdictStatus::Fail,
            feedback: feedback.into(),
        }
    }
}

/// Final Markdown course module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CourseDocument(String);

impl CourseDocument {
    pub fn new(markdown: String) -> Self {
        Self(markdown)
    }

    pub fn as_markdown(&self) -> &str {
        &self.0
    }

    pub fn into_markdown(self) -> String {
        self.0
    }

    /// Text of the first `#` heading.
    pub fn title(&self) -> Option<&str> {
        self.headings(1).next()
    }

    /// `##` headings in document order.
    pub fn table_of_contents(&self) -> Vec<&str> {
        self.headings(2).collect()
    }

    fn headings(&self, level: usize) -> impl Iterator<Item = &str> {
        let mut in_fence = false;
        self.0.lines().filter_map(move |line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") {
                in_fence = !in_fence;
                return None;
            }
            if in_fence {
                return None;
            }
            heading_text(trimmed, level)
        })
    }
}

/// Heading text when `line` is an ATX heading of exactly `level`.
pub(crate) fn heading_text(line: &str, level: usize) -> Option<&str> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes != level {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with(' ') {
        return None;
    }
    let text = rest.trim().trim_end_matches('#').trim();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
