//! Parse-and-validate step for the judge's structured reply.
//!
//! The reply must be a JSON object with exactly two fields, `status`
//! (`"pass"` or `"fail"`) and `feedback` (string). One surrounding Markdown
//! code fence is stripped; nothing else is repaired.

use serde_json::{json, Value};

use super::types::JudgeVerdict;
use crate::error::{PipelineError, RoleKind};
use crate::llm::OutputSchema;

pub const VERDICT_SCHEMA_NAME: &str = "judge_verdict";

/// Schema sent to the completion service alongside the judge instruction.
pub fn verdict_schema() -> OutputSchema {
    OutputSchema {
        name: VERDICT_SCHEMA_NAME.to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "enum": ["pass", "fail"],
                    "description": "Whether the research is sufficient ('pass') or needs more work ('fail')."
                },
                "feedback": {
                    "type": "string",
                    "description": "What is missing or needs clarification if status is 'fail'. If 'pass', a brief confirmation."
                }
            },
            "required": ["status", "feedback"],
            "additionalProperties": false
        }),
    }
}

/// Validate raw model output into a [`JudgeVerdict`].
pub fn parse_verdict(raw: &str) -> Result<JudgeVerdict, PipelineError> {
    let body = strip_code_fence(raw.trim());

    let value: Value = serde_json::from_str(body)
        .map_err(|e| PipelineError::malformed(RoleKind::Judge, format!("not valid JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| PipelineError::malformed(RoleKind::Judge, "expected a JSON object"))?;

    for field in ["status", "feedback"] {
        if !object.contains_key(field) {
            return Err(PipelineError::malformed(
                RoleKind::Judge,
                format!("missing field `{}`", field),
            ));
        }
    }

    // Field-level problems (unknown keys, bad enum values, wrong types) are
    // reported by serde with the offending name.
    serde_json::from_value(value)
        .map_err(|e| PipelineError::malformed(RoleKind::Judge, e.to_string()))
}

/// Remove one ```` ``` ```` / ```` ```json ```` fence wrapping the whole reply.
///
/// A reply that merely starts and ends with separate code blocks is left
/// alone: without a `markdown`/`json` info string, the body must contain no
/// other fence.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = rest.trim_end().strip_suffix("```") else {
        return text;
    };

    // Split off the info string (`json`, `markdown`, ...) on the opening line.
    let (info, body) = match inner.split_once('\n') {
        Some((info, body)) if !info.trim().contains(' ') => (info.trim(), body),
        _ => ("", inner),
    };

    let wraps_reply = matches!(
        info.to_ascii_lowercase().as_str(),
        "markdown" | "md" | "json"
    ) || !body.lines().any(|l| l.trim_start().starts_with("```"));

    if wraps_reply {
        body.trim()
    } else {
        text
    }
}
