//! OpenAI-compatible chat completions client (OpenRouter by default).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ChatMessage, Completion, CompletionRequest, CompletionService, Role, TokenUsage};
use crate::error::ServiceError;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// Completion service backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenRouterClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenRouterClient {
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_messages(request: &CompletionRequest) -> Vec<WireMessage<'_>> {
        std::iter::once(WireMessage {
            role: Role::System,
            content: &request.instruction,
        })
        .chain(request.conversation.iter().map(|m: &ChatMessage| WireMessage {
            role: m.role,
            content: &m.content,
        }))
        .collect()
    }

    fn build_body(request: &CompletionRequest) -> ChatRequest<'_> {
        ChatRequest {
            model: &request.model,
            messages: Self::build_messages(request),
            response_format: request.output_schema.as_ref().map(|s| {
                json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": s.name,
                        "strict": true,
                        "schema": s.schema,
                    }
                })
            }),
        }
    }
}

#[async_trait]
impl CompletionService for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ServiceError> {
        let body = Self::build_body(&request);

        tracing::debug!(
            model = %request.model,
            turns = request.conversation.len(),
            structured = request.output_schema.is_some(),
            "Calling completion service"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status { status, body });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(format!("invalid completion payload: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ServiceError::Decode("no choices in completion response".to_string()))?;

        Ok(Completion {
            content,
            model: parsed.model.unwrap_or(request.model),
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
        })
    }
}
