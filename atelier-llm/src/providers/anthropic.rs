//! Anthropic Messages API provider

use crate::{
    ChatModel, CompletionRequest, CompletionResponse, StopReason, ToolCallRequest,
};
use atelier_core::{AtelierResult, ChatMessage, LlmError, MessageRole};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Chat model backed by the Anthropic Messages API.
pub struct AnthropicChatModel {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicChatModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, endpoint: Option<&str>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: endpoint.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

#[derive(Serialize)]
struct WireTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a serde_json::Value,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: serde_json::Value,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct WireError {
    error: WireErrorBody,
}

#[derive(Deserialize)]
struct WireErrorBody {
    message: String,
}

// ============================================================================
// MESSAGE CONVERSION
// ============================================================================

/// Convert canonical messages into Anthropic message turns. Tool results
/// travel as `tool_result` blocks inside user turns; assistant tool calls
/// become `tool_use` blocks.
fn to_wire_messages(messages: &[ChatMessage]) -> Vec<WireMessage> {
    let mut wire = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            // System framing is passed via the top-level `system` field.
            MessageRole::System => continue,
            MessageRole::User => wire.push(WireMessage {
                role: "user",
                content: serde_json::Value::String(message.content.clone()),
            }),
            MessageRole::Assistant => {
                let mut blocks = Vec::new();
                if !message.content.is_empty() {
                    blocks.push(serde_json::json!({
                        "type": "text",
                        "text": message.content,
                    }));
                }
                if let Some(calls) = message
                    .tool_calls
                    .as_ref()
                    .and_then(|v| serde_json::from_value::<Vec<ToolCallRequest>>(v.clone()).ok())
                {
                    for call in calls {
                        blocks.push(serde_json::json!({
                            "type": "tool_use",
                            "id": call.id,
                            "name": call.name,
                            "input": call.arguments,
                        }));
                    }
                }
                wire.push(WireMessage {
                    role: "assistant",
                    content: serde_json::Value::Array(blocks),
                });
            }
            MessageRole::Tool => wire.push(WireMessage {
                role: "user",
                content: serde_json::json!([{
                    "type": "tool_result",
                    "tool_use_id": message.tool_call_id.clone().unwrap_or_default(),
                    "content": message.content,
                }]),
            }),
        }
    }
    wire
}

fn parse_stop_reason(raw: Option<&str>) -> StopReason {
    match raw {
        Some("tool_use") => StopReason::ToolUse,
        Some("max_tokens") => StopReason::MaxTokens,
        _ => StopReason::EndTurn,
    }
}

// ============================================================================
// CHAT MODEL IMPL
// ============================================================================

#[async_trait::async_trait]
impl ChatModel for AnthropicChatModel {
    async fn complete(&self, request: &CompletionRequest) -> AtelierResult<CompletionResponse> {
        let model = if request.model_id.is_empty() {
            &self.model
        } else {
            &request.model_id
        };

        let body = MessagesRequest {
            model,
            max_tokens: request.max_tokens,
            system: request.system.as_deref(),
            messages: to_wire_messages(&request.messages),
            tools: request
                .tools
                .iter()
                .map(|t| WireTool {
                    name: &t.name,
                    description: &t.description,
                    input_schema: &t.input_schema,
                })
                .collect(),
        };

        let url = format!("{}/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: "anthropic".to_string(),
                status: 0,
                message: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<WireError>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);

            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
                    provider: "anthropic".to_string(),
                },
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::InvalidApiKey {
                    provider: "anthropic".to_string(),
                },
                _ => LlmError::RequestFailed {
                    provider: "anthropic".to_string(),
                    status: status.as_u16(),
                    message,
                },
            }
            .into());
        }

        let parsed: MessagesResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: "anthropic".to_string(),
                reason: format!("Failed to parse response: {}", e),
            })?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in parsed.content {
            match block {
                ContentBlock::Text { text: t } => text.push_str(&t),
                ContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCallRequest {
                    id,
                    name,
                    arguments: input,
                }),
                ContentBlock::Other => {}
            }
        }

        Ok(CompletionResponse {
            text: (!text.is_empty()).then_some(text),
            tool_calls,
            stop_reason: parse_stop_reason(parsed.stop_reason.as_deref()),
        })
    }

    fn default_model_id(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for AnthropicChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicChatModel")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
