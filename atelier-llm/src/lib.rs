//! Atelier LLM - Model Capability Boundary
//!
//! Provider-agnostic trait for chat completion with tool calling.
//! Concrete providers are selected by configuration, never by inheritance.
//! Every external-call wrapper in this crate has a structured failure path;
//! the search-term expander additionally has a pure fallback that never
//! fails.

use atelier_core::{AtelierResult, ChatMessage, ConfigError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub mod expansion;
pub mod extraction;
pub mod providers;

pub use expansion::expand_search_term;
pub use extraction::{extract_artwork_metadata, fetch_page, pick_thumbnail, ExtractedArtwork};
pub use providers::{AnthropicChatModel, OpenAiChatModel};

// ============================================================================
// COMPLETION TYPES
// ============================================================================

/// A tool made available to the model for a completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDecl {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub input_schema: serde_json::Value,
}

/// A tool invocation the model requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
}

/// One completion request: system framing, history, and bound tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier; empty string means the provider's default.
    pub model_id: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDecl>,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Minimal request with no tools.
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            model_id: String::new(),
            system: None,
            messages,
            tools: Vec::new(),
            max_tokens: 1024,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDecl>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Model output: assistant text and/or requested tool calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub stop_reason: StopReason,
}

impl CompletionResponse {
    /// Plain text response with no tool calls.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
            stop_reason: StopReason::EndTurn,
        }
    }
}

// ============================================================================
// CHAT MODEL TRAIT
// ============================================================================

/// Capability interface for a chat-completion provider.
///
/// One method: complete given prompt, tools, and options. Implementations
/// must be thread-safe (Send + Sync) so a single instance can serve
/// concurrent requests behind an `Arc`.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion.
    ///
    /// An empty `request.model_id` selects the provider's default model.
    async fn complete(&self, request: &CompletionRequest) -> AtelierResult<CompletionResponse>;

    /// The model identifier used when the request does not name one.
    fn default_model_id(&self) -> &str;
}

// ============================================================================
// PROVIDER SELECTION
// ============================================================================

/// Provider configuration: which backend, which credentials, which model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// "anthropic" or "openai".
    pub provider_type: String,
    pub api_key: String,
    pub model: String,
    /// Override the provider's base URL (self-hosted gateways, tests).
    pub endpoint: Option<String>,
}

/// Build a chat model from configuration.
pub fn build_chat_model(config: &ProviderConfig) -> AtelierResult<Arc<dyn ChatModel>> {
    match config.provider_type.as_str() {
        "anthropic" => Ok(Arc::new(AnthropicChatModel::new(
            &config.api_key,
            &config.model,
            config.endpoint.as_deref(),
        ))),
        "openai" => Ok(Arc::new(OpenAiChatModel::new(
            &config.api_key,
            &config.model,
            config.endpoint.as_deref(),
        ))),
        other => Err(ConfigError::InvalidValue {
            field: "provider_type".to_string(),
            value: other.to_string(),
            reason: "expected 'anthropic' or 'openai'".to_string(),
        }
        .into()),
    }
}

// ============================================================================
// MOCK PROVIDER FOR TESTING
// ============================================================================

/// Scripted chat model for tests. Pops one queued response per call and
/// records every request it receives.
pub struct MockChatModel {
    responses: Mutex<VecDeque<AtelierResult<CompletionResponse>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    model_id: String,
}

impl MockChatModel {
    /// A mock that replies with the given responses in order.
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
            model_id: "mock-model".to_string(),
        }
    }

    /// A mock whose every call fails, for degradation tests.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            model_id: "mock-model".to_string(),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("mock lock").clone()
    }
}

#[async_trait::async_trait]
impl ChatModel for MockChatModel {
    async fn complete(&self, request: &CompletionRequest) -> AtelierResult<CompletionResponse> {
        self.requests.lock().expect("mock lock").push(request.clone());
        self.responses
            .lock()
            .expect("mock lock")
            .pop_front()
            .unwrap_or_else(|| {
                Err(atelier_core::LlmError::RequestFailed {
                    provider: "mock".to_string(),
                    status: 500,
                    message: "no scripted response".to_string(),
                }
                .into())
            })
    }

    fn default_model_id(&self) -> &str {
        &self.model_id
    }
}

impl std::fmt::Debug for MockChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockChatModel")
            .field("model_id", &self.model_id)
            .finish()
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_responses_in_order() {
        let mock = MockChatModel::new(vec![
            CompletionResponse::text_only("first"),
            CompletionResponse::text_only("second"),
        ]);

        let req = CompletionRequest::new(vec![ChatMessage::user("hi")]);
        let r1 = mock.complete(&req).await.unwrap();
        let r2 = mock.complete(&req).await.unwrap();
        assert_eq!(r1.text.as_deref(), Some("first"));
        assert_eq!(r2.text.as_deref(), Some("second"));
        assert!(mock.complete(&req).await.is_err());
        assert_eq!(mock.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_failing_mock_always_errors() {
        let mock = MockChatModel::failing();
        let req = CompletionRequest::new(vec![ChatMessage::user("hi")]);
        assert!(mock.complete(&req).await.is_err());
    }

    #[test]
    fn test_build_chat_model_rejects_unknown_provider() {
        let config = ProviderConfig {
            provider_type: "carrier-pigeon".to_string(),
            api_key: "k".to_string(),
            model: "m".to_string(),
            endpoint: None,
        };
        assert!(build_chat_model(&config).is_err());
    }

    #[test]
    fn test_build_chat_model_known_providers() {
        for provider in ["anthropic", "openai"] {
            let config = ProviderConfig {
                provider_type: provider.to_string(),
                api_key: "k".to_string(),
                model: "m".to_string(),
                endpoint: None,
            };
            let model = build_chat_model(&config).unwrap();
            assert_eq!(model.default_model_id(), "m");
        }
    }
}
