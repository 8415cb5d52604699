//! Conversation message shapes.
//!
//! Shared by the context manager (pruning) and the model boundary
//! (completion requests). Messages are plain data; tool call payloads stay
//! as raw JSON so the shape is provider-agnostic.

use serde::{Deserialize, Serialize};

/// Role of a message in conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One message in a conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    /// Tool calls requested by an assistant message, serialized as the
    /// canonical `[{id, name, arguments}]` list; providers re-shape it for
    /// their wire format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<serde_json::Value>,
    /// For `Tool` messages: id of the call this result answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Assistant message carrying tool calls.
    pub fn assistant_tool_calls(tool_calls: serde_json::Value) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: String::new(),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Tool-result message answering a specific call.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// A message with no content and no tool payload carries nothing worth
    /// sending to the model.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.tool_calls.is_none()
    }

    /// Whether this message is part of a tool-call/tool-result exchange.
    pub fn is_tool_exchange(&self) -> bool {
        self.role == MessageRole::Tool || self.tool_calls.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emptiness() {
        assert!(ChatMessage::user("  ").is_empty());
        assert!(!ChatMessage::user("hi").is_empty());
        assert!(!ChatMessage::assistant_tool_calls(serde_json::json!([])).is_empty());
    }

    #[test]
    fn test_tool_exchange_detection() {
        assert!(ChatMessage::tool_result("call_1", "ok").is_tool_exchange());
        assert!(ChatMessage::assistant_tool_calls(serde_json::json!([{"name": "x"}]))
            .is_tool_exchange());
        assert!(!ChatMessage::user("hello").is_tool_exchange());
    }
}
