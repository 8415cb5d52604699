//! Chat model provider implementations
//!
//! Concrete implementations of the ChatModel trait for the hosted services
//! the studio uses. Each provider owns its wire types and converts between
//! them and the canonical completion shapes.

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicChatModel;
pub use openai::OpenAiChatModel;
