//! API Configuration Module
//!
//! CORS, rate limiting, model providers, and chat-loop settings, loaded from
//! environment variables with development defaults.

use atelier_context::DEFAULT_TOKEN_BUDGET;
use atelier_core::UserId;
use atelier_llm::ProviderConfig;
use uuid::Uuid;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for the Atelier server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address, e.g. "0.0.0.0:8080".
    pub bind_addr: String,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins. Empty means wildcard (the external query
    /// endpoint is designed for wildcard-origin access).
    pub cors_origins: Vec<String>,

    // ========================================================================
    // Rate Limiting Configuration
    // ========================================================================
    pub rate_limit_enabled: bool,
    /// Requests per minute per IP for unauthenticated callers.
    pub rate_limit_unauthenticated: u32,
    /// Requests per minute per user for authenticated callers.
    pub rate_limit_authenticated: u32,
    /// Burst capacity beyond the steady rate.
    pub rate_limit_burst: u32,

    // ========================================================================
    // Chat / Model Configuration
    // ========================================================================
    /// Token budget for conversation history sent to the model.
    pub token_budget: usize,

    /// Primary conversational model provider. `None` disables the chat
    /// surface (the query endpoint still works).
    pub chat_provider: Option<ProviderConfig>,

    /// Model id used for search-term expansion calls; `None` uses the
    /// provider default.
    pub expansion_model_id: Option<String>,

    /// Model id used for URL-import extraction calls.
    pub extraction_model_id: Option<String>,

    /// Inventory owner served by the API-key query endpoint. The studio runs
    /// single-artist; third-party callers read this user's catalog.
    pub query_user_id: Option<UserId>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            cors_origins: Vec::new(),
            rate_limit_enabled: true,
            rate_limit_unauthenticated: 100,
            rate_limit_authenticated: 1000,
            rate_limit_burst: 10,
            token_budget: DEFAULT_TOKEN_BUDGET,
            chat_provider: None,
            expansion_model_id: None,
            extraction_model_id: None,
            query_user_id: None,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// - `ATELIER_BIND_ADDR`: Bind address (default: 0.0.0.0:8080)
    /// - `ATELIER_CORS_ORIGINS`: Comma-separated origins (empty = wildcard)
    /// - `ATELIER_RATE_LIMIT_ENABLED`: "true"/"false" (default: true)
    /// - `ATELIER_RATE_LIMIT_UNAUTHENTICATED` / `_AUTHENTICATED` / `_BURST`
    /// - `ATELIER_TOKEN_BUDGET`: Conversation history budget
    /// - `ATELIER_CHAT_PROVIDER`: "anthropic" or "openai"
    /// - `ATELIER_CHAT_MODEL`: Model id for the chat provider
    /// - `ATELIER_CHAT_API_KEY`: Provider credential
    /// - `ATELIER_CHAT_ENDPOINT`: Provider base-URL override
    /// - `ATELIER_EXPANSION_MODEL` / `ATELIER_EXTRACTION_MODEL`: Model id
    ///   overrides for the secondary calls
    /// - `ATELIER_QUERY_USER_ID`: Inventory owner for the query endpoint
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("ATELIER_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(origins) = std::env::var("ATELIER_CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Ok(enabled) = std::env::var("ATELIER_RATE_LIMIT_ENABLED") {
            config.rate_limit_enabled = enabled.to_lowercase() != "false";
        }
        if let Some(limit) = env_parse("ATELIER_RATE_LIMIT_UNAUTHENTICATED") {
            config.rate_limit_unauthenticated = limit;
        }
        if let Some(limit) = env_parse("ATELIER_RATE_LIMIT_AUTHENTICATED") {
            config.rate_limit_authenticated = limit;
        }
        if let Some(burst) = env_parse("ATELIER_RATE_LIMIT_BURST") {
            config.rate_limit_burst = burst;
        }
        if let Some(budget) = env_parse("ATELIER_TOKEN_BUDGET") {
            config.token_budget = budget;
        }

        config.chat_provider = chat_provider_from_env();
        config.expansion_model_id = std::env::var("ATELIER_EXPANSION_MODEL").ok();
        config.extraction_model_id = std::env::var("ATELIER_EXTRACTION_MODEL").ok();
        config.query_user_id = std::env::var("ATELIER_QUERY_USER_ID")
            .ok()
            .and_then(|s| Uuid::parse_str(&s).ok());

        config
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn chat_provider_from_env() -> Option<ProviderConfig> {
    let provider_type = std::env::var("ATELIER_CHAT_PROVIDER").ok()?;
    let model = std::env::var("ATELIER_CHAT_MODEL").ok()?;
    let api_key = std::env::var("ATELIER_CHAT_API_KEY").ok()?;
    Some(ProviderConfig {
        provider_type,
        api_key,
        model,
        endpoint: std::env::var("ATELIER_CHAT_ENDPOINT").ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert!(config.rate_limit_enabled);
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.token_budget, DEFAULT_TOKEN_BUDGET);
        assert!(config.chat_provider.is_none());
    }
}
