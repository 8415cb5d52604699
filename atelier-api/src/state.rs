//! Shared application state.

use crate::auth::AuthConfig;
use crate::config::ApiConfig;
use atelier_llm::ChatModel;
use atelier_store::Store;
use std::sync::Arc;

/// State shared by all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub auth_config: Arc<AuthConfig>,
    pub config: Arc<ApiConfig>,
    /// Primary conversational model; also serves expansion and extraction
    /// calls (with per-call model id overrides from config).
    pub chat_model: Option<Arc<dyn ChatModel>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        auth_config: AuthConfig,
        config: ApiConfig,
        chat_model: Option<Arc<dyn ChatModel>>,
    ) -> Self {
        Self {
            store,
            auth_config: Arc::new(auth_config),
            config: Arc::new(config),
            chat_model,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("chat_model", &self.chat_model.is_some())
            .finish()
    }
}
