//! Atelier Tools - The Agent Tool Layer
//!
//! Exposes a constrained set of read and write operations to a language
//! model: a closed action enumeration, schema-validated dispatch, the
//! two-phase confirmation protocol for mutations, and a read-only subset
//! safe to hand to third-party callers.

use atelier_core::UserId;
use atelier_llm::ChatModel;
use atelier_store::Store;
use std::sync::Arc;

pub mod confirm;
pub mod export;
pub mod import;
pub mod locale;
pub mod registry;
pub mod search;
pub mod stats;

pub use confirm::{ConfirmationCard, EditionSnapshot};
pub use locale::{localize, Locale};
pub use registry::{
    execute_tool, read_only_definitions, registry, ToolDefinition, ToolName, ToolOutcome,
    READ_ONLY_ACTIONS,
};

// ============================================================================
// TOOL CONTEXT
// ============================================================================

/// Immutable per-request bundle passed to every tool.
///
/// Constructed once per request by the orchestrator; holds the store handle,
/// the authenticated user, optional model handles for expansion/extraction,
/// and the response locale. No ambient state: everything a tool may touch
/// arrives through this struct.
#[derive(Clone)]
pub struct ToolContext {
    pub store: Arc<dyn Store>,
    pub user_id: UserId,
    pub locale: Locale,
    pub expansion_model: Option<Arc<dyn ChatModel>>,
    /// Model id override for expansion calls; `None` uses the provider
    /// default.
    pub expansion_model_id: Option<String>,
    pub extraction_model: Option<Arc<dyn ChatModel>>,
    pub extraction_model_id: Option<String>,
}

impl ToolContext {
    pub fn new(store: Arc<dyn Store>, user_id: UserId, locale: Locale) -> Self {
        Self {
            store,
            user_id,
            locale,
            expansion_model: None,
            expansion_model_id: None,
            extraction_model: None,
            extraction_model_id: None,
        }
    }

    pub fn with_expansion_model(
        mut self,
        model: Arc<dyn ChatModel>,
        model_id: Option<String>,
    ) -> Self {
        self.expansion_model = Some(model);
        self.expansion_model_id = model_id;
        self
    }

    pub fn with_extraction_model(
        mut self,
        model: Arc<dyn ChatModel>,
        model_id: Option<String>,
    ) -> Self {
        self.extraction_model = Some(model);
        self.extraction_model_id = model_id;
        self
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("user_id", &self.user_id)
            .field("locale", &self.locale)
            .field("expansion_model", &self.expansion_model.is_some())
            .field("extraction_model", &self.extraction_model.is_some())
            .finish()
    }
}
