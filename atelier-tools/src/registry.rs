//! Tool registry and dispatch.
//!
//! The action catalog is a closed enumeration: every dispatch parses the
//! action name against [`ToolName`] first, then validates arguments against
//! the tool's JSON Schema, and only then reaches a statically-typed handler.
//! There is no string-to-function lookup outside this enumeration.
//!
//! Two registries come from one definition set: the full catalog for the
//! authenticated chat surface, and the read-only subset (an explicit
//! allow-list, never inferred from metadata) for the external query endpoint.

use crate::{confirm, export, import, search, stats, ToolContext};
use atelier_core::ToolError;
use atelier_llm::ToolDecl;
use serde_json::Value as JsonValue;

// ============================================================================
// TOOL NAMES
// ============================================================================

/// The closed set of callable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    SearchArtworks,
    SearchEditions,
    SearchLocations,
    SearchHistory,
    GetStatistics,
    GenerateUpdateConfirmation,
    ExecuteEditionUpdate,
    ImportArtworkFromUrl,
    ExportArtworks,
}

impl ToolName {
    /// Every action, read and write.
    pub const ALL: [ToolName; 9] = [
        ToolName::SearchArtworks,
        ToolName::SearchEditions,
        ToolName::SearchLocations,
        ToolName::SearchHistory,
        ToolName::GetStatistics,
        ToolName::GenerateUpdateConfirmation,
        ToolName::ExecuteEditionUpdate,
        ToolName::ImportArtworkFromUrl,
        ToolName::ExportArtworks,
    ];

    /// Wire name of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::SearchArtworks => "search_artworks",
            ToolName::SearchEditions => "search_editions",
            ToolName::SearchLocations => "search_locations",
            ToolName::SearchHistory => "search_history",
            ToolName::GetStatistics => "get_statistics",
            ToolName::GenerateUpdateConfirmation => "generate_update_confirmation",
            ToolName::ExecuteEditionUpdate => "execute_edition_update",
            ToolName::ImportArtworkFromUrl => "import_artwork_from_url",
            ToolName::ExportArtworks => "export_artworks",
        }
    }

    /// Whether this action is part of the read-only subset.
    pub fn is_read_only(&self) -> bool {
        READ_ONLY_ACTIONS.contains(self)
    }

    /// Comma-separated list of all wire names.
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::str::FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| ToolError::UnknownAction {
                action: s.to_string(),
                valid: Self::valid_names(),
            })
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Actions exposed to API-key callers. An explicit allow-list: exactly the
/// search and statistics tools, nothing that mutates storage, deletes data,
/// or triggers an outbound fetch.
pub const READ_ONLY_ACTIONS: [ToolName; 5] = [
    ToolName::SearchArtworks,
    ToolName::SearchEditions,
    ToolName::SearchLocations,
    ToolName::SearchHistory,
    ToolName::GetStatistics,
];

// ============================================================================
// TOOL OUTCOME
// ============================================================================

/// Result of one tool execution. Failures are values, never panics or raw
/// errors: the orchestrating model reacts to them conversationally.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success {
        data: JsonValue,
        /// Condensed text echoed into the model's context instead of the
        /// full data payload.
        summary: Option<String>,
    },
    Error { message: String },
}

impl ToolOutcome {
    pub fn success(data: JsonValue) -> Self {
        ToolOutcome::Success {
            data,
            summary: None,
        }
    }

    pub fn success_with_summary(data: JsonValue, summary: impl Into<String>) -> Self {
        ToolOutcome::Success {
            data,
            summary: Some(summary.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ToolOutcome::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Error { .. })
    }

    /// Full JSON payload: data on success, `{"error": ...}` on failure.
    pub fn into_json(self) -> JsonValue {
        match self {
            ToolOutcome::Success { data, .. } => data,
            ToolOutcome::Error { message } => serde_json::json!({ "error": message }),
        }
    }

    /// Text to feed back into the model's context window: the summary when
    /// one exists, otherwise the serialized payload.
    pub fn model_text(&self) -> String {
        match self {
            ToolOutcome::Success { data, summary } => summary
                .clone()
                .unwrap_or_else(|| data.to_string()),
            ToolOutcome::Error { message } => {
                serde_json::json!({ "error": message }).to_string()
            }
        }
    }
}

// ============================================================================
// TOOL DEFINITIONS
// ============================================================================

/// One entry of the tool catalog: the action, its model-facing description,
/// and the JSON Schema its arguments are validated against.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: ToolName,
    pub description: &'static str,
    pub input_schema: JsonValue,
}

impl ToolDefinition {
    /// Convert to the declaration shape bound to a chat model.
    pub fn to_decl(&self) -> ToolDecl {
        ToolDecl {
            name: self.name.as_str().to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema.clone(),
        }
    }
}

/// The full tool catalog, mutating tools included. Used by the authenticated
/// first-party chat surface.
pub fn registry() -> Vec<ToolDefinition> {
    ToolName::ALL.iter().map(|name| definition(*name)).collect()
}

/// The read-only catalog handed to API-key callers.
pub fn read_only_definitions() -> Vec<ToolDefinition> {
    READ_ONLY_ACTIONS
        .iter()
        .map(|name| definition(*name))
        .collect()
}

fn definition(name: ToolName) -> ToolDefinition {
    match name {
        ToolName::SearchArtworks => ToolDefinition {
            name,
            description: "Search the artist's artworks by free text (matched against both \
                          English and Chinese titles), year, or type. Returns up to 10 results.",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Free-text search over bilingual titles"
                    },
                    "year": {
                        "type": "integer",
                        "description": "Exact creation year"
                    },
                    "artwork_type": {
                        "type": "string",
                        "description": "Exact type, e.g. 'painting', 'video', 'sculpture'"
                    }
                },
                "additionalProperties": false
            }),
        },
        ToolName::SearchEditions => ToolDefinition {
            name,
            description: "Search editions by status, parent-artwork title, location, or \
                          for-sale flag. Returns up to 50 results with their artwork titles.",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "enum": ["in_production", "in_studio", "at_gallery", "at_museum",
                                 "in_transit", "sold", "gifted", "lost", "damaged"],
                        "description": "Edition status"
                    },
                    "artwork_query": {
                        "type": "string",
                        "description": "Free-text search over the parent artwork's titles"
                    },
                    "location_id": {
                        "type": "string",
                        "format": "uuid",
                        "description": "Restrict to one location"
                    },
                    "for_sale": {
                        "type": "boolean",
                        "description": "Only editions carrying an asking price and not yet sold"
                    }
                },
                "additionalProperties": false
            }),
        },
        ToolName::SearchLocations => ToolDefinition {
            name,
            description: "Search locations (galleries, museums, studios) by name or city. \
                          Returns up to 10 results.",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Free-text search over name and city"
                    },
                    "kind": {
                        "type": "string",
                        "enum": ["gallery", "museum", "studio", "other"],
                        "description": "Location category"
                    }
                },
                "additionalProperties": false
            }),
        },
        ToolName::SearchHistory => ToolDefinition {
            name,
            description: "Search the edition history log, optionally narrowed to editions of \
                          artworks matching a title search, an action type, or a date range. \
                          Returns up to 50 entries, newest first.",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "artwork_query": {
                        "type": "string",
                        "description": "Free-text search over artwork titles; history is then \
                                        limited to those artworks' editions"
                    },
                    "action": {
                        "type": "string",
                        "enum": ["created", "status_change", "location_change", "sold",
                                 "consigned", "returned", "condition_update", "file_added",
                                 "file_deleted", "number_assigned"],
                        "description": "History action type"
                    },
                    "date_from": {
                        "type": "string",
                        "format": "date",
                        "description": "Earliest date, inclusive (YYYY-MM-DD)"
                    },
                    "date_to": {
                        "type": "string",
                        "format": "date",
                        "description": "Latest date, inclusive (YYYY-MM-DD)"
                    }
                },
                "additionalProperties": false
            }),
        },
        ToolName::GetStatistics => ToolDefinition {
            name,
            description: "Inventory statistics: total artwork and edition counts, broken down \
                          by status or by location.",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "stat_type": {
                        "type": "string",
                        "enum": ["overview", "by_status", "by_location"],
                        "description": "Which aggregation to compute"
                    }
                },
                "required": ["stat_type"],
                "additionalProperties": false
            }),
        },
        ToolName::GenerateUpdateConfirmation => ToolDefinition {
            name,
            description: "Phase 1 of an edition update: build a confirmation card showing the \
                          edition's current values next to the proposed changes. Does NOT \
                          modify anything. The user must confirm before execute_edition_update \
                          is called with the same arguments.",
            input_schema: update_input_schema(),
        },
        ToolName::ExecuteEditionUpdate => ToolDefinition {
            name,
            description: "Phase 2 of an edition update: apply a previously confirmed update to \
                          the edition and record a history entry. Only call this after the \
                          user explicitly confirmed the card from \
                          generate_update_confirmation.",
            input_schema: update_input_schema(),
        },
        ToolName::ImportArtworkFromUrl => ToolDefinition {
            name,
            description: "Import or refresh an artwork from a web page: fetches the page, \
                          extracts title/year/type/dimensions/materials/duration and a \
                          thumbnail candidate, and creates a new artwork or updates the \
                          matching existing one.",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Web page URL to import from"
                    }
                },
                "required": ["url"],
                "additionalProperties": false
            }),
        },
        ToolName::ExportArtworks => ToolDefinition {
            name,
            description: "Resolve an export request into a structured descriptor: which \
                          artworks (by title search, explicit ids, or all) and which format. \
                          Rendering happens elsewhere; this only fixes the scope.",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "scope": {
                        "type": "string",
                        "enum": ["all"],
                        "description": "Export the whole catalog"
                    },
                    "title_query": {
                        "type": "string",
                        "description": "Export the artwork matching this title search"
                    },
                    "artwork_ids": {
                        "type": "array",
                        "items": {"type": "string", "format": "uuid"},
                        "description": "Export exactly these artworks"
                    },
                    "format": {
                        "type": "string",
                        "enum": ["markdown", "pdf"],
                        "description": "Output format, default markdown"
                    },
                    "include_editions": {
                        "type": "boolean",
                        "description": "Include edition tables, default true"
                    }
                },
                "additionalProperties": false
            }),
        },
    }
}

/// Shared schema for both confirmation-protocol phases: the payload must
/// round-trip verbatim between them.
fn update_input_schema() -> JsonValue {
    serde_json::json!({
        "type": "object",
        "properties": {
            "edition_id": {
                "type": "string",
                "format": "uuid",
                "description": "Edition to update"
            },
            "updates": {
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "enum": ["in_production", "in_studio", "at_gallery", "at_museum",
                                 "in_transit", "sold", "gifted", "lost", "damaged"]
                    },
                    "location_id": {"type": "string", "format": "uuid"},
                    "sale_price": {"type": "number"},
                    "sale_currency": {"type": "string"},
                    "buyer": {"type": "string"},
                    "sale_date": {"type": "string", "format": "date"},
                    "condition": {"type": "string"},
                    "storage_detail": {"type": "string"},
                    "consignment_start": {"type": "string", "format": "date"},
                    "consignment_end": {"type": "string", "format": "date"},
                    "loan_start": {"type": "string", "format": "date"},
                    "loan_end": {"type": "string", "format": "date"}
                },
                "additionalProperties": false
            },
            "reason": {
                "type": "string",
                "description": "Human-readable reason shown on the card and recorded in history"
            }
        },
        "required": ["edition_id", "updates"],
        "additionalProperties": false
    })
}

// ============================================================================
// DISPATCH
// ============================================================================

/// Execute one tool call: parse the action against the closed enumeration,
/// validate the arguments against its schema, then run the typed handler.
///
/// Never returns a raw error: every failure becomes a structured
/// [`ToolOutcome::Error`] the model can relay conversationally.
pub async fn execute_tool(ctx: &ToolContext, action: &str, args: JsonValue) -> ToolOutcome {
    let name: ToolName = match action.parse() {
        Ok(name) => name,
        Err(err) => return ToolOutcome::error(err.to_string()),
    };

    let schema = definition(name).input_schema;
    if let Err(reason) = validate_tool_input(&args, &schema) {
        return ToolOutcome::error(format!(
            "Invalid input for {}: {}",
            name.as_str(),
            reason
        ));
    }

    tracing::debug!(action = %name, "executing tool");

    let outcome = match name {
        ToolName::SearchArtworks => search::search_artworks(ctx, args).await,
        ToolName::SearchEditions => search::search_editions(ctx, args).await,
        ToolName::SearchLocations => search::search_locations(ctx, args).await,
        ToolName::SearchHistory => search::search_history(ctx, args).await,
        ToolName::GetStatistics => stats::get_statistics(ctx, args).await,
        ToolName::GenerateUpdateConfirmation => {
            confirm::generate_update_confirmation(ctx, args).await
        }
        ToolName::ExecuteEditionUpdate => confirm::execute_edition_update(ctx, args).await,
        ToolName::ImportArtworkFromUrl => import::import_artwork_from_url(ctx, args).await,
        ToolName::ExportArtworks => export::export_artworks(ctx, args).await,
    };

    if let ToolOutcome::Error { ref message } = outcome {
        tracing::debug!(action = %name, error = %message, "tool returned error result");
    }
    outcome
}

/// Validate tool input against a JSON Schema.
fn validate_tool_input(input: &JsonValue, schema: &JsonValue) -> Result<(), String> {
    let compiled = jsonschema::draft202012::new(schema)
        .map_err(|e| format!("Invalid schema: {}", e))?;

    let messages = compiled
        .iter_errors(input)
        .map(|e| format!("{}: {}", e.instance_path(), e))
        .collect::<Vec<_>>();
    if messages.is_empty() {
        Ok(())
    } else {
        Err(messages.join("; "))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;
    use std::str::FromStr;

    #[test]
    fn test_read_only_allow_list_is_exactly_the_five_search_and_stats_tools() {
        let names: Vec<&str> = READ_ONLY_ACTIONS.iter().map(|t| t.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "search_artworks",
                "search_editions",
                "search_locations",
                "search_history",
                "get_statistics",
            ]
        );
    }

    #[test]
    fn test_read_only_allow_list_contains_no_write_tool() {
        for write_tool in [
            ToolName::GenerateUpdateConfirmation,
            ToolName::ExecuteEditionUpdate,
            ToolName::ImportArtworkFromUrl,
            ToolName::ExportArtworks,
        ] {
            assert!(
                !READ_ONLY_ACTIONS.contains(&write_tool),
                "{} must never be exposed read-only",
                write_tool
            );
            assert!(!write_tool.is_read_only());
        }
    }

    #[test]
    fn test_registries_cover_the_catalog() {
        assert_eq!(registry().len(), ToolName::ALL.len());
        assert_eq!(read_only_definitions().len(), READ_ONLY_ACTIONS.len());
        for def in read_only_definitions() {
            assert!(def.name.is_read_only());
        }
    }

    #[test]
    fn test_tool_name_roundtrip_and_unknown() {
        for name in ToolName::ALL {
            assert_eq!(ToolName::from_str(name.as_str()).unwrap(), name);
        }
        let err = ToolName::from_str("drop_table").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("drop_table"));
        assert!(message.contains("search_artworks"));
    }

    #[tokio::test]
    async fn test_dispatch_rejects_unknown_action_as_error_value() {
        let fixture = Fixture::new();
        let outcome =
            execute_tool(&fixture.ctx(), "delete_everything", serde_json::json!({})).await;
        assert!(outcome.is_error());
        let json = outcome.into_json();
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("delete_everything"));
    }

    #[tokio::test]
    async fn test_dispatch_rejects_schema_violations() {
        let fixture = Fixture::new();
        // stat_type is required
        let outcome = execute_tool(&fixture.ctx(), "get_statistics", serde_json::json!({})).await;
        assert!(outcome.is_error());

        // unknown property rejected
        let outcome = execute_tool(
            &fixture.ctx(),
            "search_artworks",
            serde_json::json!({"querry": "typo"}),
        )
        .await;
        assert!(outcome.is_error());
    }

    #[test]
    fn test_definitions_convert_to_model_decls() {
        let decls: Vec<_> = registry().iter().map(|d| d.to_decl()).collect();
        assert!(decls.iter().any(|d| d.name == "search_artworks"));
        for decl in decls {
            assert!(decl.input_schema.is_object());
            assert!(!decl.description.is_empty());
        }
    }

    #[test]
    fn test_model_text_prefers_summary() {
        let outcome = ToolOutcome::success_with_summary(
            serde_json::json!({"huge": "payload"}),
            "3 artworks found",
        );
        assert_eq!(outcome.model_text(), "3 artworks found");

        let outcome = ToolOutcome::error("boom");
        assert!(outcome.model_text().contains("boom"));
    }
}
