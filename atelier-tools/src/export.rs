//! Export-trigger tool.
//!
//! Resolves a natural-language export request into a structured descriptor;
//! rendering belongs to the exporter collaborator. The tool's only job is
//! unambiguous scope resolution, so a title search with several candidates
//! returns a disambiguation list instead of guessing.

use crate::locale::localize;
use crate::registry::ToolOutcome;
use crate::ToolContext;
use atelier_core::{sanitize_like_term, ArtworkId};
use atelier_store::ArtworkQuery;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

// ============================================================================
// DESCRIPTOR SHAPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportScope {
    All,
    Single,
    Selected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
    Pdf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    pub include_editions: bool,
}

/// The resolved export request handed to the exporter collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRequest {
    pub scope: ExportScope,
    pub artwork_ids: Vec<ArtworkId>,
    pub format: ExportFormat,
    pub options: ExportOptions,
}

// ============================================================================
// TOOL
// ============================================================================

#[derive(Debug, Deserialize)]
struct ExportInput {
    scope: Option<String>,
    title_query: Option<String>,
    artwork_ids: Option<Vec<ArtworkId>>,
    format: Option<ExportFormat>,
    include_editions: Option<bool>,
}

pub async fn export_artworks(ctx: &ToolContext, args: JsonValue) -> ToolOutcome {
    let input: ExportInput = match serde_json::from_value(args) {
        Ok(input) => input,
        Err(err) => return ToolOutcome::error(format!("Invalid input: {}", err)),
    };

    let format = input.format.unwrap_or_default();
    let options = ExportOptions {
        include_editions: input.include_editions.unwrap_or(true),
    };

    // Explicit ids win over everything else.
    if let Some(ids) = input.artwork_ids.filter(|ids| !ids.is_empty()) {
        let scope = if ids.len() == 1 {
            ExportScope::Single
        } else {
            ExportScope::Selected
        };
        return finish(
            ExportRequest {
                scope,
                artwork_ids: ids,
                format,
                options,
            },
        );
    }

    if input.scope.as_deref() == Some("all") {
        return finish(ExportRequest {
            scope: ExportScope::All,
            artwork_ids: Vec::new(),
            format,
            options,
        });
    }

    let Some(query) = input.title_query.as_deref().filter(|q| !q.trim().is_empty()) else {
        return ToolOutcome::error(localize(ctx.locale, "export_scope_missing", &[]));
    };

    let artwork_query = ArtworkQuery {
        title_terms: vec![sanitize_like_term(query)],
        limit: None,
        ..Default::default()
    };
    let matches = match ctx.store.list_artworks(&artwork_query, ctx.user_id).await {
        Ok(matches) => matches,
        Err(err) => return ToolOutcome::error(format!("Export lookup failed: {}", err)),
    };

    match matches.len() {
        0 => ToolOutcome::error(localize(ctx.locale, "export_no_match", &[("query", query)])),
        1 => finish(ExportRequest {
            scope: ExportScope::Single,
            artwork_ids: vec![matches[0].artwork_id],
            format,
            options,
        }),
        _ => {
            // Several candidates: let the caller pick rather than guessing.
            let candidates: Vec<JsonValue> = matches
                .iter()
                .map(|a| {
                    json!({
                        "artwork_id": a.artwork_id,
                        "title_en": a.title_en,
                        "title_zh": a.title_zh,
                        "year": a.year,
                    })
                })
                .collect();
            ToolOutcome::success_with_summary(
                json!({
                    "multiple_matches": candidates,
                    "message": localize(ctx.locale, "export_disambiguation", &[("query", query)]),
                }),
                format!("{} artworks match '{}', disambiguation needed", matches.len(), query),
            )
        }
    }
}

fn finish(request: ExportRequest) -> ToolOutcome {
    let summary = format!(
        "Export request resolved: {:?} scope, {} artworks",
        request.scope,
        request.artwork_ids.len()
    );
    ToolOutcome::success_with_summary(json!({ "export_request": request }), summary)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;
    use atelier_store::Store;

    #[tokio::test]
    async fn test_scope_all() {
        let fixture = Fixture::new();
        let outcome = export_artworks(&fixture.ctx(), json!({"scope": "all"})).await;
        let data = outcome.into_json();
        assert_eq!(data["export_request"]["scope"], "all");
        assert_eq!(data["export_request"]["format"], "markdown");
        assert_eq!(data["export_request"]["options"]["include_editions"], true);
    }

    #[tokio::test]
    async fn test_explicit_ids_resolve_to_selected() {
        let fixture = Fixture::new();
        let ids = vec![atelier_core::new_entity_id(), atelier_core::new_entity_id()];
        let outcome = export_artworks(
            &fixture.ctx(),
            json!({"artwork_ids": ids, "format": "pdf"}),
        )
        .await;
        let data = outcome.into_json();
        assert_eq!(data["export_request"]["scope"], "selected");
        assert_eq!(data["export_request"]["format"], "pdf");
        assert_eq!(
            data["export_request"]["artwork_ids"].as_array().unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_unique_title_resolves_to_single() {
        let fixture = Fixture::new();
        let artwork = fixture.artwork("Cloud Study", "云的研究");
        fixture.store.create_artwork(&artwork).await.unwrap();

        let outcome =
            export_artworks(&fixture.ctx(), json!({"title_query": "cloud"})).await;
        let data = outcome.into_json();
        assert_eq!(data["export_request"]["scope"], "single");
        assert_eq!(
            data["export_request"]["artwork_ids"][0],
            json!(artwork.artwork_id)
        );
    }

    #[tokio::test]
    async fn test_ambiguous_title_returns_disambiguation_list() {
        let fixture = Fixture::new();
        fixture
            .store
            .create_artwork(&fixture.artwork("Cloud Study I", ""))
            .await
            .unwrap();
        fixture
            .store
            .create_artwork(&fixture.artwork("Cloud Study II", ""))
            .await
            .unwrap();

        let outcome =
            export_artworks(&fixture.ctx(), json!({"title_query": "cloud"})).await;
        assert!(!outcome.is_error());
        let data = outcome.into_json();
        assert_eq!(data["multiple_matches"].as_array().unwrap().len(), 2);
        assert!(data.get("export_request").is_none());
    }

    #[tokio::test]
    async fn test_no_match_and_missing_scope_are_errors() {
        let fixture = Fixture::new();
        let outcome =
            export_artworks(&fixture.ctx(), json!({"title_query": "nothing"})).await;
        assert!(outcome.is_error());

        let outcome = export_artworks(&fixture.ctx(), json!({})).await;
        assert!(outcome.is_error());
    }
}
