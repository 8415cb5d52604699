//! Search tools: artworks, editions, locations, history.
//!
//! All reads are scoped to the authenticated user's non-deleted records.
//! Free-text terms go through expansion (when a model is configured) and
//! sanitization before they reach the store, so wildcard metacharacters in
//! user input always match literally.

use crate::locale::localize;
use crate::registry::ToolOutcome;
use crate::ToolContext;
use atelier_core::{
    sanitize_like_term, Artwork, ArtworkId, DateRange, Edition, EditionHistory, EditionStatus,
    HistoryAction, Location, LocationId, LocationKind,
};
use atelier_llm::expand_search_term;
use atelier_store::{ArtworkQuery, EditionQuery, HistoryQuery, LocationQuery};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;

/// Page limits per catalog. Artworks and locations page small; editions and
/// history page larger because one artwork fans out into many rows.
pub const ARTWORK_PAGE_LIMIT: usize = 10;
pub const LOCATION_PAGE_LIMIT: usize = 10;
pub const EDITION_PAGE_LIMIT: usize = 50;
pub const HISTORY_PAGE_LIMIT: usize = 50;

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Expand a raw term into sanitized variants ready for the store.
async fn expanded_terms(ctx: &ToolContext, term: &str) -> Vec<String> {
    let variants = expand_search_term(
        ctx.expansion_model.as_deref(),
        term,
        ctx.expansion_model_id.as_deref(),
    )
    .await;
    variants.iter().map(|v| sanitize_like_term(v)).collect()
}

fn short_id(id: ArtworkId) -> String {
    id.to_string().chars().take(8).collect()
}

fn artwork_row(artwork: &Artwork) -> JsonValue {
    json!({
        "artwork_id": artwork.artwork_id,
        "title_en": artwork.title_en,
        "title_zh": artwork.title_zh,
        "year": artwork.year,
        "artwork_type": artwork.artwork_type,
        "dimensions": artwork.dimensions,
        "materials": artwork.materials,
        "duration": artwork.duration,
        "thumbnail_url": artwork.thumbnail_url,
    })
}

fn edition_row(edition: &Edition, artwork_title: Option<&str>) -> JsonValue {
    json!({
        "edition_id": edition.edition_id,
        "artwork_id": edition.artwork_id,
        "artwork_title": artwork_title,
        "edition_number": edition.edition_number,
        "status": edition.status,
        "location_id": edition.location_id,
        "sale_price": edition.sale_price,
        "sale_currency": edition.sale_currency,
        "condition": edition.condition,
    })
}

fn history_row(entry: &EditionHistory) -> JsonValue {
    json!({
        "history_id": entry.history_id,
        "edition_id": entry.edition_id,
        "action": entry.action,
        "occurred_at": entry.occurred_at,
        "related_party": entry.related_party,
        "note": entry.note,
    })
}

fn location_row(location: &Location) -> JsonValue {
    json!({
        "location_id": location.location_id,
        "kind": location.kind,
        "name": location.name,
        "city": location.city,
        "country": location.country,
    })
}

/// Map artwork_id -> artwork for the user's whole (non-deleted) catalog.
async fn artwork_index(ctx: &ToolContext) -> Result<HashMap<ArtworkId, Artwork>, ToolOutcome> {
    let query = ArtworkQuery {
        limit: None,
        ..Default::default()
    };
    match ctx.store.list_artworks(&query, ctx.user_id).await {
        Ok(artworks) => Ok(artworks.into_iter().map(|a| (a.artwork_id, a)).collect()),
        Err(err) => Err(ToolOutcome::error(format!("Search failed: {}", err))),
    }
}

// ============================================================================
// SEARCH ARTWORKS
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchArtworksInput {
    query: Option<String>,
    year: Option<i32>,
    artwork_type: Option<String>,
}

pub async fn search_artworks(ctx: &ToolContext, args: JsonValue) -> ToolOutcome {
    let input: SearchArtworksInput = match serde_json::from_value(args) {
        Ok(input) => input,
        Err(err) => return ToolOutcome::error(format!("Invalid input: {}", err)),
    };

    let title_terms = match input.query.as_deref() {
        Some(q) if !q.trim().is_empty() => expanded_terms(ctx, q).await,
        _ => Vec::new(),
    };

    let query = ArtworkQuery {
        title_terms,
        year: input.year,
        artwork_type: input.artwork_type,
        limit: Some(ARTWORK_PAGE_LIMIT),
    };

    let artworks = match ctx.store.list_artworks(&query, ctx.user_id).await {
        Ok(artworks) => artworks,
        Err(err) => return ToolOutcome::error(format!("Search failed: {}", err)),
    };

    if artworks.is_empty() {
        return ToolOutcome::success(json!({
            "artworks": [],
            "message": localize(ctx.locale, "no_artworks_found", &[]),
        }));
    }

    let summary = format!(
        "{} artworks: {}",
        artworks.len(),
        artworks
            .iter()
            .map(|a| format!("{} [{}]", a.display_title(), short_id(a.artwork_id)))
            .collect::<Vec<_>>()
            .join("; ")
    );
    let rows: Vec<JsonValue> = artworks.iter().map(artwork_row).collect();
    ToolOutcome::success_with_summary(
        json!({ "artworks": rows, "count": rows.len() }),
        summary,
    )
}

// ============================================================================
// SEARCH EDITIONS
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchEditionsInput {
    status: Option<EditionStatus>,
    artwork_query: Option<String>,
    location_id: Option<LocationId>,
    for_sale: Option<bool>,
}

pub async fn search_editions(ctx: &ToolContext, args: JsonValue) -> ToolOutcome {
    let input: SearchEditionsInput = match serde_json::from_value(args) {
        Ok(input) => input,
        Err(err) => return ToolOutcome::error(format!("Invalid input: {}", err)),
    };

    // Resolve an artwork-title filter into artwork ids first.
    let mut artwork_ids = Vec::new();
    if let Some(q) = input.artwork_query.as_deref().filter(|q| !q.trim().is_empty()) {
        let query = ArtworkQuery {
            title_terms: expanded_terms(ctx, q).await,
            limit: None,
            ..Default::default()
        };
        match ctx.store.list_artworks(&query, ctx.user_id).await {
            Ok(artworks) if artworks.is_empty() => {
                return ToolOutcome::success(json!({
                    "editions": [],
                    "message": localize(ctx.locale, "no_editions_found", &[]),
                }));
            }
            Ok(artworks) => artwork_ids = artworks.into_iter().map(|a| a.artwork_id).collect(),
            Err(err) => return ToolOutcome::error(format!("Search failed: {}", err)),
        }
    }

    let query = EditionQuery {
        statuses: input.status.into_iter().collect(),
        artwork_ids,
        location_id: input.location_id,
        for_sale: input.for_sale,
        limit: Some(EDITION_PAGE_LIMIT),
    };

    let editions = match ctx.store.list_editions(&query, ctx.user_id).await {
        Ok(editions) => editions,
        Err(err) => return ToolOutcome::error(format!("Search failed: {}", err)),
    };

    if editions.is_empty() {
        return ToolOutcome::success(json!({
            "editions": [],
            "message": localize(ctx.locale, "no_editions_found", &[]),
        }));
    }

    let index = match artwork_index(ctx).await {
        Ok(index) => index,
        Err(outcome) => return outcome,
    };
    let rows: Vec<JsonValue> = editions
        .iter()
        .map(|e| {
            let title = index.get(&e.artwork_id).map(|a| a.display_title());
            edition_row(e, title)
        })
        .collect();

    let summary = format!(
        "{} editions: {}",
        editions.len(),
        editions
            .iter()
            .map(|e| {
                let title = index
                    .get(&e.artwork_id)
                    .map(|a| a.display_title())
                    .unwrap_or("?");
                format!("{} {} [{}]", title, e.status, short_id(e.edition_id))
            })
            .collect::<Vec<_>>()
            .join("; ")
    );
    ToolOutcome::success_with_summary(json!({ "editions": rows, "count": rows.len() }), summary)
}

// ============================================================================
// SEARCH LOCATIONS
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchLocationsInput {
    query: Option<String>,
    kind: Option<LocationKind>,
}

pub async fn search_locations(ctx: &ToolContext, args: JsonValue) -> ToolOutcome {
    let input: SearchLocationsInput = match serde_json::from_value(args) {
        Ok(input) => input,
        Err(err) => return ToolOutcome::error(format!("Invalid input: {}", err)),
    };

    let name_terms = match input.query.as_deref() {
        Some(q) if !q.trim().is_empty() => expanded_terms(ctx, q).await,
        _ => Vec::new(),
    };

    let query = LocationQuery {
        name_terms,
        kind: input.kind,
        limit: Some(LOCATION_PAGE_LIMIT),
    };

    let locations = match ctx.store.list_locations(&query, ctx.user_id).await {
        Ok(locations) => locations,
        Err(err) => return ToolOutcome::error(format!("Search failed: {}", err)),
    };

    if locations.is_empty() {
        return ToolOutcome::success(json!({
            "locations": [],
            "message": localize(ctx.locale, "no_locations_found", &[]),
        }));
    }

    let rows: Vec<JsonValue> = locations.iter().map(location_row).collect();
    let summary = format!(
        "{} locations: {}",
        locations.len(),
        locations
            .iter()
            .map(|l| format!("{} ({})", l.name, l.kind))
            .collect::<Vec<_>>()
            .join("; ")
    );
    ToolOutcome::success_with_summary(json!({ "locations": rows, "count": rows.len() }), summary)
}

// ============================================================================
// SEARCH HISTORY
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchHistoryInput {
    artwork_query: Option<String>,
    action: Option<HistoryAction>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
}

pub async fn search_history(ctx: &ToolContext, args: JsonValue) -> ToolOutcome {
    let input: SearchHistoryInput = match serde_json::from_value(args) {
        Ok(input) => input,
        Err(err) => return ToolOutcome::error(format!("Invalid input: {}", err)),
    };

    // An artwork-title filter resolves to an edition-id set up front. Zero
    // artworks or zero editions short-circuits with an explicit no-match
    // result instead of querying history against an empty id set.
    let mut edition_ids = Vec::new();
    if let Some(q) = input.artwork_query.as_deref().filter(|q| !q.trim().is_empty()) {
        let query = ArtworkQuery {
            title_terms: expanded_terms(ctx, q).await,
            limit: None,
            ..Default::default()
        };
        let artworks = match ctx.store.list_artworks(&query, ctx.user_id).await {
            Ok(artworks) => artworks,
            Err(err) => return ToolOutcome::error(format!("Search failed: {}", err)),
        };
        if artworks.is_empty() {
            return ToolOutcome::success(json!({
                "entries": [],
                "message": localize(ctx.locale, "no_artwork_match_for_history", &[("query", q)]),
            }));
        }

        let edition_query = EditionQuery {
            artwork_ids: artworks.into_iter().map(|a| a.artwork_id).collect(),
            limit: None,
            ..Default::default()
        };
        let editions = match ctx.store.list_editions(&edition_query, ctx.user_id).await {
            Ok(editions) => editions,
            Err(err) => return ToolOutcome::error(format!("Search failed: {}", err)),
        };
        if editions.is_empty() {
            return ToolOutcome::success(json!({
                "entries": [],
                "message": localize(ctx.locale, "no_editions_for_history", &[]),
            }));
        }
        edition_ids = editions.into_iter().map(|e| e.edition_id).collect();
    }

    let query = HistoryQuery {
        edition_ids,
        actions: input.action.into_iter().collect(),
        date_range: DateRange {
            from: input.date_from,
            to: input.date_to,
        },
        limit: Some(HISTORY_PAGE_LIMIT),
    };

    let entries = match ctx.store.list_history(&query, ctx.user_id).await {
        Ok(entries) => entries,
        Err(err) => return ToolOutcome::error(format!("Search failed: {}", err)),
    };

    if entries.is_empty() {
        return ToolOutcome::success(json!({
            "entries": [],
            "message": localize(ctx.locale, "no_history_found", &[]),
        }));
    }

    let rows: Vec<JsonValue> = entries.iter().map(history_row).collect();
    let summary = format!("{} history entries, newest first", entries.len());
    ToolOutcome::success_with_summary(json!({ "entries": rows, "count": rows.len() }), summary)
}

// ============================================================================
// TESTS
// ============================================================================
