//! URL import tool: fetch a page, extract artwork metadata, and
//! create-or-update the matching artwork.
//!
//! Dedup policy, in order:
//! 1. exact `source_url` match among non-deleted artworks; exactly one match
//!    is the update target, more than one falls through;
//! 2. exact bilingual-title match; exactly one match is the update target
//!    only when the new URL is empty, the existing record's URL is empty, or
//!    both are equal. Conflicting non-empty URLs mean a distinct artwork
//!    that merely shares a title, so a new row is created instead.

use crate::locale::localize;
use crate::registry::ToolOutcome;
use crate::ToolContext;
use atelier_core::{new_entity_id, Artwork};
use atelier_llm::{extract_artwork_metadata, fetch_page, pick_thumbnail, ExtractedArtwork};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

#[derive(Debug, Deserialize)]
struct ImportInput {
    url: String,
}

pub async fn import_artwork_from_url(ctx: &ToolContext, args: JsonValue) -> ToolOutcome {
    let input: ImportInput = match serde_json::from_value(args) {
        Ok(input) => input,
        Err(err) => return ToolOutcome::error(format!("Invalid input: {}", err)),
    };
    let url = input.url.trim().to_string();

    let Some(model) = ctx.extraction_model.as_deref() else {
        return ToolOutcome::error(localize(ctx.locale, "extraction_model_missing", &[]));
    };

    let page_text = match fetch_page(&url).await {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(url = %url, error = %err, "import page fetch failed");
            return ToolOutcome::error(localize(
                ctx.locale,
                "import_fetch_failed",
                &[("url", &url)],
            ));
        }
    };

    let extracted = match extract_artwork_metadata(
        model,
        ctx.extraction_model_id.as_deref(),
        &url,
        &page_text,
    )
    .await
    {
        Ok(extracted) => extracted,
        Err(err) => {
            tracing::warn!(url = %url, error = %err, "import extraction failed");
            return ToolOutcome::error(localize(ctx.locale, "import_extraction_failed", &[]));
        }
    };

    import_extracted(ctx, &url, extracted).await
}

/// Dedup and upsert, separated from the network path so it can be exercised
/// directly.
async fn import_extracted(ctx: &ToolContext, url: &str, extracted: ExtractedArtwork) -> ToolOutcome {
    if !extracted.has_title() {
        return ToolOutcome::error(localize(ctx.locale, "import_no_title", &[]));
    }

    let target = match resolve_target(ctx, url, &extracted).await {
        Ok(target) => target,
        Err(outcome) => return outcome,
    };
    let thumbnail = pick_thumbnail(&extracted.image_urls);

    let title_en = extracted.title_en.clone().unwrap_or_default();
    let title_zh = extracted.title_zh.clone().unwrap_or_default();

    let (action, artwork) = match target {
        Some(existing) => {
            let mut artwork = existing;
            if !title_en.is_empty() {
                artwork.title_en = title_en;
            }
            if !title_zh.is_empty() {
                artwork.title_zh = title_zh;
            }
            apply_metadata(&mut artwork, &extracted);
            artwork.source_url = Some(url.to_string());
            artwork.updated_at = Utc::now();
            if let Some(ref thumbnail) = thumbnail {
                artwork.thumbnail_url = Some(thumbnail.clone());
            }
            if let Err(err) = ctx.store.update_artwork(&artwork).await {
                return ToolOutcome::error(format!("Import failed: {}", err));
            }
            ("updated", artwork)
        }
        None => {
            let now = Utc::now();
            let mut artwork = Artwork {
                artwork_id: new_entity_id(),
                user_id: ctx.user_id,
                title_en,
                title_zh,
                year: extracted.year,
                artwork_type: extracted.artwork_type.clone(),
                dimensions: extracted.dimensions.clone(),
                materials: extracted.materials.clone(),
                duration: extracted.duration.clone(),
                source_url: Some(url.to_string()),
                thumbnail_url: None,
                deleted_at: None,
                created_at: now,
                updated_at: now,
            };
            // Thumbnail set separately; a mirror process moves it to
            // permanent storage later.
            if let Some(ref thumbnail) = thumbnail {
                artwork.thumbnail_url = Some(thumbnail.clone());
            }
            if let Err(err) = ctx.store.create_artwork(&artwork).await {
                return ToolOutcome::error(format!("Import failed: {}", err));
            }
            ("created", artwork)
        }
    };

    let summary = format!(
        "Artwork {} {} from {}",
        artwork.display_title(),
        action,
        url
    );
    ToolOutcome::success_with_summary(
        json!({
            "action": action,
            "artwork_id": artwork.artwork_id,
            "title_en": artwork.title_en,
            "title_zh": artwork.title_zh,
            "thumbnail_url": artwork.thumbnail_url,
        }),
        summary,
    )
}

/// Resolve the update target per the dedup policy, or `None` to create.
async fn resolve_target(
    ctx: &ToolContext,
    url: &str,
    extracted: &ExtractedArtwork,
) -> Result<Option<Artwork>, ToolOutcome> {
    if !url.is_empty() {
        let by_url = ctx
            .store
            .find_artworks_by_source_url(url, ctx.user_id)
            .await
            .map_err(|err| ToolOutcome::error(format!("Import failed: {}", err)))?;
        if by_url.len() == 1 {
            return Ok(by_url.into_iter().next());
        }
        // Zero or several URL matches: fall through to the title check.
    }

    let title_en = extracted.title_en.as_deref().unwrap_or("");
    let title_zh = extracted.title_zh.as_deref().unwrap_or("");
    let by_title = ctx
        .store
        .find_artworks_by_titles(title_en, title_zh, ctx.user_id)
        .await
        .map_err(|err| ToolOutcome::error(format!("Import failed: {}", err)))?;
    if by_title.len() == 1 {
        let existing = &by_title[0];
        let existing_url = existing.source_url.as_deref().unwrap_or("");
        if url.is_empty() || existing_url.is_empty() || existing_url == url {
            return Ok(Some(existing.clone()));
        }
    }
    Ok(None)
}

fn apply_metadata(artwork: &mut Artwork, extracted: &ExtractedArtwork) {
    if extracted.year.is_some() {
        artwork.year = extracted.year;
    }
    if let Some(ref value) = extracted.artwork_type {
        artwork.artwork_type = Some(value.clone());
    }
    if let Some(ref value) = extracted.dimensions {
        artwork.dimensions = Some(value.clone());
    }
    if let Some(ref value) = extracted.materials {
        artwork.materials = Some(value.clone());
    }
    if let Some(ref value) = extracted.duration {
        artwork.duration = Some(value.clone());
    }
}

// ============================================================================
// TESTS
// ============================================================================
