//! Inventory statistics tool.

use crate::locale::localize;
use crate::registry::ToolOutcome;
use crate::ToolContext;
use atelier_core::{Edition, Location, LocationId};
use atelier_store::{ArtworkQuery, EditionQuery, LocationQuery};
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StatType {
    Overview,
    ByStatus,
    ByLocation,
}

#[derive(Debug, Deserialize)]
struct GetStatisticsInput {
    stat_type: StatType,
}

pub async fn get_statistics(ctx: &ToolContext, args: JsonValue) -> ToolOutcome {
    let input: GetStatisticsInput = match serde_json::from_value(args) {
        Ok(input) => input,
        Err(err) => return ToolOutcome::error(format!("Invalid input: {}", err)),
    };

    let artworks = match ctx
        .store
        .list_artworks(&ArtworkQuery { limit: None, ..Default::default() }, ctx.user_id)
        .await
    {
        Ok(artworks) => artworks,
        Err(err) => return ToolOutcome::error(format!("Statistics failed: {}", err)),
    };
    let editions = match ctx
        .store
        .list_editions(&EditionQuery { limit: None, ..Default::default() }, ctx.user_id)
        .await
    {
        Ok(editions) => editions,
        Err(err) => return ToolOutcome::error(format!("Statistics failed: {}", err)),
    };

    // Distinguished empty result: zero counts alone would be ambiguous to
    // the model (empty inventory vs. failed filter).
    if artworks.is_empty() && editions.is_empty() {
        return ToolOutcome::success(json!({
            "total_artworks": 0,
            "total_editions": 0,
            "empty": true,
            "message": localize(ctx.locale, "stats_empty", &[]),
        }));
    }

    let mut data = Map::new();
    data.insert("total_artworks".to_string(), json!(artworks.len()));
    data.insert("total_editions".to_string(), json!(editions.len()));

    match input.stat_type {
        StatType::Overview | StatType::ByStatus => {
            data.insert("by_status".to_string(), json!(count_by_status(&editions)));
        }
        StatType::ByLocation => {
            let locations = match ctx
                .store
                .list_locations(&LocationQuery { limit: None, ..Default::default() }, ctx.user_id)
                .await
            {
                Ok(locations) => locations,
                Err(err) => return ToolOutcome::error(format!("Statistics failed: {}", err)),
            };
            data.insert(
                "by_location".to_string(),
                json!(count_by_location(ctx, &editions, &locations)),
            );
        }
    }

    let summary = format!(
        "{} artworks, {} editions",
        artworks.len(),
        editions.len()
    );
    ToolOutcome::success_with_summary(JsonValue::Object(data), summary)
}

fn count_by_status(editions: &[Edition]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for edition in editions {
        *counts.entry(edition.status.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Editions bucketed by location name. Editions without a location, or whose
/// location has no name, accumulate under the locale's "unknown location"
/// bucket.
fn count_by_location(
    ctx: &ToolContext,
    editions: &[Edition],
    locations: &[Location],
) -> BTreeMap<String, usize> {
    let names: HashMap<LocationId, &str> = locations
        .iter()
        .map(|l| (l.location_id, l.name.as_str()))
        .collect();
    let unknown = localize(ctx.locale, "unknown_location", &[]);

    let mut counts = BTreeMap::new();
    for edition in editions {
        let bucket = edition
            .location_id
            .and_then(|id| names.get(&id).copied())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(unknown.as_str());
        *counts.entry(bucket.to_string()).or_insert(0) += 1;
    }
    counts
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;
    use atelier_core::{EditionStatus, LocationKind};
    use atelier_store::Store;

    #[tokio::test]
    async fn test_empty_inventory_is_distinguished() {
        let fixture = Fixture::new();
        let outcome = get_statistics(&fixture.ctx(), json!({"stat_type": "overview"})).await;
        assert!(!outcome.is_error());
        let data = outcome.into_json();
        assert_eq!(data["empty"], true);
        assert_eq!(data["total_artworks"], 0);
        assert!(data["message"].as_str().unwrap().contains("empty"));
    }

    #[tokio::test]
    async fn test_overview_counts_by_status() {
        let fixture = Fixture::new();
        let artwork = fixture.artwork("Cloud Study", "");
        fixture.store.create_artwork(&artwork).await.unwrap();
        for status in [
            EditionStatus::InStudio,
            EditionStatus::InStudio,
            EditionStatus::Sold,
        ] {
            fixture
                .store
                .create_edition(&fixture.edition(artwork.artwork_id, status))
                .await
                .unwrap();
        }

        let outcome = get_statistics(&fixture.ctx(), json!({"stat_type": "overview"})).await;
        let data = outcome.into_json();
        assert_eq!(data["total_artworks"], 1);
        assert_eq!(data["total_editions"], 3);
        assert_eq!(data["by_status"]["in_studio"], 2);
        assert_eq!(data["by_status"]["sold"], 1);
    }

    #[tokio::test]
    async fn test_by_location_accumulates_unknown_bucket() {
        let fixture = Fixture::new();
        let artwork = fixture.artwork("Cloud Study", "");
        fixture.store.create_artwork(&artwork).await.unwrap();

        let gallery = fixture.location(LocationKind::Gallery, "White Cube");
        fixture.store.create_location(&gallery).await.unwrap();
        let unnamed = fixture.location(LocationKind::Other, "  ");
        fixture.store.create_location(&unnamed).await.unwrap();

        let mut at_gallery = fixture.edition(artwork.artwork_id, EditionStatus::AtGallery);
        at_gallery.location_id = Some(gallery.location_id);
        fixture.store.create_edition(&at_gallery).await.unwrap();

        // Two editions land in the unknown bucket: one with no location, one
        // whose location has a blank name.
        fixture
            .store
            .create_edition(&fixture.edition(artwork.artwork_id, EditionStatus::InStudio))
            .await
            .unwrap();
        let mut unnamed_loc = fixture.edition(artwork.artwork_id, EditionStatus::InStudio);
        unnamed_loc.location_id = Some(unnamed.location_id);
        fixture.store.create_edition(&unnamed_loc).await.unwrap();

        let outcome = get_statistics(&fixture.ctx(), json!({"stat_type": "by_location"})).await;
        let data = outcome.into_json();
        assert_eq!(data["by_location"]["White Cube"], 1);
        assert_eq!(data["by_location"]["Unknown location"], 2);
    }

    #[tokio::test]
    async fn test_unknown_stat_type_rejected() {
        let fixture = Fixture::new();
        let outcome = get_statistics(&fixture.ctx(), json!({"stat_type": "by_moon_phase"})).await;
        assert!(outcome.is_error());
    }
}
