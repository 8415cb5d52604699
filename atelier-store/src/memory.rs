//! In-memory reference implementation of the store contract.
//!
//! Backs tests and the dev server. Pattern matching follows SQL `ILIKE`
//! semantics via [`atelier_core::ilike_matches`] so sanitization behaves
//! exactly as it would against the real store.

use crate::queries::{ArtworkQuery, EditionQuery, HistoryQuery, LocationQuery};
use crate::store::Store;
use ::async_trait::async_trait;
use atelier_core::{
    ilike_matches, substring_pattern, Artwork, ArtworkId, AtelierResult, Edition, EditionHistory,
    EditionId, EditionStatus, Location, LocationId, StoreError, UserId,
};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// In-memory store over `RwLock`'d tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    artworks: RwLock<HashMap<ArtworkId, Artwork>>,
    editions: RwLock<HashMap<EditionId, Edition>>,
    locations: RwLock<HashMap<LocationId, Location>>,
    history: RwLock<Vec<EditionHistory>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn owned(artwork: &Artwork, user_id: UserId) -> bool {
        artwork.user_id == user_id && !artwork.is_deleted()
    }

    fn title_matches(artwork: &Artwork, terms: &[String]) -> bool {
        if terms.is_empty() {
            return true;
        }
        terms.iter().any(|term| {
            let pattern = substring_pattern(term);
            ilike_matches(&pattern, &artwork.title_en) || ilike_matches(&pattern, &artwork.title_zh)
        })
    }

    /// IDs of non-deleted artworks owned by the user.
    async fn owned_artwork_ids(&self, user_id: UserId) -> HashSet<ArtworkId> {
        self.artworks
            .read()
            .await
            .values()
            .filter(|a| Self::owned(a, user_id))
            .map(|a| a.artwork_id)
            .collect()
    }

    fn truncate<T>(mut rows: Vec<T>, limit: Option<usize>) -> Vec<T> {
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        rows
    }
}

#[async_trait]
impl Store for MemoryStore {
    // ========================================================================
    // ARTWORK OPERATIONS
    // ========================================================================

    async fn list_artworks(
        &self,
        query: &ArtworkQuery,
        user_id: UserId,
    ) -> AtelierResult<Vec<Artwork>> {
        let artworks = self.artworks.read().await;
        let mut rows: Vec<Artwork> = artworks
            .values()
            .filter(|a| Self::owned(a, user_id))
            .filter(|a| Self::title_matches(a, &query.title_terms))
            .filter(|a| query.year.is_none_or(|year| a.year == Some(year)))
            .filter(|a| {
                query.artwork_type.as_ref().is_none_or(|wanted| {
                    a.artwork_type
                        .as_ref()
                        .is_some_and(|t| t.eq_ignore_ascii_case(wanted))
                })
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Self::truncate(rows, query.limit))
    }

    async fn get_artwork(
        &self,
        id: ArtworkId,
        user_id: UserId,
    ) -> AtelierResult<Option<Artwork>> {
        let artworks = self.artworks.read().await;
        Ok(artworks
            .get(&id)
            .filter(|a| Self::owned(a, user_id))
            .cloned())
    }

    async fn create_artwork(&self, artwork: &Artwork) -> AtelierResult<()> {
        self.artworks
            .write()
            .await
            .insert(artwork.artwork_id, artwork.clone());
        Ok(())
    }

    async fn update_artwork(&self, artwork: &Artwork) -> AtelierResult<()> {
        let mut artworks = self.artworks.write().await;
        match artworks.get(&artwork.artwork_id) {
            Some(existing) if existing.user_id == artwork.user_id => {
                artworks.insert(artwork.artwork_id, artwork.clone());
                Ok(())
            }
            _ => Err(StoreError::NotFound {
                entity: "Artwork",
                id: artwork.artwork_id.to_string(),
            }
            .into()),
        }
    }

    async fn find_artworks_by_source_url(
        &self,
        source_url: &str,
        user_id: UserId,
    ) -> AtelierResult<Vec<Artwork>> {
        let artworks = self.artworks.read().await;
        Ok(artworks
            .values()
            .filter(|a| Self::owned(a, user_id))
            .filter(|a| a.source_url.as_deref() == Some(source_url))
            .cloned()
            .collect())
    }

    async fn find_artworks_by_titles(
        &self,
        title_en: &str,
        title_zh: &str,
        user_id: UserId,
    ) -> AtelierResult<Vec<Artwork>> {
        let artworks = self.artworks.read().await;
        Ok(artworks
            .values()
            .filter(|a| Self::owned(a, user_id))
            .filter(|a| a.title_en == title_en && a.title_zh == title_zh)
            .cloned()
            .collect())
    }

    // ========================================================================
    // EDITION OPERATIONS
    // ========================================================================

    async fn list_editions(
        &self,
        query: &EditionQuery,
        user_id: UserId,
    ) -> AtelierResult<Vec<Edition>> {
        let owned_ids = self.owned_artwork_ids(user_id).await;
        let editions = self.editions.read().await;
        let mut rows: Vec<Edition> = editions
            .values()
            .filter(|e| owned_ids.contains(&e.artwork_id))
            .filter(|e| query.statuses.is_empty() || query.statuses.contains(&e.status))
            .filter(|e| {
                query.artwork_ids.is_empty() || query.artwork_ids.contains(&e.artwork_id)
            })
            .filter(|e| query.location_id.is_none_or(|id| e.location_id == Some(id)))
            .filter(|e| {
                query.for_sale.is_none_or(|wanted| {
                    let listed = e.sale_price.is_some()
                        && !matches!(e.status, EditionStatus::Sold | EditionStatus::Gifted);
                    listed == wanted
                })
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Self::truncate(rows, query.limit))
    }

    async fn get_edition(
        &self,
        id: EditionId,
        user_id: UserId,
    ) -> AtelierResult<Option<Edition>> {
        let editions = self.editions.read().await;
        let Some(edition) = editions.get(&id) else {
            return Ok(None);
        };
        let artworks = self.artworks.read().await;
        let owned = artworks
            .get(&edition.artwork_id)
            .is_some_and(|a| Self::owned(a, user_id));
        Ok(owned.then(|| edition.clone()))
    }

    async fn create_edition(&self, edition: &Edition) -> AtelierResult<()> {
        self.editions
            .write()
            .await
            .insert(edition.edition_id, edition.clone());
        Ok(())
    }

    async fn update_edition(&self, edition: &Edition, user_id: UserId) -> AtelierResult<()> {
        if self.get_edition(edition.edition_id, user_id).await?.is_none() {
            return Err(StoreError::NotFound {
                entity: "Edition",
                id: edition.edition_id.to_string(),
            }
            .into());
        }
        self.editions
            .write()
            .await
            .insert(edition.edition_id, edition.clone());
        Ok(())
    }

    // ========================================================================
    // LOCATION OPERATIONS
    // ========================================================================

    async fn list_locations(
        &self,
        query: &LocationQuery,
        user_id: UserId,
    ) -> AtelierResult<Vec<Location>> {
        let locations = self.locations.read().await;
        let mut rows: Vec<Location> = locations
            .values()
            .filter(|l| l.user_id == user_id)
            .filter(|l| {
                query.name_terms.is_empty()
                    || query.name_terms.iter().any(|term| {
                        let pattern = substring_pattern(term);
                        ilike_matches(&pattern, &l.name)
                            || l.city.as_ref().is_some_and(|c| ilike_matches(&pattern, c))
                    })
            })
            .filter(|l| query.kind.is_none_or(|kind| l.kind == kind))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self::truncate(rows, query.limit))
    }

    async fn get_location(
        &self,
        id: LocationId,
        user_id: UserId,
    ) -> AtelierResult<Option<Location>> {
        let locations = self.locations.read().await;
        Ok(locations
            .get(&id)
            .filter(|l| l.user_id == user_id)
            .cloned())
    }

    async fn create_location(&self, location: &Location) -> AtelierResult<()> {
        self.locations
            .write()
            .await
            .insert(location.location_id, location.clone());
        Ok(())
    }

    // ========================================================================
    // HISTORY OPERATIONS
    // ========================================================================

    async fn append_history(&self, entry: &EditionHistory) -> AtelierResult<()> {
        self.history.write().await.push(entry.clone());
        Ok(())
    }

    async fn list_history(
        &self,
        query: &HistoryQuery,
        user_id: UserId,
    ) -> AtelierResult<Vec<EditionHistory>> {
        let owned_artworks = self.owned_artwork_ids(user_id).await;
        let owned_editions: HashSet<EditionId> = self
            .editions
            .read()
            .await
            .values()
            .filter(|e| owned_artworks.contains(&e.artwork_id))
            .map(|e| e.edition_id)
            .collect();

        let history = self.history.read().await;
        let mut rows: Vec<EditionHistory> = history
            .iter()
            .filter(|h| owned_editions.contains(&h.edition_id))
            .filter(|h| query.edition_ids.is_empty() || query.edition_ids.contains(&h.edition_id))
            .filter(|h| query.actions.is_empty() || query.actions.contains(&h.action))
            .filter(|h| {
                query.date_range.is_open() || query.date_range.contains(h.occurred_at.date_naive())
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(Self::truncate(rows, query.limit))
    }
}

// ============================================================================
// TESTS
// ============================================================================
