//! Async store trait for the Atelier inventory.
//!
//! This trait is the boundary between the tool layer and whatever relational
//! store backs the deployment. Implementations must scope every read to the
//! owning user and exclude soft-deleted artworks; editions, and history
//! entries are scoped transitively (edition -> artwork -> user).

use crate::queries::{ArtworkQuery, EditionQuery, HistoryQuery, LocationQuery};
use ::async_trait::async_trait;
use atelier_core::{
    Artwork, ArtworkId, AtelierResult, Edition, EditionHistory, EditionId, Location, LocationId,
    UserId,
};

/// Async store contract for inventory entities.
#[async_trait]
pub trait Store: Send + Sync {
    // ========================================================================
    // ARTWORK OPERATIONS
    // ========================================================================

    /// List non-deleted artworks owned by the user, newest first.
    async fn list_artworks(&self, query: &ArtworkQuery, user_id: UserId)
        -> AtelierResult<Vec<Artwork>>;

    /// Get one non-deleted artwork owned by the user.
    async fn get_artwork(&self, id: ArtworkId, user_id: UserId)
        -> AtelierResult<Option<Artwork>>;

    /// Insert a new artwork.
    async fn create_artwork(&self, artwork: &Artwork) -> AtelierResult<()>;

    /// Update an existing artwork owned by its `user_id`.
    async fn update_artwork(&self, artwork: &Artwork) -> AtelierResult<()>;

    /// Exact `source_url` matches among the user's non-deleted artworks.
    async fn find_artworks_by_source_url(
        &self,
        source_url: &str,
        user_id: UserId,
    ) -> AtelierResult<Vec<Artwork>>;

    /// Exact bilingual-title matches among the user's non-deleted artworks.
    async fn find_artworks_by_titles(
        &self,
        title_en: &str,
        title_zh: &str,
        user_id: UserId,
    ) -> AtelierResult<Vec<Artwork>>;

    // ========================================================================
    // EDITION OPERATIONS
    // ========================================================================

    /// List editions of the user's non-deleted artworks, newest first.
    async fn list_editions(&self, query: &EditionQuery, user_id: UserId)
        -> AtelierResult<Vec<Edition>>;

    /// Get one edition if its parent artwork is owned by the user and not
    /// deleted.
    async fn get_edition(&self, id: EditionId, user_id: UserId)
        -> AtelierResult<Option<Edition>>;

    /// Insert a new edition.
    async fn create_edition(&self, edition: &Edition) -> AtelierResult<()>;

    /// Persist an updated edition. Fails with `StoreError::NotFound` when the
    /// edition does not resolve within the user's inventory.
    async fn update_edition(&self, edition: &Edition, user_id: UserId) -> AtelierResult<()>;

    // ========================================================================
    // LOCATION OPERATIONS
    // ========================================================================

    /// List the user's locations.
    async fn list_locations(
        &self,
        query: &LocationQuery,
        user_id: UserId,
    ) -> AtelierResult<Vec<Location>>;

    /// Get one location owned by the user.
    async fn get_location(
        &self,
        id: LocationId,
        user_id: UserId,
    ) -> AtelierResult<Option<Location>>;

    /// Insert a new location.
    async fn create_location(&self, location: &Location) -> AtelierResult<()>;

    // ========================================================================
    // HISTORY OPERATIONS
    // ========================================================================

    /// Append one history entry. History is append-only; there is no update
    /// or delete.
    async fn append_history(&self, entry: &EditionHistory) -> AtelierResult<()>;

    /// List history entries for the user's editions, newest first.
    async fn list_history(
        &self,
        query: &HistoryQuery,
        user_id: UserId,
    ) -> AtelierResult<Vec<EditionHistory>>;
}
