//! Identity types for Atelier entities

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
/// UUIDv7 embeds a Unix timestamp, making IDs naturally sortable by creation time.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Identifier of an artwork row.
pub type ArtworkId = EntityId;

/// Identifier of an edition row.
pub type EditionId = EntityId;

/// Identifier of a location row.
pub type LocationId = EntityId;

/// Identifier of an edition-history row.
pub type HistoryId = EntityId;

/// Identifier of the authenticated owner of inventory rows.
pub type UserId = EntityId;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}
