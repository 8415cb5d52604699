//! Typed query structs for the store contract.
//!
//! Free-text fields carry *sanitized* terms (see
//! [`atelier_core::sanitize_like_term`]); the store wraps each into a
//! substring pattern and OR-combines the variants. A `limit` of `None` means
//! no paging cap (used by aggregation, never by the search tools).

use atelier_core::{
    ArtworkId, DateRange, EditionId, EditionStatus, HistoryAction, LocationId, LocationKind,
};
use serde::{Deserialize, Serialize};

/// Filters for artwork listing. Text terms match either bilingual title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtworkQuery {
    /// Sanitized free-text variants, OR-combined across `title_en`/`title_zh`.
    pub title_terms: Vec<String>,
    pub year: Option<i32>,
    pub artwork_type: Option<String>,
    pub limit: Option<usize>,
}

/// Filters for edition listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditionQuery {
    pub statuses: Vec<EditionStatus>,
    /// Restrict to editions of these artworks. Empty means no restriction.
    pub artwork_ids: Vec<ArtworkId>,
    pub location_id: Option<LocationId>,
    /// `Some(true)` keeps only editions carrying an asking price that are
    /// not yet sold or gifted.
    pub for_sale: Option<bool>,
    pub limit: Option<usize>,
}

/// Filters for location listing. Text terms match name or city.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationQuery {
    pub name_terms: Vec<String>,
    pub kind: Option<LocationKind>,
    pub limit: Option<usize>,
}

/// Filters for edition-history listing. An empty `edition_ids` means no
/// restriction beyond user scope; the history search tool short-circuits a
/// failed artwork-title resolution before ever building a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub edition_ids: Vec<EditionId>,
    pub actions: Vec<HistoryAction>,
    pub date_range: DateRange,
    pub limit: Option<usize>,
}
