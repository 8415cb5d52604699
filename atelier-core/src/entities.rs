//! Core entity structs for the Atelier inventory.
//!
//! Shapes only - persistence belongs to the store crate, behavior to the
//! tools crate. Every owned row carries a `user_id`; artworks additionally
//! carry a soft-delete marker which read paths must respect.

use crate::enums::{EditionStatus, HistoryAction, LocationKind};
use crate::identity::{ArtworkId, EditionId, HistoryId, LocationId, Timestamp, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// ARTWORK
// ============================================================================

/// A work in the artist's catalog. Titles are bilingual (English/Chinese);
/// either may be empty but not both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artwork {
    pub artwork_id: ArtworkId,
    pub user_id: UserId,
    pub title_en: String,
    pub title_zh: String,
    pub year: Option<i32>,
    pub artwork_type: Option<String>,
    pub dimensions: Option<String>,
    pub materials: Option<String>,
    pub duration: Option<String>,
    /// Provenance of imported records; also the primary dedup key for imports.
    pub source_url: Option<String>,
    pub thumbnail_url: Option<String>,
    /// Soft-delete marker. Non-null rows are invisible to every read tool.
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Artwork {
    /// Whether this artwork is soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Display title: prefers the English title, falls back to Chinese.
    pub fn display_title(&self) -> &str {
        if self.title_en.is_empty() {
            &self.title_zh
        } else {
            &self.title_en
        }
    }
}

// ============================================================================
// EDITION
// ============================================================================

/// One physical/numbered instance of an Artwork.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edition {
    pub edition_id: EditionId,
    pub artwork_id: ArtworkId,
    pub edition_number: Option<String>,
    pub status: EditionStatus,
    pub location_id: Option<LocationId>,
    pub sale_price: Option<f64>,
    pub sale_currency: Option<String>,
    pub buyer: Option<String>,
    pub sale_date: Option<NaiveDate>,
    pub condition: Option<String>,
    pub storage_detail: Option<String>,
    pub consignment_start: Option<NaiveDate>,
    pub consignment_end: Option<NaiveDate>,
    pub loan_start: Option<NaiveDate>,
    pub loan_end: Option<NaiveDate>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Partial update payload for an edition. Every field is optional; the
/// confirmation protocol round-trips this value verbatim between its two
/// phases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EditionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<LocationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consignment_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consignment_end: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_end: Option<NaiveDate>,
}

impl EditionUpdate {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.location_id.is_none()
            && self.sale_price.is_none()
            && self.sale_currency.is_none()
            && self.buyer.is_none()
            && self.sale_date.is_none()
            && self.condition.is_none()
            && self.storage_detail.is_none()
            && self.consignment_start.is_none()
            && self.consignment_end.is_none()
            && self.loan_start.is_none()
            && self.loan_end.is_none()
    }

    /// Apply this update to an edition in place.
    pub fn apply_to(&self, edition: &mut Edition) {
        if let Some(status) = self.status {
            edition.status = status;
        }
        if let Some(location_id) = self.location_id {
            edition.location_id = Some(location_id);
        }
        if let Some(price) = self.sale_price {
            edition.sale_price = Some(price);
        }
        if let Some(ref currency) = self.sale_currency {
            edition.sale_currency = Some(currency.clone());
        }
        if let Some(ref buyer) = self.buyer {
            edition.buyer = Some(buyer.clone());
        }
        if let Some(date) = self.sale_date {
            edition.sale_date = Some(date);
        }
        if let Some(ref condition) = self.condition {
            edition.condition = Some(condition.clone());
        }
        if let Some(ref detail) = self.storage_detail {
            edition.storage_detail = Some(detail.clone());
        }
        if let Some(date) = self.consignment_start {
            edition.consignment_start = Some(date);
        }
        if let Some(date) = self.consignment_end {
            edition.consignment_end = Some(date);
        }
        if let Some(date) = self.loan_start {
            edition.loan_start = Some(date);
        }
        if let Some(date) = self.loan_end {
            edition.loan_end = Some(date);
        }
    }
}

// ============================================================================
// LOCATION
// ============================================================================

/// A gallery, museum, studio, or other place editions live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub location_id: LocationId,
    pub user_id: UserId,
    pub kind: LocationKind,
    pub name: String,
    pub city: Option<String>,
    pub country: Option<String>,
}

// ============================================================================
// EDITION HISTORY
// ============================================================================

/// Append-only log entry for an edition. Never updated or deleted once
/// written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditionHistory {
    pub history_id: HistoryId,
    pub edition_id: EditionId,
    pub action: HistoryAction,
    pub occurred_at: Timestamp,
    pub related_party: Option<String>,
    pub note: Option<String>,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::new_entity_id;
    use chrono::Utc;

    fn sample_edition() -> Edition {
        Edition {
            edition_id: new_entity_id(),
            artwork_id: new_entity_id(),
            edition_number: Some("1/3".to_string()),
            status: EditionStatus::InStudio,
            location_id: None,
            sale_price: None,
            sale_currency: None,
            buyer: None,
            sale_date: None,
            condition: None,
            storage_detail: None,
            consignment_start: None,
            consignment_end: None,
            loan_start: None,
            loan_end: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_update_is_empty() {
        assert!(EditionUpdate::default().is_empty());
        let update = EditionUpdate {
            status: Some(EditionStatus::Sold),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_apply_to_touches_only_set_fields() {
        let mut edition = sample_edition();
        edition.condition = Some("pristine".to_string());

        let update = EditionUpdate {
            status: Some(EditionStatus::Sold),
            sale_price: Some(5000.0),
            ..Default::default()
        };
        update.apply_to(&mut edition);

        assert_eq!(edition.status, EditionStatus::Sold);
        assert_eq!(edition.sale_price, Some(5000.0));
        // Untouched fields survive
        assert_eq!(edition.condition.as_deref(), Some("pristine"));
        assert_eq!(edition.edition_number.as_deref(), Some("1/3"));
    }

    #[test]
    fn test_display_title_prefers_english() {
        let mut artwork = Artwork {
            artwork_id: new_entity_id(),
            user_id: new_entity_id(),
            title_en: "Clouds".to_string(),
            title_zh: "云".to_string(),
            year: Some(2021),
            artwork_type: None,
            dimensions: None,
            materials: None,
            duration: None,
            source_url: None,
            thumbnail_url: None,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(artwork.display_title(), "Clouds");
        artwork.title_en.clear();
        assert_eq!(artwork.display_title(), "云");
    }

    #[test]
    fn test_update_serde_skips_unset_fields() {
        let update = EditionUpdate {
            status: Some(EditionStatus::Sold),
            ..Default::default()
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, "{\"status\":\"sold\"}");
    }
}
