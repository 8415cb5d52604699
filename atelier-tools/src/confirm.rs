//! Two-phase confirmation protocol for edition updates.
//!
//! Phase 1 ([`generate_update_confirmation`]) builds a diff-preview card
//! without touching storage. Phase 2 ([`execute_edition_update`]) applies the
//! update and appends the matching history entry. The card is never
//! persisted: authority to apply lives entirely in the caller re-submitting
//! the same edition id and payload after the user confirms. A model
//! "thinking out loud" about a hypothetical update therefore cannot cause a
//! write.

use crate::locale::localize;
use crate::registry::ToolOutcome;
use crate::ToolContext;
use atelier_core::{
    new_entity_id, Edition, EditionHistory, EditionId, EditionStatus, EditionUpdate,
    HistoryAction,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

// ============================================================================
// INPUT & CARD SHAPES
// ============================================================================

/// Shared input of both phases; the payload round-trips verbatim.
#[derive(Debug, Deserialize)]
struct UpdateInput {
    edition_id: EditionId,
    updates: EditionUpdate,
    reason: Option<String>,
}

/// Snapshot of an edition's current values, shaped for the card.
///
/// Date-range fields appear only when they are meaningful for the edition's
/// effective status (consignment for at_gallery, loan for at_museum); the
/// schema does not enforce that invariant, the card presentation does.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditionSnapshot {
    pub status: EditionStatus,
    pub location_name: Option<String>,
    pub sale_price: Option<f64>,
    pub sale_currency: Option<String>,
    pub buyer: Option<String>,
    pub sale_date: Option<NaiveDate>,
    pub condition: Option<String>,
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

/// Ephemeral preview of a proposed mutation. Exists only within one
/// request/response round-trip; the caller echoes the same edition id and
/// update payload back to phase 2 to authorize the change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmationCard {
    pub requires_confirmation: bool,
    pub edition_id: EditionId,
    pub artwork_title: String,
    pub edition_number: Option<String>,
    pub current: EditionSnapshot,
    pub proposed: EditionUpdate,
    pub reason: Option<String>,
}

fn snapshot(edition: &Edition, location_name: Option<String>, effective: EditionStatus) -> EditionSnapshot {
    EditionSnapshot {
        status: edition.status,
        location_name,
        sale_price: edition.sale_price,
        sale_currency: edition.sale_currency.clone(),
        buyer: edition.buyer.clone(),
        sale_date: edition.sale_date,
        condition: edition.condition.clone(),
        storage_detail: edition.storage_detail.clone(),
        consignment_start: edition
            .consignment_start
            .filter(|_| effective.uses_consignment_dates()),
        consignment_end: edition
            .consignment_end
            .filter(|_| effective.uses_consignment_dates()),
        loan_start: edition.loan_start.filter(|_| effective.uses_loan_dates()),
        loan_end: edition.loan_end.filter(|_| effective.uses_loan_dates()),
    }
}

// ============================================================================
// PHASE 1: DRAFT
// ============================================================================

pub async fn generate_update_confirmation(ctx: &ToolContext, args: JsonValue) -> ToolOutcome {
    let input: UpdateInput = match serde_json::from_value(args) {
        Ok(input) => input,
        Err(err) => return ToolOutcome::error(format!("Invalid input: {}", err)),
    };
    if input.updates.is_empty() {
        return ToolOutcome::error(localize(ctx.locale, "nothing_to_update", &[]));
    }

    let edition = match ctx.store.get_edition(input.edition_id, ctx.user_id).await {
        Ok(Some(edition)) => edition,
        Ok(None) => {
            return ToolOutcome::error(localize(
                ctx.locale,
                "edition_not_found",
                &[("id", &input.edition_id.to_string())],
            ))
        }
        Err(err) => return ToolOutcome::error(format!("Lookup failed: {}", err)),
    };

    let artwork_title = match ctx.store.get_artwork(edition.artwork_id, ctx.user_id).await {
        Ok(Some(artwork)) => artwork.display_title().to_string(),
        _ => String::new(),
    };
    let location_name = match edition.location_id {
        Some(id) => ctx
            .store
            .get_location(id, ctx.user_id)
            .await
            .ok()
            .flatten()
            .map(|l| l.name),
        None => None,
    };

    let effective = input.updates.status.unwrap_or(edition.status);
    let card = ConfirmationCard {
        requires_confirmation: true,
        edition_id: edition.edition_id,
        artwork_title,
        edition_number: edition.edition_number.clone(),
        current: snapshot(&edition, location_name, effective),
        proposed: input.updates,
        reason: input.reason,
    };

    let mut data = serde_json::to_value(&card).unwrap_or_else(|_| json!({}));
    data["message"] = json!(localize(ctx.locale, "confirmation_ready", &[]));
    let summary = format!(
        "Drafted confirmation card for edition {}; nothing applied yet, waiting for the user \
         to confirm",
        card.edition_id
    );
    ToolOutcome::success_with_summary(data, summary)
}

// ============================================================================
// PHASE 2: APPLY
// ============================================================================

pub async fn execute_edition_update(ctx: &ToolContext, args: JsonValue) -> ToolOutcome {
    let input: UpdateInput = match serde_json::from_value(args) {
        Ok(input) => input,
        Err(err) => return ToolOutcome::error(format!("Invalid input: {}", err)),
    };
    if input.updates.is_empty() {
        return ToolOutcome::error(localize(ctx.locale, "nothing_to_update", &[]));
    }

    let edition = match ctx.store.get_edition(input.edition_id, ctx.user_id).await {
        Ok(Some(edition)) => edition,
        Ok(None) => {
            return ToolOutcome::error(localize(
                ctx.locale,
                "edition_not_found",
                &[("id", &input.edition_id.to_string())],
            ))
        }
        Err(err) => return ToolOutcome::error(format!("Lookup failed: {}", err)),
    };

    let mut updated = edition.clone();
    input.updates.apply_to(&mut updated);
    updated.updated_at = Utc::now();

    if let Err(err) = ctx.store.update_edition(&updated, ctx.user_id).await {
        return ToolOutcome::error(format!("Update failed: {}", err));
    }

    // History append follows the mutation, in mutation order.
    let action = derive_history_action(&input.updates);
    let related_party = match action {
        HistoryAction::Sold => input.updates.buyer.clone(),
        HistoryAction::Consigned => match updated.location_id {
            Some(id) => ctx
                .store
                .get_location(id, ctx.user_id)
                .await
                .ok()
                .flatten()
                .map(|l| l.name),
            None => None,
        },
        _ => None,
    };
    let entry = EditionHistory {
        history_id: new_entity_id(),
        edition_id: updated.edition_id,
        action,
        occurred_at: Utc::now(),
        related_party,
        note: input.reason,
    };
    if let Err(err) = ctx.store.append_history(&entry).await {
        tracing::warn!(edition_id = %updated.edition_id, error = %err,
            "edition updated but history append failed");
    }

    let summary = format!(
        "Edition {} updated ({}), history recorded",
        updated.edition_id, action
    );
    ToolOutcome::success_with_summary(
        json!({
            "success": true,
            "edition_id": updated.edition_id,
            "action": action,
            "status": updated.status,
            "message": localize(ctx.locale, "update_applied", &[]),
        }),
        summary,
    )
}

/// Which history action a payload amounts to. Sale evidence wins over
/// consignment evidence, which wins over a plain status change.
fn derive_history_action(updates: &EditionUpdate) -> HistoryAction {
    let has_sale_fields = updates.sale_price.is_some()
        || updates.buyer.is_some()
        || updates.sale_date.is_some()
        || updates.sale_currency.is_some();
    let has_consignment = updates.consignment_start.is_some() || updates.consignment_end.is_some();
    let has_loan = updates.loan_start.is_some() || updates.loan_end.is_some();

    if updates.status == Some(EditionStatus::Sold) || has_sale_fields {
        HistoryAction::Sold
    } else if updates.status == Some(EditionStatus::AtGallery)
        || updates.status == Some(EditionStatus::AtMuseum)
        || has_consignment
        || has_loan
    {
        HistoryAction::Consigned
    } else if updates.status.is_some() {
        HistoryAction::StatusChange
    } else if updates.location_id.is_some() {
        HistoryAction::LocationChange
    } else {
        HistoryAction::ConditionUpdate
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;
    use atelier_core::HistoryAction;
    use atelier_store::{HistoryQuery, Store};

    fn sale_args(edition_id: EditionId) -> JsonValue {
        json!({
            "edition_id": edition_id,
            "updates": {"status": "sold", "sale_price": 5000.0, "buyer": "A. Collector"},
            "reason": "gallery sale"
        })
    }

    #[tokio::test]
    async fn test_phase_one_never_mutates_storage() {
        let fixture = Fixture::new();
        let artwork = fixture.artwork("Cloud Study", "云的研究");
        fixture.store.create_artwork(&artwork).await.unwrap();
        let edition = fixture.edition(artwork.artwork_id, EditionStatus::AtGallery);
        fixture.store.create_edition(&edition).await.unwrap();

        let outcome =
            generate_update_confirmation(&fixture.ctx(), sale_args(edition.edition_id)).await;
        assert!(!outcome.is_error());
        let data = outcome.into_json();
        assert_eq!(data["requires_confirmation"], true);
        assert_eq!(data["current"]["status"], "at_gallery");
        assert_eq!(data["proposed"]["status"], "sold");
        assert_eq!(data["artwork_title"], "Cloud Study");

        // The stored edition is untouched, and no history was appended.
        let stored = fixture
            .store
            .get_edition(edition.edition_id, fixture.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, edition);
        let history = fixture
            .store
            .list_history(&HistoryQuery::default(), fixture.user_id)
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_phase_two_applies_and_appends_one_history_entry() {
        let fixture = Fixture::new();
        let artwork = fixture.artwork("Cloud Study", "云的研究");
        fixture.store.create_artwork(&artwork).await.unwrap();
        let edition = fixture.edition(artwork.artwork_id, EditionStatus::AtGallery);
        fixture.store.create_edition(&edition).await.unwrap();

        let outcome = execute_edition_update(&fixture.ctx(), sale_args(edition.edition_id)).await;
        assert!(!outcome.is_error());
        let data = outcome.into_json();
        assert_eq!(data["success"], true);
        assert_eq!(data["status"], "sold");
        assert_eq!(data["action"], "sold");

        let stored = fixture
            .store
            .get_edition(edition.edition_id, fixture.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, EditionStatus::Sold);
        assert_eq!(stored.sale_price, Some(5000.0));

        let history = fixture
            .store
            .list_history(&HistoryQuery::default(), fixture.user_id)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, HistoryAction::Sold);
        assert_eq!(history[0].related_party.as_deref(), Some("A. Collector"));
        assert_eq!(history[0].note.as_deref(), Some("gallery sale"));
    }

    #[tokio::test]
    async fn test_unknown_edition_is_error_value_in_both_phases() {
        let fixture = Fixture::new();
        let ghost = atelier_core::new_entity_id();

        for outcome in [
            generate_update_confirmation(&fixture.ctx(), sale_args(ghost)).await,
            execute_edition_update(&fixture.ctx(), sale_args(ghost)).await,
        ] {
            assert!(outcome.is_error());
            let json = outcome.into_json();
            assert!(json["error"].as_str().unwrap().contains("not found"));
        }
    }

    #[tokio::test]
    async fn test_empty_update_rejected() {
        let fixture = Fixture::new();
        let args = json!({"edition_id": atelier_core::new_entity_id(), "updates": {}});
        let outcome = generate_update_confirmation(&fixture.ctx(), args).await;
        assert!(outcome.is_error());
    }

    #[tokio::test]
    async fn test_card_shows_only_status_relevant_date_ranges() {
        use chrono::NaiveDate;

        let fixture = Fixture::new();
        let artwork = fixture.artwork("Cloud Study", "");
        fixture.store.create_artwork(&artwork).await.unwrap();
        let mut edition = fixture.edition(artwork.artwork_id, EditionStatus::AtGallery);
        edition.consignment_start = NaiveDate::from_ymd_opt(2025, 3, 1);
        edition.loan_start = NaiveDate::from_ymd_opt(2024, 1, 1);
        fixture.store.create_edition(&edition).await.unwrap();

        // Effective status stays at_gallery: consignment dates visible, stale
        // loan dates suppressed.
        let args = json!({
            "edition_id": edition.edition_id,
            "updates": {"condition": "good"}
        });
        let data = generate_update_confirmation(&fixture.ctx(), args)
            .await
            .into_json();
        assert_eq!(data["current"]["consignment_start"], "2025-03-01");
        assert!(data["current"].get("loan_start").is_none());
    }

    #[test]
    fn test_derive_history_action_precedence() {
        let sold = EditionUpdate {
            status: Some(EditionStatus::Sold),
            ..Default::default()
        };
        assert_eq!(derive_history_action(&sold), HistoryAction::Sold);

        let sale_fields_only = EditionUpdate {
            sale_price: Some(100.0),
            ..Default::default()
        };
        assert_eq!(derive_history_action(&sale_fields_only), HistoryAction::Sold);

        let consigned = EditionUpdate {
            status: Some(EditionStatus::AtGallery),
            ..Default::default()
        };
        assert_eq!(derive_history_action(&consigned), HistoryAction::Consigned);

        let moved = EditionUpdate {
            location_id: Some(atelier_core::new_entity_id()),
            ..Default::default()
        };
        assert_eq!(derive_history_action(&moved), HistoryAction::LocationChange);

        let condition = EditionUpdate {
            condition: Some("scratched frame".to_string()),
            ..Default::default()
        };
        assert_eq!(
            derive_history_action(&condition),
            HistoryAction::ConditionUpdate
        );

        let status_only = EditionUpdate {
            status: Some(EditionStatus::InTransit),
            ..Default::default()
        };
        assert_eq!(
            derive_history_action(&status_only),
            HistoryAction::StatusChange
        );
    }

    #[tokio::test]
    async fn test_reexecution_is_not_idempotent_by_design() {
        // Submitting the same confirmed update twice applies it twice; the UI
        // is responsible for submitting phase 2 at most once per confirmation.
        let fixture = Fixture::new();
        let artwork = fixture.artwork("Cloud Study", "");
        fixture.store.create_artwork(&artwork).await.unwrap();
        let edition = fixture.edition(artwork.artwork_id, EditionStatus::AtGallery);
        fixture.store.create_edition(&edition).await.unwrap();

        execute_edition_update(&fixture.ctx(), sale_args(edition.edition_id)).await;
        execute_edition_update(&fixture.ctx(), sale_args(edition.edition_id)).await;

        let history = fixture
            .store
            .list_history(&HistoryQuery::default(), fixture.user_id)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
    }
}
