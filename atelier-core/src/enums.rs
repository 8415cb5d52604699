//! Closed enumerations for the Atelier data model.
//!
//! Every enum here is a closed set: wire values are snake_case strings, and
//! parsing an unknown value fails with the list of valid values so callers
//! (including the language model) can self-correct.

use serde::{Deserialize, Serialize};

// ============================================================================
// EDITION STATUS
// ============================================================================

/// Where an edition currently stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditionStatus {
    InProduction,
    InStudio,
    AtGallery,
    AtMuseum,
    InTransit,
    Sold,
    Gifted,
    Lost,
    Damaged,
}

impl EditionStatus {
    /// All valid statuses, in display order.
    pub const ALL: [EditionStatus; 9] = [
        EditionStatus::InProduction,
        EditionStatus::InStudio,
        EditionStatus::AtGallery,
        EditionStatus::AtMuseum,
        EditionStatus::InTransit,
        EditionStatus::Sold,
        EditionStatus::Gifted,
        EditionStatus::Lost,
        EditionStatus::Damaged,
    ];

    /// Wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            EditionStatus::InProduction => "in_production",
            EditionStatus::InStudio => "in_studio",
            EditionStatus::AtGallery => "at_gallery",
            EditionStatus::AtMuseum => "at_museum",
            EditionStatus::InTransit => "in_transit",
            EditionStatus::Sold => "sold",
            EditionStatus::Gifted => "gifted",
            EditionStatus::Lost => "lost",
            EditionStatus::Damaged => "damaged",
        }
    }

    /// Whether consignment date fields are meaningful for this status.
    pub fn uses_consignment_dates(&self) -> bool {
        matches!(self, EditionStatus::AtGallery)
    }

    /// Whether loan date fields are meaningful for this status.
    pub fn uses_loan_dates(&self) -> bool {
        matches!(self, EditionStatus::AtMuseum)
    }
}

impl std::str::FromStr for EditionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|v| v.as_str() == s)
            .copied()
            .ok_or_else(|| {
                format!(
                    "invalid status '{}', expected one of: {}",
                    s,
                    Self::ALL
                        .iter()
                        .map(|v| v.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

impl std::fmt::Display for EditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// HISTORY ACTION
// ============================================================================

/// Kind of event recorded in an edition's history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    StatusChange,
    LocationChange,
    Sold,
    Consigned,
    Returned,
    ConditionUpdate,
    FileAdded,
    FileDeleted,
    NumberAssigned,
}

impl HistoryAction {
    /// All valid actions.
    pub const ALL: [HistoryAction; 10] = [
        HistoryAction::Created,
        HistoryAction::StatusChange,
        HistoryAction::LocationChange,
        HistoryAction::Sold,
        HistoryAction::Consigned,
        HistoryAction::Returned,
        HistoryAction::ConditionUpdate,
        HistoryAction::FileAdded,
        HistoryAction::FileDeleted,
        HistoryAction::NumberAssigned,
    ];

    /// Wire name of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Created => "created",
            HistoryAction::StatusChange => "status_change",
            HistoryAction::LocationChange => "location_change",
            HistoryAction::Sold => "sold",
            HistoryAction::Consigned => "consigned",
            HistoryAction::Returned => "returned",
            HistoryAction::ConditionUpdate => "condition_update",
            HistoryAction::FileAdded => "file_added",
            HistoryAction::FileDeleted => "file_deleted",
            HistoryAction::NumberAssigned => "number_assigned",
        }
    }
}

impl std::str::FromStr for HistoryAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|v| v.as_str() == s)
            .copied()
            .ok_or_else(|| {
                format!(
                    "invalid action '{}', expected one of: {}",
                    s,
                    Self::ALL
                        .iter()
                        .map(|v| v.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// LOCATION KIND
// ============================================================================

/// Category of a physical location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Gallery,
    Museum,
    Studio,
    Other,
}

impl LocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationKind::Gallery => "gallery",
            LocationKind::Museum => "museum",
            LocationKind::Studio => "studio",
            LocationKind::Other => "other",
        }
    }
}

impl std::fmt::Display for LocationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// TESTS
// ============================================================================
