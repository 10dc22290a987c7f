use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shared_database::DbError;
use shared_models::error::{AppError, FieldErrors};
use shared_models::pagination::SortDirection;
use shared_models::sql_text_enum;

// ==============================================================================
// STATUS ENUMS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Partial,
    Fulfilled,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Partial => "partial",
            RequestStatus::Fulfilled => "fulfilled",
            RequestStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "partial" => Ok(RequestStatus::Partial),
            "fulfilled" => Ok(RequestStatus::Fulfilled),
            "cancelled" => Ok(RequestStatus::Cancelled),
            other => Err(format!("unknown request status: {}", other)),
        }
    }
}

sql_text_enum!(RequestStatus);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Approved,
    Fulfilled,
    Cancelled,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Approved => "approved",
            ItemStatus::Fulfilled => "fulfilled",
            ItemStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ItemStatus::Pending),
            "approved" => Ok(ItemStatus::Approved),
            "fulfilled" => Ok(ItemStatus::Fulfilled),
            "cancelled" => Ok(ItemStatus::Cancelled),
            other => Err(format!("unknown item status: {}", other)),
        }
    }
}

sql_text_enum!(ItemStatus);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Urgent,
    Normal,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Urgent => "urgent",
            Urgency::Normal => "normal",
            Urgency::Low => "low",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "urgent" => Ok(Urgency::Urgent),
            "normal" => Ok(Urgency::Normal),
            "low" => Ok(Urgency::Low),
            other => Err(format!("unknown urgency: {}", other)),
        }
    }
}

sql_text_enum!(Urgency);

// ==============================================================================
// STORED RECORDS AND VIEW MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodRequest {
    pub id: i64,
    pub hospital_id: i64,
    pub hospital_name: String,
    pub request_date: NaiveDate,
    pub notes: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodRequestItem {
    pub id: i64,
    pub blood_request_id: i64,
    pub blood_group_id: i64,
    pub blood_group: String,
    pub recipient_id: Option<i64>,
    pub recipient_name: Option<String>,
    pub units_requested: i64,
    pub units_fulfilled: i64,
    pub urgency: Urgency,
    pub status: ItemStatus,
    pub unique_code: String,
    pub is_general: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodRequestDetail {
    #[serde(flatten)]
    pub request: BloodRequest,
    pub items: Vec<BloodRequestItem>,
    pub can_edit: bool,
    pub can_delete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodRequestSummary {
    #[serde(flatten)]
    pub request: BloodRequest,
    pub items_count: i64,
    pub total_units: i64,
    pub has_urgent: bool,
}

// ==============================================================================
// REQUEST PAYLOADS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipientData {
    pub name: Option<String>,
    pub id_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub blood_group_id: Option<i64>,
    pub medical_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemPayload {
    pub id: Option<i64>,
    pub blood_group_id: Option<i64>,
    pub units_requested: Option<i64>,
    pub urgency: Option<String>,
    pub recipient_id: Option<i64>,
    pub recipient_data: Option<RecipientData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBloodRequest {
    /// Required for system users; hospital staff always file for their own hospital.
    pub hospital_id: Option<i64>,
    pub request_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemPayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBloodRequest {
    pub request_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemStatusChange {
    pub status: ItemStatus,
}

/// Where an item's recipient comes from once the payload is validated.
#[derive(Debug, Clone, PartialEq)]
pub enum RecipientRef {
    General,
    Existing(i64),
    New(NewRecipient),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipient {
    pub name: String,
    pub id_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub blood_group_id: i64,
    pub medical_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub id: Option<i64>,
    pub blood_group_id: i64,
    pub units_requested: i64,
    pub urgency: Urgency,
    pub recipient: RecipientRef,
}

impl ItemPayload {
    /// Shape checks that need no database access. Field names are relative
    /// to the item; callers prefix them with `items.{index}`.
    pub fn validate(&self) -> Result<ItemDraft, FieldErrors> {
        let mut errors = FieldErrors::new();

        let blood_group_id = match self.blood_group_id {
            Some(id) => id,
            None => {
                errors.add("blood_group_id", "The blood group field is required.");
                0
            }
        };

        let units_requested = match self.units_requested {
            Some(units) if units > 0 => units,
            Some(_) => {
                errors.add("units_requested", "The units requested must be at least 1.");
                0
            }
            None => {
                errors.add("units_requested", "The units requested field is required.");
                0
            }
        };

        let urgency = match self.urgency.as_deref().map(str::parse::<Urgency>) {
            Some(Ok(urgency)) => urgency,
            Some(Err(_)) => {
                errors.add("urgency", "The urgency must be one of: urgent, normal, low.");
                Urgency::Normal
            }
            None => {
                errors.add("urgency", "The urgency field is required.");
                Urgency::Normal
            }
        };

        let recipient = match (self.recipient_id, &self.recipient_data) {
            (Some(id), _) => RecipientRef::Existing(id),
            (None, Some(data)) => {
                let name = data.name.as_deref().map(str::trim).unwrap_or_default();
                if name.is_empty() {
                    errors.add("recipient_data.name", "The recipient name field is required.");
                }
                RecipientRef::New(NewRecipient {
                    name: name.to_string(),
                    id_number: data.id_number.clone(),
                    date_of_birth: data.date_of_birth,
                    gender: data.gender.clone(),
                    blood_group_id: data.blood_group_id.unwrap_or(blood_group_id),
                    medical_notes: data.medical_notes.clone(),
                })
            }
            (None, None) => RecipientRef::General,
        };

        errors.into_result()?;

        Ok(ItemDraft {
            id: self.id,
            blood_group_id,
            units_requested,
            urgency,
            recipient,
        })
    }
}

/// Validate the item list of a create/update payload.
pub fn validate_items(items: &[ItemPayload], errors: &mut FieldErrors) -> Vec<ItemDraft> {
    if items.is_empty() {
        errors.add("items", "At least one blood request item is required.");
    }

    let mut drafts = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match item.validate() {
            Ok(draft) => drafts.push(draft),
            Err(item_errors) => errors.merge_prefixed(&format!("items.{}", index), item_errors),
        }
    }
    drafts
}

// ==============================================================================
// LISTING
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestSortField {
    RequestDate,
    #[default]
    CreatedAt,
    HospitalName,
    Status,
}

impl RequestSortField {
    pub fn column(&self) -> &'static str {
        match self {
            RequestSortField::RequestDate => "br.request_date",
            RequestSortField::CreatedAt => "br.created_at",
            RequestSortField::HospitalName => "h.name",
            RequestSortField::Status => "br.status",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BloodRequestQuery {
    pub search: Option<String>,
    pub status: Option<RequestStatus>,
    pub hospital_id: Option<i64>,
    pub urgency: Option<Urgency>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    #[serde(default)]
    pub sort_by: RequestSortField,
    #[serde(default)]
    pub sort_direction: SortDirection,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BloodRequestError {
    #[error("Blood request not found")]
    NotFound,

    #[error("Blood request item not found")]
    ItemNotFound,

    #[error("You are not allowed to manage blood requests of this hospital")]
    Forbidden,

    #[error("Cannot {action} a blood request that is {status}")]
    InvalidState {
        action: &'static str,
        status: RequestStatus,
    },

    #[error("Cannot change item status from {from} to {to}")]
    InvalidItemTransition { from: ItemStatus, to: ItemStatus },

    #[error("Item {code} is {status} and can no longer be changed")]
    ItemLocked { code: String, status: ItemStatus },

    #[error("Item {code} has {donations} donation(s) recorded against it")]
    ItemHasDonations { code: String, donations: i64 },

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl BloodRequestError {
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            BloodRequestError::InvalidState { .. }
                | BloodRequestError::InvalidItemTransition { .. }
                | BloodRequestError::ItemLocked { .. }
                | BloodRequestError::ItemHasDonations { .. }
        )
    }
}

impl From<FieldErrors> for BloodRequestError {
    fn from(errors: FieldErrors) -> Self {
        BloodRequestError::Validation(errors)
    }
}

impl From<BloodRequestError> for AppError {
    fn from(err: BloodRequestError) -> Self {
        match err {
            BloodRequestError::NotFound | BloodRequestError::ItemNotFound => {
                AppError::NotFound(err.to_string())
            }
            BloodRequestError::Forbidden => AppError::Forbidden(err.to_string()),
            BloodRequestError::Validation(errors) => AppError::ValidationError(errors),
            BloodRequestError::Database(e) => AppError::Database(e.to_string()),
            BloodRequestError::Storage(e) => AppError::Database(e.to_string()),
            state => AppError::State(state.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(blood_group_id: Option<i64>, units: Option<i64>, urgency: Option<&str>) -> ItemPayload {
        ItemPayload {
            blood_group_id,
            units_requested: units,
            urgency: urgency.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_general_item_validates() {
        let draft = item(Some(1), Some(2), Some("urgent")).validate().unwrap();
        assert_eq!(draft.units_requested, 2);
        assert_eq!(draft.urgency, Urgency::Urgent);
        assert_eq!(draft.recipient, RecipientRef::General);
    }

    #[test]
    fn test_units_must_be_positive() {
        for units in [0, -3] {
            let errors = item(Some(1), Some(units), Some("low")).validate().unwrap_err();
            assert!(errors.contains("units_requested"));
        }
    }

    #[test]
    fn test_missing_fields_reported_together() {
        let errors = item(None, None, Some("whenever")).validate().unwrap_err();
        assert!(errors.contains("blood_group_id"));
        assert!(errors.contains("units_requested"));
        assert!(errors.contains("urgency"));
    }

    #[test]
    fn test_new_recipient_inherits_item_blood_group() {
        let mut payload = item(Some(4), Some(1), Some("normal"));
        payload.recipient_data = Some(RecipientData {
            name: Some("  Jane Roe ".to_string()),
            ..Default::default()
        });

        let draft = payload.validate().unwrap();
        match draft.recipient {
            RecipientRef::New(recipient) => {
                assert_eq!(recipient.name, "Jane Roe");
                assert_eq!(recipient.blood_group_id, 4);
            }
            other => panic!("unexpected recipient {:?}", other),
        }
    }

    #[test]
    fn test_recipient_id_wins_over_recipient_data() {
        let mut payload = item(Some(1), Some(1), Some("normal"));
        payload.recipient_id = Some(9);
        payload.recipient_data = Some(RecipientData::default());
        assert_eq!(payload.validate().unwrap().recipient, RecipientRef::Existing(9));
    }

    #[test]
    fn test_item_errors_are_prefixed() {
        let mut errors = FieldErrors::new();
        let drafts = validate_items(
            &[item(Some(1), Some(1), Some("low")), item(Some(1), Some(0), Some("low"))],
            &mut errors,
        );
        assert_eq!(drafts.len(), 1);
        assert!(errors.contains("items.1.units_requested"));

        let mut errors = FieldErrors::new();
        validate_items(&[], &mut errors);
        assert!(errors.contains("items"));
    }
}
