use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shared_database::DbError;
use shared_models::auth::UserType;
use shared_models::error::{AppError, FieldErrors};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BloodGroup {
    pub id: i64,
    pub name: String,
}

// ==============================================================================
// DONORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donor {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub blood_group_id: Option<i64>,
    pub blood_group: Option<String>,
    pub donations_count: i64,
    pub last_donation_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A saved donor plus advisory notes (e.g. the senior donor age caveat).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorResponse {
    #[serde(flatten)]
    pub donor: Donor,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DonorPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// Required on create, optional on update.
    pub password: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub blood_group_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DonorQuery {
    pub search: Option<String>,
    pub blood_group_id: Option<i64>,
    pub gender: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

// ==============================================================================
// HOSPITALS AND BLOOD CENTERS
// ==============================================================================

/// Hospitals and blood centers share a shape: one row plus one staff account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstitutionKind {
    Hospital,
    BloodCenter,
}

impl InstitutionKind {
    pub fn table(&self) -> &'static str {
        match self {
            InstitutionKind::Hospital => "hospitals",
            InstitutionKind::BloodCenter => "blood_centers",
        }
    }

    pub fn staff_type(&self) -> UserType {
        match self {
            InstitutionKind::Hospital => UserType::HospitalStaff,
            InstitutionKind::BloodCenter => UserType::CenterStaff,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InstitutionKind::Hospital => "Hospital",
            InstitutionKind::BloodCenter => "Blood center",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstitutionPayload {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstitutionQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

// ==============================================================================
// RECIPIENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: i64,
    pub hospital_id: i64,
    pub hospital_name: String,
    pub name: String,
    pub id_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub blood_group_id: i64,
    pub blood_group: String,
    pub medical_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipientPayload {
    /// Required for system users; hospital staff always register for their own hospital.
    pub hospital_id: Option<i64>,
    pub name: Option<String>,
    pub id_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub blood_group_id: Option<i64>,
    pub medical_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipientQuery {
    pub search: Option<String>,
    pub hospital_id: Option<i64>,
    pub blood_group_id: Option<i64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub const GENDERS: &[&str] = &["male", "female", "other"];

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("You are not allowed to perform this action")]
    Forbidden,

    #[error("{0}")]
    InUse(String),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Password hashing error: {0}")]
    Hashing(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl From<FieldErrors> for RegistryError {
    fn from(errors: FieldErrors) -> Self {
        RegistryError::Validation(errors)
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) => AppError::NotFound(err.to_string()),
            RegistryError::Forbidden => AppError::Forbidden(err.to_string()),
            RegistryError::InUse(msg) => AppError::State(msg),
            RegistryError::Validation(errors) => AppError::ValidationError(errors),
            RegistryError::Hashing(msg) => AppError::Internal(msg),
            RegistryError::Database(e) => AppError::Database(e.to_string()),
            RegistryError::Storage(e) => AppError::Database(e.to_string()),
        }
    }
}
