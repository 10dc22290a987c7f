use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shared_database::DbError;
use shared_models::error::{AppError, FieldErrors};
use shared_models::sql_text_enum;

use crate::services::eligibility::{VolumeLimits, VolumeVerdict};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningStatus {
    #[default]
    NotScreened,
    Passed,
    Failed,
}

impl ScreeningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreeningStatus::NotScreened => "not_screened",
            ScreeningStatus::Passed => "passed",
            ScreeningStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ScreeningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScreeningStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_screened" => Ok(ScreeningStatus::NotScreened),
            "passed" => Ok(ScreeningStatus::Passed),
            "failed" => Ok(ScreeningStatus::Failed),
            other => Err(format!("unknown screening status: {}", other)),
        }
    }
}

sql_text_enum!(ScreeningStatus);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: i64,
    pub user_id: i64,
    pub donor_name: String,
    pub blood_center_id: i64,
    pub blood_center_name: String,
    pub blood_group_id: i64,
    pub blood_group: String,
    pub appointment_id: Option<i64>,
    pub blood_request_item_id: Option<i64>,
    pub item_code: Option<String>,
    pub volume_ml: i64,
    pub weight: Option<f64>,
    pub donation_date_time: DateTime<Utc>,
    pub screening_status: ScreeningStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDonation {
    pub user_id: Option<i64>,
    /// Center staff always record for their own center.
    pub blood_center_id: Option<i64>,
    pub appointment_id: Option<i64>,
    pub blood_request_item_id: Option<i64>,
    pub volume_ml: Option<i64>,
    pub weight: Option<f64>,
    pub donation_date_time: Option<DateTime<Utc>>,
    pub screening_status: Option<ScreeningStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDonation {
    pub blood_request_item_id: Option<i64>,
    pub volume_ml: Option<i64>,
    pub weight: Option<f64>,
    pub donation_date_time: Option<DateTime<Utc>>,
    pub screening_status: Option<ScreeningStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DonationQuery {
    pub search: Option<String>,
    pub blood_center_id: Option<i64>,
    pub user_id: Option<i64>,
    pub blood_group_id: Option<i64>,
    pub screening_status: Option<ScreeningStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EligibilityRequest {
    pub weight: Option<f64>,
    pub volume_ml: Option<f64>,
}

/// Public answer of the eligibility check; `eligible` is null when unknown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityResponse {
    pub eligible: Option<bool>,
    pub assessment: Option<VolumeVerdict>,
    pub message: String,
    pub limits: Option<VolumeLimits>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DonationError {
    #[error("Donation not found")]
    NotFound,

    #[error("You are not allowed to manage donations of this blood center")]
    Forbidden,

    #[error("Appointment is {0} and can no longer take a donation")]
    AppointmentClosed(String),

    #[error("Blood request item {code} is {status} and cannot receive donations")]
    ItemClosed { code: String, status: String },

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl From<FieldErrors> for DonationError {
    fn from(errors: FieldErrors) -> Self {
        DonationError::Validation(errors)
    }
}

impl From<DonationError> for AppError {
    fn from(err: DonationError) -> Self {
        match err {
            DonationError::NotFound => AppError::NotFound(err.to_string()),
            DonationError::Forbidden => AppError::Forbidden(err.to_string()),
            DonationError::AppointmentClosed(_) | DonationError::ItemClosed { .. } => {
                AppError::State(err.to_string())
            }
            DonationError::Validation(errors) => AppError::ValidationError(errors),
            DonationError::Database(e) => AppError::Database(e.to_string()),
            DonationError::Storage(e) => AppError::Database(e.to_string()),
        }
    }
}
