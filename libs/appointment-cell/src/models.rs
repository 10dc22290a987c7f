use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shared_database::DbError;
use shared_models::error::{AppError, FieldErrors};
use shared_models::sql_text_enum;

// ==============================================================================
// APPOINTMENT STATUS
// ==============================================================================

/// Canonical appointment statuses. Legacy names are accepted on input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[serde(alias = "pending")]
    Scheduled,

    #[serde(alias = "accepted")]
    Confirmed,

    Completed,

    #[serde(alias = "rejected")]
    Cancelled,

    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    /// Scheduled and confirmed appointments still expect the donor.
    pub fn is_open(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" | "pending" => Ok(AppointmentStatus::Scheduled),
            "confirmed" | "accepted" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" | "rejected" => Ok(AppointmentStatus::Cancelled),
            "no_show" => Ok(AppointmentStatus::NoShow),
            other => Err(format!("unknown appointment status: {}", other)),
        }
    }
}

sql_text_enum!(AppointmentStatus);

// ==============================================================================
// CORE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub user_id: i64,
    pub donor_name: String,
    pub blood_center_id: i64,
    pub blood_center_name: String,
    pub appointment_date: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    /// Ignored for donors, who always book for themselves.
    pub user_id: Option<i64>,
    pub blood_center_id: Option<i64>,
    pub appointment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub appointment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentQuery {
    pub status: Option<AppointmentStatus>,
    pub blood_center_id: Option<i64>,
    pub user_id: Option<i64>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Unauthorized access to appointment")]
    Forbidden,

    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment cannot be modified in current status: {0}")]
    NotModifiable(AppointmentStatus),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl From<FieldErrors> for AppointmentError {
    fn from(errors: FieldErrors) -> Self {
        AppointmentError::Validation(errors)
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::Forbidden => AppError::Forbidden(err.to_string()),
            AppointmentError::InvalidStatusTransition { .. } | AppointmentError::NotModifiable(_) => {
                AppError::State(err.to_string())
            }
            AppointmentError::Validation(errors) => AppError::ValidationError(errors),
            AppointmentError::Database(e) => AppError::Database(e.to_string()),
            AppointmentError::Storage(e) => AppError::Database(e.to_string()),
        }
    }
}
