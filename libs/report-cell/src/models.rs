use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shared_models::error::{AppError, FieldErrors};

// ==============================================================================
// REPORT KINDS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Donors,
    Recipients,
    Hospitals,
    Appointments,
    Requests,
    Donations,
    BloodCenters,
}

impl ReportType {
    pub fn slug(&self) -> &'static str {
        match self {
            ReportType::Donors => "donors",
            ReportType::Recipients => "recipients",
            ReportType::Hospitals => "hospitals",
            ReportType::Appointments => "appointments",
            ReportType::Requests => "requests",
            ReportType::Donations => "donations",
            ReportType::BloodCenters => "blood_centers",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReportType::Donors => "Donors",
            ReportType::Recipients => "Recipients",
            ReportType::Hospitals => "Hospitals",
            ReportType::Appointments => "Appointments",
            ReportType::Requests => "Blood Requests",
            ReportType::Donations => "Donations",
            ReportType::BloodCenters => "Blood Centers",
        }
    }

    /// Values accepted by the `status` filter; empty when the report has none.
    pub fn statuses(&self) -> &'static [&'static str] {
        match self {
            ReportType::Appointments => &["scheduled", "confirmed", "completed", "cancelled", "no_show"],
            ReportType::Requests => &["pending", "approved", "partial", "fulfilled", "cancelled"],
            ReportType::Donations => &["not_screened", "passed", "failed"],
            _ => &[],
        }
    }

    pub fn filters(&self) -> &'static [ReportFilter] {
        use ReportFilter::*;
        match self {
            ReportType::Donors => &[DateRange, BloodGroup],
            ReportType::Recipients => &[DateRange, Hospital, BloodGroup],
            ReportType::Hospitals | ReportType::BloodCenters => &[DateRange],
            ReportType::Appointments => &[DateRange, BloodCenter, Status],
            ReportType::Requests => &[DateRange, Hospital, Status, Recipient, BloodGroup],
            ReportType::Donations => &[DateRange, Hospital, BloodCenter, Status, Recipient, BloodGroup],
        }
    }

    pub fn applies(&self, filter: ReportFilter) -> bool {
        self.filters().contains(&filter)
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ReportType {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "donors" => Ok(ReportType::Donors),
            "recipients" => Ok(ReportType::Recipients),
            "hospitals" => Ok(ReportType::Hospitals),
            "appointments" => Ok(ReportType::Appointments),
            "requests" | "blood_requests" => Ok(ReportType::Requests),
            "donations" => Ok(ReportType::Donations),
            "blood_centers" | "blood-centers" => Ok(ReportType::BloodCenters),
            other => Err(ReportError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFilter {
    DateRange,
    Hospital,
    BloodCenter,
    Status,
    Recipient,
    BloodGroup,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Pdf,
    Excel,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Excel => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "application/pdf",
            ReportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(ReportFormat::Pdf),
            "excel" | "xlsx" => Ok(ReportFormat::Excel),
            other => Err(ReportError::UnknownFormat(other.to_string())),
        }
    }
}

/// Query-string filters. Each report only honours the ones listed by
/// [`ReportType::filters`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilters {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub hospital_id: Option<i64>,
    pub blood_center_id: Option<i64>,
    pub status: Option<String>,
    pub recipient_id: Option<i64>,
    pub blood_group_id: Option<i64>,
}

// ==============================================================================
// TABULAR OUTPUT
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ReportCell {
    Text(String),
    Number(f64),
    Empty,
}

impl fmt::Display for ReportCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportCell::Text(text) => f.write_str(text),
            ReportCell::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            ReportCell::Number(n) => write!(f, "{:.1}", n),
            ReportCell::Empty => Ok(()),
        }
    }
}

impl From<String> for ReportCell {
    fn from(value: String) -> Self {
        ReportCell::Text(value)
    }
}

impl From<&str> for ReportCell {
    fn from(value: &str) -> Self {
        ReportCell::Text(value.to_string())
    }
}

impl From<i64> for ReportCell {
    fn from(value: i64) -> Self {
        ReportCell::Number(value as f64)
    }
}

impl From<f64> for ReportCell {
    fn from(value: f64) -> Self {
        ReportCell::Number(value)
    }
}

impl<T: Into<ReportCell>> From<Option<T>> for ReportCell {
    fn from(value: Option<T>) -> Self {
        value.map_or(ReportCell::Empty, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryEntry {
    pub label: String,
    pub value: ReportCell,
}

impl SummaryEntry {
    pub fn new(label: &str, value: impl Into<ReportCell>) -> Self {
        Self { label: label.to_string(), value: value.into() }
    }
}

/// Format-independent report content handed to the renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularReport {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ReportCell>>,
    pub summary: Vec<SummaryEntry>,
}

pub struct ReportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Unknown report type: {0}")]
    UnknownType(String),

    #[error("Unknown report format: {0}")]
    UnknownFormat(String),

    #[error("You are not allowed to export this report")]
    Forbidden,

    #[error("Invalid report filters: {0}")]
    Validation(FieldErrors),

    #[error("Report rendering failed: {0}")]
    Render(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl From<FieldErrors> for ReportError {
    fn from(errors: FieldErrors) -> Self {
        ReportError::Validation(errors)
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::UnknownType(_) | ReportError::UnknownFormat(_) => {
                AppError::NotFound(err.to_string())
            }
            ReportError::Forbidden => AppError::Forbidden(err.to_string()),
            ReportError::Validation(errors) => AppError::ValidationError(errors),
            ReportError::Render(e) => AppError::Internal(e),
            ReportError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

/// `no_show` -> `No Show`.
pub fn humanize(value: &str) -> String {
    value
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
