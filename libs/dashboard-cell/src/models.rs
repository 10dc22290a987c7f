// =====================================================================================
// DASHBOARD CELL MODELS
// =====================================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountByLabel {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeByBloodGroup {
    pub blood_group: String,
    pub donations: i64,
    pub volume_ml: i64,
}

/// One calendar month (`YYYY-MM`) of donations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthlyDonations {
    pub month: String,
    pub donations: i64,
    pub volume_ml: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentRequest {
    pub id: i64,
    pub hospital_name: String,
    pub request_date: NaiveDate,
    pub status: String,
    pub items_count: i64,
    pub total_units: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentDonation {
    pub id: i64,
    pub donor_name: String,
    pub blood_center_name: String,
    pub blood_group: String,
    pub volume_ml: i64,
    pub donation_date_time: DateTime<Utc>,
    pub screening_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingAppointment {
    pub id: i64,
    pub donor_name: String,
    pub blood_center_name: String,
    pub appointment_date: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Totals {
    pub donors: i64,
    pub hospitals: i64,
    pub blood_centers: i64,
    pub recipients: i64,
    pub blood_requests: i64,
    pub donations: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemDashboard {
    pub totals: Totals,
    pub requests_by_status: Vec<CountByLabel>,
    pub items_by_urgency: Vec<CountByLabel>,
    pub volume_by_blood_group: Vec<VolumeByBloodGroup>,
    pub monthly_donations: Vec<MonthlyDonations>,
    pub recent_requests: Vec<RecentRequest>,
    pub recent_donations: Vec<RecentDonation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HospitalDashboard {
    pub hospital_id: i64,
    pub requests_by_status: Vec<CountByLabel>,
    pub items_by_urgency: Vec<CountByLabel>,
    pub total_items: i64,
    /// Approved plus fulfilled items over all items, as a percentage.
    pub fulfillment_rate: f64,
    pub recipients_count: i64,
    pub recent_requests: Vec<RecentRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CenterDashboard {
    pub blood_center_id: i64,
    pub donations_count: i64,
    pub total_volume_ml: i64,
    pub volume_by_blood_group: Vec<VolumeByBloodGroup>,
    pub screening_breakdown: Vec<CountByLabel>,
    pub appointments_by_status: Vec<CountByLabel>,
    pub upcoming_appointments: Vec<UpcomingAppointment>,
    pub monthly_donations: Vec<MonthlyDonations>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorDashboard {
    pub donations_count: i64,
    pub total_volume_ml: i64,
    pub last_donation_date: Option<DateTime<Utc>>,
    pub upcoming_appointments: Vec<UpcomingAppointment>,
}

/// The dashboard shape depends on who asks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Dashboard {
    System(SystemDashboard),
    Hospital(HospitalDashboard),
    BloodCenter(CenterDashboard),
    Donor(DonorDashboard),
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("No dashboard is available for this account")]
    Forbidden,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl From<DashboardError> for AppError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::Forbidden => AppError::Forbidden(err.to_string()),
            DashboardError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
