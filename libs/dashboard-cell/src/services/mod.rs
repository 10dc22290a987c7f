// =====================================================================================
// DASHBOARD SERVICE
// =====================================================================================

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{debug, instrument};

use shared_utils::scope::Scope;

use crate::models::{
    CenterDashboard, CountByLabel, Dashboard, DashboardError, DonorDashboard, HospitalDashboard,
    MonthlyDonations, SystemDashboard,
};
use crate::repository;

pub const RECENT_LIMIT: i64 = 5;
pub const TREND_MONTHS: u32 = 6;

const REQUEST_STATUSES: &[&str] = &["pending", "approved", "partial", "fulfilled", "cancelled"];
const URGENCIES: &[&str] = &["urgent", "normal", "low"];
const SCREENING_STATUSES: &[&str] = &["not_screened", "passed", "failed"];
const APPOINTMENT_STATUSES: &[&str] = &["scheduled", "confirmed", "completed", "cancelled", "no_show"];

pub struct DashboardService;

impl Default for DashboardService {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardService {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, conn))]
    pub fn build(&self, conn: &Connection, scope: &Scope, now: DateTime<Utc>) -> Result<Dashboard, DashboardError> {
        let dashboard = match scope {
            Scope::System => Dashboard::System(self.system(conn, now)?),
            Scope::Hospital(id) => Dashboard::Hospital(self.hospital(conn, *id)?),
            Scope::BloodCenter(id) => Dashboard::BloodCenter(self.center(conn, *id, now)?),
            Scope::Donor(id) => Dashboard::Donor(self.donor(conn, *id, now)?),
            Scope::Customer(_) => return Err(DashboardError::Forbidden),
        };
        debug!("Built dashboard for {:?}", scope);
        Ok(dashboard)
    }

    fn system(&self, conn: &Connection, now: DateTime<Utc>) -> Result<SystemDashboard, DashboardError> {
        let months = trailing_months(now.date_naive(), TREND_MONTHS);
        Ok(SystemDashboard {
            totals: repository::totals(conn)?,
            requests_by_status: fill_counts(REQUEST_STATUSES, repository::requests_by_status(conn, None)?),
            items_by_urgency: fill_counts(URGENCIES, repository::items_by_urgency(conn, None)?),
            volume_by_blood_group: repository::volume_by_blood_group(conn, None)?,
            monthly_donations: fill_months(&months, repository::monthly_donations(conn, None, since(&months))?),
            recent_requests: repository::recent_requests(conn, None, RECENT_LIMIT)?,
            recent_donations: repository::recent_donations(conn, RECENT_LIMIT)?,
        })
    }

    fn hospital(&self, conn: &Connection, hospital_id: i64) -> Result<HospitalDashboard, DashboardError> {
        let items = repository::items_by_status(conn, Some(hospital_id))?;
        let total_items: i64 = items.iter().map(|c| c.count).sum();
        let served: i64 = items
            .iter()
            .filter(|c| c.label == "approved" || c.label == "fulfilled")
            .map(|c| c.count)
            .sum();

        Ok(HospitalDashboard {
            hospital_id,
            requests_by_status: fill_counts(
                REQUEST_STATUSES,
                repository::requests_by_status(conn, Some(hospital_id))?,
            ),
            items_by_urgency: fill_counts(URGENCIES, repository::items_by_urgency(conn, Some(hospital_id))?),
            total_items,
            fulfillment_rate: fulfillment_rate(served, total_items),
            recipients_count: repository::recipients_count(conn, hospital_id)?,
            recent_requests: repository::recent_requests(conn, Some(hospital_id), RECENT_LIMIT)?,
        })
    }

    fn center(
        &self,
        conn: &Connection,
        blood_center_id: i64,
        now: DateTime<Utc>,
    ) -> Result<CenterDashboard, DashboardError> {
        let (donations_count, total_volume_ml, _) =
            repository::donation_summary(conn, Some(blood_center_id), None)?;
        let months = trailing_months(now.date_naive(), TREND_MONTHS);

        Ok(CenterDashboard {
            blood_center_id,
            donations_count,
            total_volume_ml,
            volume_by_blood_group: repository::volume_by_blood_group(conn, Some(blood_center_id))?,
            screening_breakdown: fill_counts(
                SCREENING_STATUSES,
                repository::screening_breakdown(conn, blood_center_id)?,
            ),
            appointments_by_status: fill_counts(
                APPOINTMENT_STATUSES,
                repository::appointments_by_status(conn, blood_center_id)?,
            ),
            upcoming_appointments: repository::upcoming_appointments(
                conn,
                Some(blood_center_id),
                None,
                now,
                RECENT_LIMIT,
            )?,
            monthly_donations: fill_months(
                &months,
                repository::monthly_donations(conn, Some(blood_center_id), since(&months))?,
            ),
        })
    }

    fn donor(&self, conn: &Connection, user_id: i64, now: DateTime<Utc>) -> Result<DonorDashboard, DashboardError> {
        let (donations_count, total_volume_ml, last_donation_date) =
            repository::donation_summary(conn, None, Some(user_id))?;

        Ok(DonorDashboard {
            donations_count,
            total_volume_ml,
            last_donation_date,
            upcoming_appointments: repository::upcoming_appointments(
                conn,
                None,
                Some(user_id),
                now,
                RECENT_LIMIT,
            )?,
        })
    }
}

/// Percentage with one decimal; 0 when there is nothing to serve.
pub fn fulfillment_rate(served: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (served as f64 * 1000.0 / total as f64).round() / 10.0
}

/// `count` months ending with the month of `today`, oldest first, as `YYYY-MM`.
pub fn trailing_months(today: NaiveDate, count: u32) -> Vec<String> {
    let first_of_month = today.with_day(1).unwrap_or(today);
    (0..count.max(1))
        .rev()
        .filter_map(|back| first_of_month.checked_sub_months(Months::new(back)))
        .map(|d| d.format("%Y-%m").to_string())
        .collect()
}

fn since(months: &[String]) -> &str {
    months.first().map(String::as_str).unwrap_or_default()
}

/// Every known label in order, zero where the query returned nothing.
fn fill_counts(labels: &[&str], rows: Vec<CountByLabel>) -> Vec<CountByLabel> {
    labels
        .iter()
        .map(|label| CountByLabel {
            label: label.to_string(),
            count: rows.iter().find(|r| r.label == *label).map_or(0, |r| r.count),
        })
        .collect()
}

fn fill_months(months: &[String], rows: Vec<MonthlyDonations>) -> Vec<MonthlyDonations> {
    months
        .iter()
        .map(|month| {
            rows.iter()
                .find(|r| &r.month == month)
                .cloned()
                .unwrap_or_else(|| MonthlyDonations {
                    month: month.clone(),
                    donations: 0,
                    volume_ml: 0,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fulfillment_rate_rounds_to_one_decimal() {
        assert_eq!(fulfillment_rate(0, 0), 0.0);
        assert_eq!(fulfillment_rate(1, 3), 33.3);
        assert_eq!(fulfillment_rate(2, 3), 66.7);
        assert_eq!(fulfillment_rate(4, 4), 100.0);
    }

    #[test]
    fn test_trailing_months_cross_year_boundary() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            trailing_months(today, 6),
            ["2023-09", "2023-10", "2023-11", "2023-12", "2024-01", "2024-02"]
        );
    }

    #[test]
    fn test_fill_counts_keeps_label_order() {
        let rows = vec![CountByLabel { label: "low".to_string(), count: 2 }];
        let filled = fill_counts(URGENCIES, rows);
        assert_eq!(
            filled.iter().map(|c| (c.label.as_str(), c.count)).collect::<Vec<_>>(),
            [("urgent", 0), ("normal", 0), ("low", 2)]
        );
    }
}
