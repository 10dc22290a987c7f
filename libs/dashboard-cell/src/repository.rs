use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};

use shared_database::QueryFilter;

use crate::models::{
    CountByLabel, MonthlyDonations, RecentDonation, RecentRequest, Totals, UpcomingAppointment,
    VolumeByBloodGroup,
};

fn count(conn: &Connection, sql: &str) -> rusqlite::Result<i64> {
    conn.query_row(sql, [], |row| row.get(0))
}

pub fn totals(conn: &Connection) -> rusqlite::Result<Totals> {
    Ok(Totals {
        donors: count(conn, "SELECT COUNT(*) FROM users WHERE user_type = 'donor'")?,
        hospitals: count(conn, "SELECT COUNT(*) FROM hospitals")?,
        blood_centers: count(conn, "SELECT COUNT(*) FROM blood_centers")?,
        recipients: count(conn, "SELECT COUNT(*) FROM recipients")?,
        blood_requests: count(conn, "SELECT COUNT(*) FROM blood_requests")?,
        donations: count(conn, "SELECT COUNT(*) FROM donations")?,
    })
}

/// Run a `SELECT label, COUNT(*) ... GROUP BY label` query.
fn grouped_counts(conn: &Connection, sql: &str, filter: &QueryFilter) -> rusqlite::Result<Vec<CountByLabel>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(filter.params().as_slice(), |row| {
            Ok(CountByLabel { label: row.get(0)?, count: row.get(1)? })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ==============================================================================
// BLOOD REQUESTS
// ==============================================================================

pub fn requests_by_status(conn: &Connection, hospital_id: Option<i64>) -> rusqlite::Result<Vec<CountByLabel>> {
    let mut filter = QueryFilter::new();
    filter.push_opt("hospital_id = ?", hospital_id);
    let sql = format!(
        "SELECT status, COUNT(*) FROM blood_requests{} GROUP BY status",
        filter.where_sql()
    );
    grouped_counts(conn, &sql, &filter)
}

pub fn items_by_urgency(conn: &Connection, hospital_id: Option<i64>) -> rusqlite::Result<Vec<CountByLabel>> {
    let mut filter = QueryFilter::new();
    filter.push_opt("r.hospital_id = ?", hospital_id);
    let sql = format!(
        "SELECT i.urgency, COUNT(*)
         FROM blood_request_items i
         JOIN blood_requests r ON r.id = i.blood_request_id{}
         GROUP BY i.urgency",
        filter.where_sql()
    );
    grouped_counts(conn, &sql, &filter)
}

pub fn items_by_status(conn: &Connection, hospital_id: Option<i64>) -> rusqlite::Result<Vec<CountByLabel>> {
    let mut filter = QueryFilter::new();
    filter.push_opt("r.hospital_id = ?", hospital_id);
    let sql = format!(
        "SELECT i.status, COUNT(*)
         FROM blood_request_items i
         JOIN blood_requests r ON r.id = i.blood_request_id{}
         GROUP BY i.status",
        filter.where_sql()
    );
    grouped_counts(conn, &sql, &filter)
}

pub fn recent_requests(
    conn: &Connection,
    hospital_id: Option<i64>,
    limit: i64,
) -> rusqlite::Result<Vec<RecentRequest>> {
    let mut filter = QueryFilter::new();
    filter.push_opt("r.hospital_id = ?", hospital_id);
    let sql = format!(
        "SELECT r.id, h.name, r.request_date, r.status,
                (SELECT COUNT(*) FROM blood_request_items i WHERE i.blood_request_id = r.id),
                (SELECT COALESCE(SUM(i.units_requested), 0) FROM blood_request_items i
                 WHERE i.blood_request_id = r.id)
         FROM blood_requests r
         JOIN hospitals h ON h.id = r.hospital_id{}
         ORDER BY r.created_at DESC, r.id DESC
         LIMIT ?",
        filter.where_sql()
    );
    let mut values = filter.params();
    values.push(&limit);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(values.as_slice(), |row| {
            Ok(RecentRequest {
                id: row.get(0)?,
                hospital_name: row.get(1)?,
                request_date: row.get(2)?,
                status: row.get(3)?,
                items_count: row.get(4)?,
                total_units: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn recipients_count(conn: &Connection, hospital_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM recipients WHERE hospital_id = ?1",
        [hospital_id],
        |row| row.get(0),
    )
}

// ==============================================================================
// DONATIONS
// ==============================================================================

/// `(count, total volume, latest donation)` over the matching donations.
pub fn donation_summary(
    conn: &Connection,
    blood_center_id: Option<i64>,
    user_id: Option<i64>,
) -> rusqlite::Result<(i64, i64, Option<DateTime<Utc>>)> {
    let mut filter = QueryFilter::new();
    filter
        .push_opt("blood_center_id = ?", blood_center_id)
        .push_opt("user_id = ?", user_id);
    let sql = format!(
        "SELECT COUNT(*), COALESCE(SUM(volume_ml), 0), MAX(donation_date_time) FROM donations{}",
        filter.where_sql()
    );
    conn.query_row(&sql, filter.params().as_slice(), |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    })
}

/// Volume of donations that passed screening, per blood group.
pub fn volume_by_blood_group(
    conn: &Connection,
    blood_center_id: Option<i64>,
) -> rusqlite::Result<Vec<VolumeByBloodGroup>> {
    let mut filter = QueryFilter::new();
    filter
        .push_raw("d.screening_status = 'passed'")
        .push_opt("d.blood_center_id = ?", blood_center_id);
    let sql = format!(
        "SELECT bg.name, COUNT(*), COALESCE(SUM(d.volume_ml), 0)
         FROM donations d
         JOIN blood_groups bg ON bg.id = d.blood_group_id{}
         GROUP BY bg.id, bg.name
         ORDER BY bg.id",
        filter.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(filter.params().as_slice(), |row| {
            Ok(VolumeByBloodGroup {
                blood_group: row.get(0)?,
                donations: row.get(1)?,
                volume_ml: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Donations per `YYYY-MM` from `since_month` onwards. Months without
/// donations are absent.
pub fn monthly_donations(
    conn: &Connection,
    blood_center_id: Option<i64>,
    since_month: &str,
) -> rusqlite::Result<Vec<MonthlyDonations>> {
    let mut filter = QueryFilter::new();
    filter
        .push("substr(donation_date_time, 1, 7) >= ?", since_month.to_string())
        .push_opt("blood_center_id = ?", blood_center_id);
    let sql = format!(
        "SELECT substr(donation_date_time, 1, 7) AS month, COUNT(*), COALESCE(SUM(volume_ml), 0)
         FROM donations{}
         GROUP BY month
         ORDER BY month",
        filter.where_sql()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(filter.params().as_slice(), |row| {
            Ok(MonthlyDonations {
                month: row.get(0)?,
                donations: row.get(1)?,
                volume_ml: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn screening_breakdown(conn: &Connection, blood_center_id: i64) -> rusqlite::Result<Vec<CountByLabel>> {
    let mut filter = QueryFilter::new();
    filter.push("blood_center_id = ?", blood_center_id);
    let sql = format!(
        "SELECT screening_status, COUNT(*) FROM donations{} GROUP BY screening_status",
        filter.where_sql()
    );
    grouped_counts(conn, &sql, &filter)
}

pub fn recent_donations(conn: &Connection, limit: i64) -> rusqlite::Result<Vec<RecentDonation>> {
    let mut stmt = conn.prepare(
        "SELECT d.id, u.name, c.name, bg.name, d.volume_ml, d.donation_date_time, d.screening_status
         FROM donations d
         JOIN users u ON u.id = d.user_id
         JOIN blood_centers c ON c.id = d.blood_center_id
         JOIN blood_groups bg ON bg.id = d.blood_group_id
         ORDER BY d.donation_date_time DESC, d.id DESC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit], |row| {
            Ok(RecentDonation {
                id: row.get(0)?,
                donor_name: row.get(1)?,
                blood_center_name: row.get(2)?,
                blood_group: row.get(3)?,
                volume_ml: row.get(4)?,
                donation_date_time: row.get(5)?,
                screening_status: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

pub fn appointments_by_status(conn: &Connection, blood_center_id: i64) -> rusqlite::Result<Vec<CountByLabel>> {
    let mut filter = QueryFilter::new();
    filter.push("blood_center_id = ?", blood_center_id);
    let sql = format!(
        "SELECT status, COUNT(*) FROM appointments{} GROUP BY status",
        filter.where_sql()
    );
    grouped_counts(conn, &sql, &filter)
}

fn map_upcoming(row: &Row<'_>) -> rusqlite::Result<UpcomingAppointment> {
    Ok(UpcomingAppointment {
        id: row.get(0)?,
        donor_name: row.get(1)?,
        blood_center_name: row.get(2)?,
        appointment_date: row.get(3)?,
        status: row.get(4)?,
    })
}

/// Open appointments from `now` on, soonest first.
pub fn upcoming_appointments(
    conn: &Connection,
    blood_center_id: Option<i64>,
    user_id: Option<i64>,
    now: DateTime<Utc>,
    limit: i64,
) -> rusqlite::Result<Vec<UpcomingAppointment>> {
    let mut filter = QueryFilter::new();
    filter
        .push_raw("a.status IN ('scheduled', 'confirmed')")
        .push("a.appointment_date >= ?", now)
        .push_opt("a.blood_center_id = ?", blood_center_id)
        .push_opt("a.user_id = ?", user_id);
    let sql = format!(
        "SELECT a.id, u.name, c.name, a.appointment_date, a.status
         FROM appointments a
         JOIN users u ON u.id = a.user_id
         JOIN blood_centers c ON c.id = a.blood_center_id{}
         ORDER BY a.appointment_date ASC
         LIMIT ?",
        filter.where_sql()
    );
    let mut values = filter.params();
    values.push(&limit);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(values.as_slice(), map_upcoming)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
