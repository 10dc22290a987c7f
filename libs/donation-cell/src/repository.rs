use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use shared_database::QueryFilter;
use shared_models::pagination::Pagination;

use crate::models::{Donation, DonationQuery, ScreeningStatus};

const DONATION_SELECT: &str = "SELECT d.id, d.user_id, u.name, d.blood_center_id, c.name, d.blood_group_id, bg.name,
            d.appointment_id, d.blood_request_item_id, i.unique_code, d.volume_ml, d.weight,
            d.donation_date_time, d.screening_status, d.notes, d.created_at, d.updated_at
     FROM donations d
     JOIN users u ON u.id = d.user_id
     JOIN blood_centers c ON c.id = d.blood_center_id
     JOIN blood_groups bg ON bg.id = d.blood_group_id
     LEFT JOIN blood_request_items i ON i.id = d.blood_request_item_id";

/// Column values written on insert and update.
#[derive(Debug, Clone)]
pub struct DonationRow {
    pub user_id: i64,
    pub blood_center_id: i64,
    pub blood_group_id: i64,
    pub appointment_id: Option<i64>,
    pub blood_request_item_id: Option<i64>,
    pub volume_ml: i64,
    pub weight: Option<f64>,
    pub donation_date_time: DateTime<Utc>,
    pub screening_status: ScreeningStatus,
    pub notes: Option<String>,
}

impl From<&Donation> for DonationRow {
    fn from(donation: &Donation) -> Self {
        Self {
            user_id: donation.user_id,
            blood_center_id: donation.blood_center_id,
            blood_group_id: donation.blood_group_id,
            appointment_id: donation.appointment_id,
            blood_request_item_id: donation.blood_request_item_id,
            volume_ml: donation.volume_ml,
            weight: donation.weight,
            donation_date_time: donation.donation_date_time,
            screening_status: donation.screening_status,
            notes: donation.notes.clone(),
        }
    }
}

/// `(blood_group_id)` of a donor account, `None` when the user is not a donor.
pub fn find_donor_blood_group(conn: &Connection, user_id: i64) -> rusqlite::Result<Option<Option<i64>>> {
    conn.query_row(
        "SELECT blood_group_id FROM users WHERE id = ?1 AND user_type = 'donor'",
        [user_id],
        |row| row.get(0),
    )
    .optional()
}

pub fn blood_center_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM blood_centers WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )
}

fn map_donation(row: &Row<'_>) -> rusqlite::Result<Donation> {
    Ok(Donation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        donor_name: row.get(2)?,
        blood_center_id: row.get(3)?,
        blood_center_name: row.get(4)?,
        blood_group_id: row.get(5)?,
        blood_group: row.get(6)?,
        appointment_id: row.get(7)?,
        blood_request_item_id: row.get(8)?,
        item_code: row.get(9)?,
        volume_ml: row.get(10)?,
        weight: row.get(11)?,
        donation_date_time: row.get(12)?,
        screening_status: row.get(13)?,
        notes: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

pub fn find_donation(conn: &Connection, id: i64) -> rusqlite::Result<Option<Donation>> {
    let sql = format!("{} WHERE d.id = ?1", DONATION_SELECT);
    conn.query_row(&sql, [id], map_donation).optional()
}

pub fn insert_donation(conn: &Connection, row: &DonationRow, now: DateTime<Utc>) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO donations
            (user_id, blood_center_id, blood_group_id, appointment_id, blood_request_item_id,
             volume_ml, weight, donation_date_time, screening_status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            row.user_id,
            row.blood_center_id,
            row.blood_group_id,
            row.appointment_id,
            row.blood_request_item_id,
            row.volume_ml,
            row.weight,
            row.donation_date_time,
            row.screening_status,
            row.notes,
            now
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_donation(
    conn: &Connection,
    id: i64,
    row: &DonationRow,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE donations
         SET blood_request_item_id = ?2, volume_ml = ?3, weight = ?4, donation_date_time = ?5,
             screening_status = ?6, notes = ?7, updated_at = ?8
         WHERE id = ?1",
        params![
            id,
            row.blood_request_item_id,
            row.volume_ml,
            row.weight,
            row.donation_date_time,
            row.screening_status,
            row.notes,
            now
        ],
    )?;
    Ok(())
}

pub fn delete_donation(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM donations WHERE id = ?1", [id])
}

pub fn list_donations(
    conn: &Connection,
    query: &DonationQuery,
    center_scope: Option<i64>,
    donor_scope: Option<i64>,
    pagination: Pagination,
) -> rusqlite::Result<(Vec<Donation>, i64)> {
    let mut filter = QueryFilter::new();
    filter
        .push_like("(u.name LIKE ? OR u.email LIKE ?)", query.search.as_deref())
        .push_opt("d.blood_center_id = ?", center_scope.or(query.blood_center_id))
        .push_opt("d.user_id = ?", donor_scope.or(query.user_id))
        .push_opt("d.blood_group_id = ?", query.blood_group_id)
        .push_opt("d.screening_status = ?", query.screening_status)
        .push_opt("date(d.donation_date_time) >= ?", query.start_date)
        .push_opt("date(d.donation_date_time) <= ?", query.end_date);
    let where_sql = filter.where_sql();

    let total: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM donations d JOIN users u ON u.id = d.user_id{}",
            where_sql
        ),
        filter.params().as_slice(),
        |row| row.get(0),
    )?;

    let sql = format!(
        "{}{} ORDER BY d.donation_date_time DESC, d.id DESC LIMIT ? OFFSET ?",
        DONATION_SELECT, where_sql
    );
    let limit = pagination.limit();
    let offset = pagination.offset();
    let mut values = filter.params();
    values.push(&limit);
    values.push(&offset);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(values.as_slice(), map_donation)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok((rows, total))
}
