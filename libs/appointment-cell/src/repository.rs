use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use shared_database::QueryFilter;
use shared_models::pagination::Pagination;

use crate::models::{Appointment, AppointmentQuery, AppointmentStatus};

const APPOINTMENT_SELECT: &str = "SELECT a.id, a.user_id, u.name, a.blood_center_id, c.name, a.appointment_date,
            a.status, a.notes, a.created_at, a.updated_at
     FROM appointments a
     JOIN users u ON u.id = a.user_id
     JOIN blood_centers c ON c.id = a.blood_center_id";

/// Ownership and status of an appointment, as needed by donation recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppointmentRef {
    pub id: i64,
    pub user_id: i64,
    pub blood_center_id: i64,
    pub status: AppointmentStatus,
}

fn map_appointment(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        donor_name: row.get(2)?,
        blood_center_id: row.get(3)?,
        blood_center_name: row.get(4)?,
        appointment_date: row.get(5)?,
        status: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub fn find_appointment(conn: &Connection, id: i64) -> rusqlite::Result<Option<Appointment>> {
    let sql = format!("{} WHERE a.id = ?1", APPOINTMENT_SELECT);
    conn.query_row(&sql, [id], map_appointment).optional()
}

pub fn find_appointment_ref(conn: &Connection, id: i64) -> rusqlite::Result<Option<AppointmentRef>> {
    conn.query_row(
        "SELECT id, user_id, blood_center_id, status FROM appointments WHERE id = ?1",
        [id],
        |row| {
            Ok(AppointmentRef {
                id: row.get(0)?,
                user_id: row.get(1)?,
                blood_center_id: row.get(2)?,
                status: row.get(3)?,
            })
        },
    )
    .optional()
}

pub fn insert_appointment(
    conn: &Connection,
    user_id: i64,
    blood_center_id: i64,
    appointment_date: DateTime<Utc>,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO appointments (user_id, blood_center_id, appointment_date, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            user_id,
            blood_center_id,
            appointment_date,
            AppointmentStatus::Scheduled,
            notes,
            now
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_appointment(
    conn: &Connection,
    id: i64,
    appointment_date: DateTime<Utc>,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE appointments SET appointment_date = ?2, notes = ?3, updated_at = ?4 WHERE id = ?1",
        params![id, appointment_date, notes, now],
    )?;
    Ok(())
}

pub fn set_status(
    conn: &Connection,
    id: i64,
    status: AppointmentStatus,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE appointments SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, status, now],
    )?;
    Ok(())
}

pub fn delete_appointment(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM appointments WHERE id = ?1", [id])
}

pub fn is_donor(conn: &Connection, user_id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1 AND user_type = 'donor')",
        [user_id],
        |row| row.get(0),
    )
}

pub fn blood_center_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM blood_centers WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )
}

pub fn list_appointments(
    conn: &Connection,
    query: &AppointmentQuery,
    center_scope: Option<i64>,
    donor_scope: Option<i64>,
    pagination: Pagination,
) -> rusqlite::Result<(Vec<Appointment>, i64)> {
    let mut filter = QueryFilter::new();
    filter
        .push_opt("a.status = ?", query.status)
        .push_opt("a.blood_center_id = ?", center_scope.or(query.blood_center_id))
        .push_opt("a.user_id = ?", donor_scope.or(query.user_id))
        .push_opt("date(a.appointment_date) >= ?", query.from_date)
        .push_opt("date(a.appointment_date) <= ?", query.to_date);
    let where_sql = filter.where_sql();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM appointments a{}", where_sql),
        filter.params().as_slice(),
        |row| row.get(0),
    )?;

    let sql = format!(
        "{}{} ORDER BY a.appointment_date DESC, a.id DESC LIMIT ? OFFSET ?",
        APPOINTMENT_SELECT, where_sql
    );
    let limit = pagination.limit();
    let offset = pagination.offset();
    let mut values = filter.params();
    values.push(&limit);
    values.push(&offset);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(values.as_slice(), map_appointment)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok((rows, total))
}
