use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use shared_database::QueryFilter;

use crate::models::{humanize, ReportCell, ReportFilters};

type CellRow = Vec<ReportCell>;

fn date(value: Option<NaiveDate>) -> ReportCell {
    value.map(|d| d.format("%Y-%m-%d").to_string()).into()
}

fn timestamp(value: DateTime<Utc>) -> ReportCell {
    value.format("%Y-%m-%d %H:%M").to_string().into()
}

fn label(value: Option<String>) -> ReportCell {
    value.map(|v| humanize(&v)).into()
}

fn date_range(filter: &mut QueryFilter, column: &str, filters: &ReportFilters) {
    filter
        .push_opt(&format!("substr({}, 1, 10) >= ?", column), filters.start_date)
        .push_opt(&format!("substr({}, 1, 10) <= ?", column), filters.end_date);
}

fn collect(
    conn: &Connection,
    sql: &str,
    filter: &QueryFilter,
    map: fn(&Row<'_>) -> rusqlite::Result<CellRow>,
) -> rusqlite::Result<Vec<CellRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(filter.params().as_slice(), map)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Display name of a filter target, `None` when the id does not exist.
pub fn lookup_name(conn: &Connection, table: &str, id: i64) -> rusqlite::Result<Option<String>> {
    let sql = format!("SELECT name FROM {} WHERE id = ?1", table);
    conn.query_row(&sql, [id], |row| row.get(0)).optional()
}

// ==============================================================================
// PEOPLE AND INSTITUTIONS
// ==============================================================================

pub fn donor_rows(conn: &Connection, filters: &ReportFilters) -> rusqlite::Result<Vec<CellRow>> {
    let mut filter = QueryFilter::new();
    filter
        .push_raw("u.user_type = 'donor'")
        .push_opt("u.blood_group_id = ?", filters.blood_group_id);
    date_range(&mut filter, "u.created_at", filters);

    let sql = format!(
        "SELECT u.name, u.email, u.phone, u.gender, bg.name, u.date_of_birth,
                (SELECT COUNT(*) FROM donations d WHERE d.user_id = u.id),
                (SELECT COALESCE(SUM(d.volume_ml), 0) FROM donations d WHERE d.user_id = u.id),
                u.created_at
         FROM users u
         LEFT JOIN blood_groups bg ON bg.id = u.blood_group_id{}
         ORDER BY u.name, u.id",
        filter.where_sql()
    );
    collect(conn, &sql, &filter, |row| {
        Ok(vec![
            row.get::<_, String>(0)?.into(),
            row.get::<_, String>(1)?.into(),
            row.get::<_, Option<String>>(2)?.into(),
            label(row.get(3)?),
            row.get::<_, Option<String>>(4)?.into(),
            date(row.get(5)?),
            row.get::<_, i64>(6)?.into(),
            row.get::<_, i64>(7)?.into(),
            timestamp(row.get(8)?),
        ])
    })
}

pub fn recipient_rows(conn: &Connection, filters: &ReportFilters) -> rusqlite::Result<Vec<CellRow>> {
    let mut filter = QueryFilter::new();
    filter
        .push_opt("r.hospital_id = ?", filters.hospital_id)
        .push_opt("r.blood_group_id = ?", filters.blood_group_id);
    date_range(&mut filter, "r.created_at", filters);

    let sql = format!(
        "SELECT r.name, r.id_number, h.name, bg.name, r.gender, r.date_of_birth,
                (SELECT COUNT(*) FROM blood_request_items i WHERE i.recipient_id = r.id),
                (SELECT COALESCE(SUM(i.units_requested), 0) FROM blood_request_items i
                 WHERE i.recipient_id = r.id),
                r.created_at
         FROM recipients r
         JOIN hospitals h ON h.id = r.hospital_id
         JOIN blood_groups bg ON bg.id = r.blood_group_id{}
         ORDER BY r.name, r.id",
        filter.where_sql()
    );
    collect(conn, &sql, &filter, |row| {
        Ok(vec![
            row.get::<_, String>(0)?.into(),
            row.get::<_, Option<String>>(1)?.into(),
            row.get::<_, String>(2)?.into(),
            row.get::<_, String>(3)?.into(),
            label(row.get(4)?),
            date(row.get(5)?),
            row.get::<_, i64>(6)?.into(),
            row.get::<_, i64>(7)?.into(),
            timestamp(row.get(8)?),
        ])
    })
}

pub fn hospital_rows(conn: &Connection, filters: &ReportFilters) -> rusqlite::Result<Vec<CellRow>> {
    let mut filter = QueryFilter::new();
    date_range(&mut filter, "h.created_at", filters);

    let sql = format!(
        "SELECT h.name, h.email, h.phone, h.address,
                (SELECT COUNT(*) FROM blood_requests r WHERE r.hospital_id = h.id),
                (SELECT COUNT(*) FROM recipients r WHERE r.hospital_id = h.id),
                h.created_at
         FROM hospitals h{}
         ORDER BY h.name, h.id",
        filter.where_sql()
    );
    collect(conn, &sql, &filter, |row| {
        Ok(vec![
            row.get::<_, String>(0)?.into(),
            row.get::<_, String>(1)?.into(),
            row.get::<_, Option<String>>(2)?.into(),
            row.get::<_, Option<String>>(3)?.into(),
            row.get::<_, i64>(4)?.into(),
            row.get::<_, i64>(5)?.into(),
            timestamp(row.get(6)?),
        ])
    })
}

pub fn blood_center_rows(conn: &Connection, filters: &ReportFilters) -> rusqlite::Result<Vec<CellRow>> {
    let mut filter = QueryFilter::new();
    date_range(&mut filter, "c.created_at", filters);

    let sql = format!(
        "SELECT c.name, c.email, c.phone, c.address,
                (SELECT COUNT(*) FROM donations d WHERE d.blood_center_id = c.id),
                (SELECT COALESCE(SUM(d.volume_ml), 0) FROM donations d WHERE d.blood_center_id = c.id),
                (SELECT COUNT(*) FROM appointments a WHERE a.blood_center_id = c.id),
                c.created_at
         FROM blood_centers c{}
         ORDER BY c.name, c.id",
        filter.where_sql()
    );
    collect(conn, &sql, &filter, |row| {
        Ok(vec![
            row.get::<_, String>(0)?.into(),
            row.get::<_, String>(1)?.into(),
            row.get::<_, Option<String>>(2)?.into(),
            row.get::<_, Option<String>>(3)?.into(),
            row.get::<_, i64>(4)?.into(),
            row.get::<_, i64>(5)?.into(),
            row.get::<_, i64>(6)?.into(),
            timestamp(row.get(7)?),
        ])
    })
}

// ==============================================================================
// ACTIVITY
// ==============================================================================

pub fn appointment_rows(conn: &Connection, filters: &ReportFilters) -> rusqlite::Result<Vec<CellRow>> {
    let mut filter = QueryFilter::new();
    filter
        .push_opt("a.blood_center_id = ?", filters.blood_center_id)
        .push_opt("a.status = ?", filters.status.clone());
    date_range(&mut filter, "a.appointment_date", filters);

    let sql = format!(
        "SELECT u.name, c.name, a.appointment_date, a.status, a.notes
         FROM appointments a
         JOIN users u ON u.id = a.user_id
         JOIN blood_centers c ON c.id = a.blood_center_id{}
         ORDER BY a.appointment_date, a.id",
        filter.where_sql()
    );
    collect(conn, &sql, &filter, |row| {
        Ok(vec![
            row.get::<_, String>(0)?.into(),
            row.get::<_, String>(1)?.into(),
            timestamp(row.get(2)?),
            label(row.get(3)?),
            row.get::<_, Option<String>>(4)?.into(),
        ])
    })
}

pub fn request_rows(conn: &Connection, filters: &ReportFilters) -> rusqlite::Result<Vec<CellRow>> {
    let mut filter = QueryFilter::new();
    filter
        .push_opt("r.hospital_id = ?", filters.hospital_id)
        .push_opt("r.status = ?", filters.status.clone())
        .push_opt(
            "EXISTS (SELECT 1 FROM blood_request_items i
                     WHERE i.blood_request_id = r.id AND i.recipient_id = ?)",
            filters.recipient_id,
        )
        .push_opt(
            "EXISTS (SELECT 1 FROM blood_request_items i
                     WHERE i.blood_request_id = r.id AND i.blood_group_id = ?)",
            filters.blood_group_id,
        );
    date_range(&mut filter, "r.request_date", filters);

    let sql = format!(
        "SELECT r.id, h.name, r.request_date, r.status,
                (SELECT COUNT(*) FROM blood_request_items i WHERE i.blood_request_id = r.id),
                (SELECT COALESCE(SUM(i.units_requested), 0) FROM blood_request_items i
                 WHERE i.blood_request_id = r.id),
                (SELECT COUNT(*) FROM donations d
                 JOIN blood_request_items i ON i.id = d.blood_request_item_id
                 WHERE i.blood_request_id = r.id AND d.screening_status = 'passed'),
                r.notes
         FROM blood_requests r
         JOIN hospitals h ON h.id = r.hospital_id{}
         ORDER BY r.request_date, r.id",
        filter.where_sql()
    );
    collect(conn, &sql, &filter, |row| {
        Ok(vec![
            format!("#{}", row.get::<_, i64>(0)?).into(),
            row.get::<_, String>(1)?.into(),
            date(row.get(2)?),
            label(row.get(3)?),
            row.get::<_, i64>(4)?.into(),
            row.get::<_, i64>(5)?.into(),
            row.get::<_, i64>(6)?.into(),
            row.get::<_, Option<String>>(7)?.into(),
        ])
    })
}

pub fn donation_rows(conn: &Connection, filters: &ReportFilters) -> rusqlite::Result<Vec<CellRow>> {
    let mut filter = QueryFilter::new();
    filter
        .push_opt("d.blood_center_id = ?", filters.blood_center_id)
        .push_opt("d.blood_group_id = ?", filters.blood_group_id)
        .push_opt("d.screening_status = ?", filters.status.clone())
        .push_opt("r.hospital_id = ?", filters.hospital_id)
        .push_opt("i.recipient_id = ?", filters.recipient_id);
    date_range(&mut filter, "d.donation_date_time", filters);

    let sql = format!(
        "SELECT u.name, c.name, bg.name, d.volume_ml, d.weight, d.donation_date_time,
                d.screening_status, i.unique_code
         FROM donations d
         JOIN users u ON u.id = d.user_id
         JOIN blood_centers c ON c.id = d.blood_center_id
         JOIN blood_groups bg ON bg.id = d.blood_group_id
         LEFT JOIN blood_request_items i ON i.id = d.blood_request_item_id
         LEFT JOIN blood_requests r ON r.id = i.blood_request_id{}
         ORDER BY d.donation_date_time, d.id",
        filter.where_sql()
    );
    collect(conn, &sql, &filter, |row| {
        Ok(vec![
            row.get::<_, String>(0)?.into(),
            row.get::<_, String>(1)?.into(),
            row.get::<_, String>(2)?.into(),
            row.get::<_, i64>(3)?.into(),
            row.get::<_, Option<f64>>(4)?.into(),
            timestamp(row.get(5)?),
            label(row.get(6)?),
            row.get::<_, Option<String>>(7)?.into(),
        ])
    })
}
