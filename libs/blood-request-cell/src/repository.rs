//! SQL access for blood requests and their items.
//!
//! Every function takes a plain `&Connection` so it can run either on the
//! shared connection or inside a `Transaction` (which derefs to one).

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use shared_database::QueryFilter;
use shared_models::pagination::Pagination;

use crate::models::{
    BloodRequest, BloodRequestItem, BloodRequestQuery, BloodRequestSummary, ItemStatus,
    NewRecipient, RequestStatus, Urgency,
};
use crate::status::{derive_request_status, reconcile_item_status};

const REQUEST_COLUMNS: &str = "br.id, br.hospital_id, h.name, br.request_date, br.notes, br.status,
     br.created_at, br.updated_at";

const ITEM_SELECT: &str = "SELECT i.id, i.blood_request_id, i.blood_group_id, bg.name, i.recipient_id, r.name,
            i.units_requested,
            (SELECT COUNT(*) FROM donations d
              WHERE d.blood_request_item_id = i.id AND d.screening_status = 'passed'),
            i.urgency, i.status, i.unique_code
     FROM blood_request_items i
     JOIN blood_groups bg ON bg.id = i.blood_group_id
     LEFT JOIN recipients r ON r.id = i.recipient_id";

/// Minimal item state needed by the lifecycle checks.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredItem {
    pub id: i64,
    pub blood_request_id: i64,
    pub blood_group_id: i64,
    pub recipient_id: Option<i64>,
    pub units_requested: i64,
    pub urgency: Urgency,
    pub status: ItemStatus,
    pub unique_code: String,
    /// Donations recorded against the item, whatever their screening.
    pub linked_donations: i64,
}

impl StoredItem {
    pub fn has_donations(&self) -> bool {
        self.linked_donations > 0
    }
}

const STORED_ITEM_SELECT: &str = "SELECT i.id, i.blood_request_id, i.blood_group_id, i.recipient_id, i.units_requested,
            i.urgency, i.status, i.unique_code,
            (SELECT COUNT(*) FROM donations d WHERE d.blood_request_item_id = i.id)
     FROM blood_request_items i";

/// Traceability code printed on labels and reports.
pub fn generate_unique_code() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("BRI-{}", &hex[..8])
}

fn map_request(row: &Row<'_>) -> rusqlite::Result<BloodRequest> {
    Ok(BloodRequest {
        id: row.get(0)?,
        hospital_id: row.get(1)?,
        hospital_name: row.get(2)?,
        request_date: row.get(3)?,
        notes: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn map_item(row: &Row<'_>) -> rusqlite::Result<BloodRequestItem> {
    let recipient_id: Option<i64> = row.get(4)?;
    Ok(BloodRequestItem {
        id: row.get(0)?,
        blood_request_id: row.get(1)?,
        blood_group_id: row.get(2)?,
        blood_group: row.get(3)?,
        recipient_id,
        recipient_name: row.get(5)?,
        units_requested: row.get(6)?,
        units_fulfilled: row.get(7)?,
        urgency: row.get(8)?,
        status: row.get(9)?,
        unique_code: row.get(10)?,
        is_general: recipient_id.is_none(),
    })
}

// ==============================================================================
// REQUESTS
// ==============================================================================

pub fn find_request(conn: &Connection, id: i64) -> rusqlite::Result<Option<BloodRequest>> {
    let sql = format!(
        "SELECT {} FROM blood_requests br JOIN hospitals h ON h.id = br.hospital_id WHERE br.id = ?1",
        REQUEST_COLUMNS
    );
    conn.query_row(&sql, [id], map_request).optional()
}

/// `(hospital_id, status)` of a request.
pub fn request_header(conn: &Connection, id: i64) -> rusqlite::Result<Option<(i64, RequestStatus)>> {
    conn.query_row(
        "SELECT hospital_id, status FROM blood_requests WHERE id = ?1",
        [id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

pub fn insert_request(
    conn: &Connection,
    hospital_id: i64,
    request_date: NaiveDate,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO blood_requests (hospital_id, request_date, notes, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![hospital_id, request_date, notes, RequestStatus::Pending, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_request(
    conn: &Connection,
    id: i64,
    request_date: NaiveDate,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE blood_requests SET request_date = ?2, notes = ?3, updated_at = ?4 WHERE id = ?1",
        params![id, request_date, notes, now],
    )?;
    Ok(())
}

pub fn delete_request(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM blood_request_items WHERE blood_request_id = ?1", [id])?;
    conn.execute("DELETE FROM blood_requests WHERE id = ?1", [id])
}

// ==============================================================================
// ITEMS
// ==============================================================================

pub fn load_items(conn: &Connection, request_id: i64) -> rusqlite::Result<Vec<BloodRequestItem>> {
    let sql = format!("{} WHERE i.blood_request_id = ?1 ORDER BY i.id", ITEM_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map([request_id], map_item)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

pub fn stored_items(conn: &Connection, request_id: i64) -> rusqlite::Result<Vec<StoredItem>> {
    let sql = format!("{} WHERE i.blood_request_id = ?1 ORDER BY i.id", STORED_ITEM_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map([request_id], map_stored_item)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

pub fn find_stored_item(conn: &Connection, item_id: i64) -> rusqlite::Result<Option<StoredItem>> {
    let sql = format!("{} WHERE i.id = ?1", STORED_ITEM_SELECT);
    conn.query_row(&sql, [item_id], map_stored_item).optional()
}

fn map_stored_item(row: &Row<'_>) -> rusqlite::Result<StoredItem> {
    Ok(StoredItem {
        id: row.get(0)?,
        blood_request_id: row.get(1)?,
        blood_group_id: row.get(2)?,
        recipient_id: row.get(3)?,
        units_requested: row.get(4)?,
        urgency: row.get(5)?,
        status: row.get(6)?,
        unique_code: row.get(7)?,
        linked_donations: row.get(8)?,
    })
}

pub struct ItemValues {
    pub blood_group_id: i64,
    pub recipient_id: Option<i64>,
    pub units_requested: i64,
    pub urgency: Urgency,
}

pub fn insert_item(
    conn: &Connection,
    request_id: i64,
    values: &ItemValues,
    now: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    let code = generate_unique_code();
    conn.execute(
        "INSERT INTO blood_request_items
            (blood_request_id, blood_group_id, recipient_id, units_requested, urgency, status,
             unique_code, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            request_id,
            values.blood_group_id,
            values.recipient_id,
            values.units_requested,
            values.urgency,
            ItemStatus::Pending,
            code,
            now
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!("Inserted blood request item {} ({}) on request {}", id, code, request_id);
    Ok(id)
}

pub fn update_item(
    conn: &Connection,
    item_id: i64,
    values: &ItemValues,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE blood_request_items
         SET blood_group_id = ?2, recipient_id = ?3, units_requested = ?4, urgency = ?5, updated_at = ?6
         WHERE id = ?1",
        params![
            item_id,
            values.blood_group_id,
            values.recipient_id,
            values.units_requested,
            values.urgency,
            now
        ],
    )?;
    Ok(())
}

pub fn delete_item(conn: &Connection, item_id: i64) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM blood_request_items WHERE id = ?1", [item_id])?;
    Ok(())
}

pub fn set_item_status(
    conn: &Connection,
    item_id: i64,
    status: ItemStatus,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE blood_request_items SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![item_id, status, now],
    )?;
    Ok(())
}

/// Units delivered to an item: one per passed-screening donation.
pub fn delivered_units(conn: &Connection, item_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM donations WHERE blood_request_item_id = ?1 AND screening_status = 'passed'",
        [item_id],
        |row| row.get(0),
    )
}

/// Re-evaluate an item against its delivered units, persisting any change.
pub fn reconcile_item(conn: &Connection, item_id: i64) -> rusqlite::Result<Option<ItemStatus>> {
    let Some(item) = find_stored_item(conn, item_id)? else {
        return Ok(None);
    };

    let delivered = delivered_units(conn, item_id)?;
    let next = reconcile_item_status(item.status, delivered, item.units_requested);
    if next != item.status {
        debug!(
            "Reconciled item {} from {} to {} ({}/{} units)",
            item.unique_code, item.status, next, delivered, item.units_requested
        );
        set_item_status(conn, item_id, next, Utc::now())?;
    }
    Ok(Some(next))
}

/// Recompute and store the aggregate status of a request from its items.
pub fn recompute_request_status(conn: &Connection, request_id: i64) -> rusqlite::Result<RequestStatus> {
    let statuses: Vec<ItemStatus> = {
        let mut stmt =
            conn.prepare("SELECT status FROM blood_request_items WHERE blood_request_id = ?1")?;
        let rows = stmt.query_map([request_id], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    let status = derive_request_status(&statuses);
    conn.execute(
        "UPDATE blood_requests SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status != ?2",
        params![request_id, status, Utc::now()],
    )?;
    Ok(status)
}

// ==============================================================================
// LOOKUPS
// ==============================================================================

pub fn hospital_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row("SELECT EXISTS(SELECT 1 FROM hospitals WHERE id = ?1)", [id], |row| row.get(0))
}

pub fn blood_group_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row("SELECT EXISTS(SELECT 1 FROM blood_groups WHERE id = ?1)", [id], |row| {
        row.get(0)
    })
}

/// Hospital that owns a recipient.
pub fn recipient_hospital(conn: &Connection, recipient_id: i64) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT hospital_id FROM recipients WHERE id = ?1",
        [recipient_id],
        |row| row.get(0),
    )
    .optional()
}

pub fn insert_recipient(
    conn: &Connection,
    hospital_id: i64,
    recipient: &NewRecipient,
    now: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO recipients
            (hospital_id, name, id_number, date_of_birth, gender, blood_group_id, medical_notes,
             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            hospital_id,
            recipient.name,
            recipient.id_number,
            recipient.date_of_birth,
            recipient.gender,
            recipient.blood_group_id,
            recipient.medical_notes,
            now
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

// ==============================================================================
// LISTING
// ==============================================================================

fn list_filter(query: &BloodRequestQuery, hospital_scope: Option<i64>) -> QueryFilter {
    let mut filter = QueryFilter::new();
    filter
        .push_like("h.name LIKE ?", query.search.as_deref())
        .push_opt("br.status = ?", query.status)
        .push_opt("br.hospital_id = ?", hospital_scope.or(query.hospital_id))
        .push_opt(
            "EXISTS (SELECT 1 FROM blood_request_items u
                      WHERE u.blood_request_id = br.id AND u.urgency = ?)",
            query.urgency,
        );
    filter
}

/// One page of request summaries plus the total row count.
pub fn list_requests(
    conn: &Connection,
    query: &BloodRequestQuery,
    hospital_scope: Option<i64>,
    pagination: Pagination,
) -> rusqlite::Result<(Vec<BloodRequestSummary>, i64)> {
    let filter = list_filter(query, hospital_scope);
    let where_sql = filter.where_sql();

    let count_sql = format!(
        "SELECT COUNT(*) FROM blood_requests br JOIN hospitals h ON h.id = br.hospital_id{}",
        where_sql
    );
    let total: i64 = conn.query_row(&count_sql, filter.params().as_slice(), |row| row.get(0))?;

    let direction = query.sort_direction.as_sql();
    let sql = format!(
        "SELECT {},
                (SELECT COUNT(*) FROM blood_request_items i WHERE i.blood_request_id = br.id),
                (SELECT COALESCE(SUM(i.units_requested), 0) FROM blood_request_items i
                  WHERE i.blood_request_id = br.id),
                EXISTS (SELECT 1 FROM blood_request_items i
                         WHERE i.blood_request_id = br.id AND i.urgency = 'urgent')
         FROM blood_requests br
         JOIN hospitals h ON h.id = br.hospital_id{}
         ORDER BY {} {}, br.id {}
         LIMIT ? OFFSET ?",
        REQUEST_COLUMNS,
        where_sql,
        query.sort_by.column(),
        direction,
        direction
    );

    let limit = pagination.limit();
    let offset = pagination.offset();
    let mut values = filter.params();
    values.push(&limit);
    values.push(&offset);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(values.as_slice(), |row| {
            Ok(BloodRequestSummary {
                request: map_request(row)?,
                items_count: row.get(8)?,
                total_units: row.get(9)?,
                has_urgent: row.get(10)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok((rows, total))
}
