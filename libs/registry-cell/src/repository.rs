use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use shared_database::QueryFilter;
use shared_models::auth::UserType;
use shared_models::pagination::Pagination;

use crate::models::{
    BloodGroup, Donor, DonorQuery, Institution, InstitutionKind, InstitutionQuery, Recipient,
    RecipientQuery,
};

// ==============================================================================
// SHARED LOOKUPS
// ==============================================================================

pub fn list_blood_groups(conn: &Connection) -> rusqlite::Result<Vec<BloodGroup>> {
    let mut stmt = conn.prepare("SELECT id, name FROM blood_groups ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| Ok(BloodGroup { id: row.get(0)?, name: row.get(1)? }))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn blood_group_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM blood_groups WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )
}

pub fn hospital_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM hospitals WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )
}

/// Whether another account already uses `email` (case-insensitive).
pub fn email_taken(conn: &Connection, email: &str, except_user_id: Option<i64>) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower(?1) AND id IS NOT ?2)",
        params![email, except_user_id],
        |row| row.get(0),
    )
}

pub fn insert_user(
    conn: &Connection,
    name: &str,
    email: &str,
    password_hash: &str,
    user_type: UserType,
    phone: Option<&str>,
    now: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (name, email, password_hash, user_type, phone, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![name, email, password_hash, user_type, phone, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_user(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM users WHERE id = ?1", [id])
}

// ==============================================================================
// DONORS
// ==============================================================================

const DONOR_SELECT: &str = "SELECT u.id, u.name, u.email, u.phone, u.first_name, u.last_name,
            u.date_of_birth, u.gender, u.blood_group_id, bg.name,
            (SELECT COUNT(*) FROM donations d WHERE d.user_id = u.id),
            (SELECT MAX(d.donation_date_time) FROM donations d WHERE d.user_id = u.id),
            u.created_at, u.updated_at
     FROM users u
     LEFT JOIN blood_groups bg ON bg.id = u.blood_group_id";

/// Column values of a donor account, apart from the password.
#[derive(Debug, Clone)]
pub struct DonorRow {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: Option<String>,
    pub blood_group_id: i64,
}

impl DonorRow {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

fn map_donor(row: &Row<'_>) -> rusqlite::Result<Donor> {
    Ok(Donor {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        date_of_birth: row.get(6)?,
        gender: row.get(7)?,
        blood_group_id: row.get(8)?,
        blood_group: row.get(9)?,
        donations_count: row.get(10)?,
        last_donation_date: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

pub fn find_donor(conn: &Connection, id: i64) -> rusqlite::Result<Option<Donor>> {
    let sql = format!("{} WHERE u.id = ?1 AND u.user_type = 'donor'", DONOR_SELECT);
    conn.query_row(&sql, [id], map_donor).optional()
}

pub fn insert_donor(
    conn: &Connection,
    row: &DonorRow,
    password_hash: &str,
    now: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (name, email, password_hash, user_type, phone, first_name, last_name,
                            date_of_birth, gender, blood_group_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'donor', ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            row.full_name(),
            row.email,
            password_hash,
            row.phone,
            row.first_name,
            row.last_name,
            row.date_of_birth,
            row.gender,
            row.blood_group_id,
            now
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_donor(
    conn: &Connection,
    id: i64,
    row: &DonorRow,
    password_hash: Option<&str>,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users
         SET name = ?2, email = ?3, phone = ?4, first_name = ?5, last_name = ?6,
             date_of_birth = ?7, gender = ?8, blood_group_id = ?9,
             password_hash = COALESCE(?10, password_hash), updated_at = ?11
         WHERE id = ?1",
        params![
            id,
            row.full_name(),
            row.email,
            row.phone,
            row.first_name,
            row.last_name,
            row.date_of_birth,
            row.gender,
            row.blood_group_id,
            password_hash,
            now
        ],
    )?;
    Ok(())
}

pub fn donation_count(conn: &Connection, user_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM donations WHERE user_id = ?1",
        [user_id],
        |row| row.get(0),
    )
}

pub fn list_donors(
    conn: &Connection,
    query: &DonorQuery,
    pagination: Pagination,
) -> rusqlite::Result<(Vec<Donor>, i64)> {
    let mut filter = QueryFilter::new();
    filter
        .push_raw("u.user_type = 'donor'")
        .push_like("(u.name LIKE ? OR u.email LIKE ? OR u.phone LIKE ?)", query.search.as_deref())
        .push_opt("u.blood_group_id = ?", query.blood_group_id)
        .push_opt("u.gender = ?", query.gender.clone());
    let where_sql = filter.where_sql();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM users u{}", where_sql),
        filter.params().as_slice(),
        |row| row.get(0),
    )?;

    let sql = format!("{}{} ORDER BY u.name ASC, u.id ASC LIMIT ? OFFSET ?", DONOR_SELECT, where_sql);
    let limit = pagination.limit();
    let offset = pagination.offset();
    let mut values = filter.params();
    values.push(&limit);
    values.push(&offset);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(values.as_slice(), map_donor)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok((rows, total))
}

// ==============================================================================
// HOSPITALS AND BLOOD CENTERS
// ==============================================================================

#[derive(Debug, Clone)]
pub struct InstitutionRow {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: String,
}

fn map_institution(row: &Row<'_>) -> rusqlite::Result<Institution> {
    Ok(Institution {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        address: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub fn find_institution(
    conn: &Connection,
    kind: InstitutionKind,
    id: i64,
) -> rusqlite::Result<Option<Institution>> {
    let sql = format!(
        "SELECT id, user_id, name, address, phone, email, created_at, updated_at
         FROM {} WHERE id = ?1",
        kind.table()
    );
    conn.query_row(&sql, [id], map_institution).optional()
}

pub fn insert_institution(
    conn: &Connection,
    kind: InstitutionKind,
    user_id: i64,
    row: &InstitutionRow,
    now: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    let sql = format!(
        "INSERT INTO {} (user_id, name, address, phone, email, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        kind.table()
    );
    conn.execute(&sql, params![user_id, row.name, row.address, row.phone, row.email, now])?;
    Ok(conn.last_insert_rowid())
}

pub fn update_institution(
    conn: &Connection,
    kind: InstitutionKind,
    id: i64,
    row: &InstitutionRow,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    let sql = format!(
        "UPDATE {} SET name = ?2, address = ?3, phone = ?4, email = ?5, updated_at = ?6 WHERE id = ?1",
        kind.table()
    );
    conn.execute(&sql, params![id, row.name, row.address, row.phone, row.email, now])?;
    Ok(())
}

/// Keep the staff login in step with its institution's name and email.
pub fn sync_staff_user(
    conn: &Connection,
    user_id: i64,
    row: &InstitutionRow,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET name = ?2, email = ?3, phone = ?4, updated_at = ?5 WHERE id = ?1",
        params![user_id, row.name, row.email, row.phone, now],
    )?;
    Ok(())
}

pub fn delete_institution(conn: &Connection, kind: InstitutionKind, id: i64) -> rusqlite::Result<usize> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", kind.table());
    conn.execute(&sql, [id])
}

/// Records that keep an institution from being deleted: blood requests for
/// a hospital, donations for a blood center.
pub fn institution_history(conn: &Connection, kind: InstitutionKind, id: i64) -> rusqlite::Result<i64> {
    let sql = match kind {
        InstitutionKind::Hospital => "SELECT COUNT(*) FROM blood_requests WHERE hospital_id = ?1",
        InstitutionKind::BloodCenter => "SELECT COUNT(*) FROM donations WHERE blood_center_id = ?1",
    };
    conn.query_row(sql, [id], |row| row.get(0))
}

pub fn list_institutions(
    conn: &Connection,
    kind: InstitutionKind,
    query: &InstitutionQuery,
    pagination: Pagination,
) -> rusqlite::Result<(Vec<Institution>, i64)> {
    let mut filter = QueryFilter::new();
    filter.push_like(
        "(name LIKE ? OR email LIKE ? OR address LIKE ?)",
        query.search.as_deref(),
    );
    let where_sql = filter.where_sql();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}{}", kind.table(), where_sql),
        filter.params().as_slice(),
        |row| row.get(0),
    )?;

    let sql = format!(
        "SELECT id, user_id, name, address, phone, email, created_at, updated_at
         FROM {}{} ORDER BY name ASC, id ASC LIMIT ? OFFSET ?",
        kind.table(),
        where_sql
    );
    let limit = pagination.limit();
    let offset = pagination.offset();
    let mut values = filter.params();
    values.push(&limit);
    values.push(&offset);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(values.as_slice(), map_institution)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok((rows, total))
}

// ==============================================================================
// RECIPIENTS
// ==============================================================================

const RECIPIENT_SELECT: &str = "SELECT r.id, r.hospital_id, h.name, r.name, r.id_number,
            r.date_of_birth, r.gender, r.blood_group_id, bg.name, r.medical_notes,
            r.created_at, r.updated_at
     FROM recipients r
     JOIN hospitals h ON h.id = r.hospital_id
     JOIN blood_groups bg ON bg.id = r.blood_group_id";

#[derive(Debug, Clone)]
pub struct RecipientRow {
    pub hospital_id: i64,
    pub name: String,
    pub id_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub blood_group_id: i64,
    pub medical_notes: Option<String>,
}

fn map_recipient(row: &Row<'_>) -> rusqlite::Result<Recipient> {
    Ok(Recipient {
        id: row.get(0)?,
        hospital_id: row.get(1)?,
        hospital_name: row.get(2)?,
        name: row.get(3)?,
        id_number: row.get(4)?,
        date_of_birth: row.get(5)?,
        gender: row.get(6)?,
        blood_group_id: row.get(7)?,
        blood_group: row.get(8)?,
        medical_notes: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

pub fn find_recipient(conn: &Connection, id: i64) -> rusqlite::Result<Option<Recipient>> {
    let sql = format!("{} WHERE r.id = ?1", RECIPIENT_SELECT);
    conn.query_row(&sql, [id], map_recipient).optional()
}

pub fn insert_recipient(conn: &Connection, row: &RecipientRow, now: DateTime<Utc>) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO recipients
            (hospital_id, name, id_number, date_of_birth, gender, blood_group_id, medical_notes,
             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            row.hospital_id,
            row.name,
            row.id_number,
            row.date_of_birth,
            row.gender,
            row.blood_group_id,
            row.medical_notes,
            now
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_recipient(
    conn: &Connection,
    id: i64,
    row: &RecipientRow,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE recipients
         SET name = ?2, id_number = ?3, date_of_birth = ?4, gender = ?5, blood_group_id = ?6,
             medical_notes = ?7, updated_at = ?8
         WHERE id = ?1",
        params![
            id,
            row.name,
            row.id_number,
            row.date_of_birth,
            row.gender,
            row.blood_group_id,
            row.medical_notes,
            now
        ],
    )?;
    Ok(())
}

pub fn recipient_item_count(conn: &Connection, id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM blood_request_items WHERE recipient_id = ?1",
        [id],
        |row| row.get(0),
    )
}

pub fn delete_recipient(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM recipients WHERE id = ?1", [id])
}

pub fn list_recipients(
    conn: &Connection,
    query: &RecipientQuery,
    hospital_scope: Option<i64>,
    pagination: Pagination,
) -> rusqlite::Result<(Vec<Recipient>, i64)> {
    let mut filter = QueryFilter::new();
    filter
        .push_like("(r.name LIKE ? OR r.id_number LIKE ?)", query.search.as_deref())
        .push_opt("r.hospital_id = ?", hospital_scope.or(query.hospital_id))
        .push_opt("r.blood_group_id = ?", query.blood_group_id);
    let where_sql = filter.where_sql();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM recipients r{}", where_sql),
        filter.params().as_slice(),
        |row| row.get(0),
    )?;

    let sql = format!(
        "{}{} ORDER BY r.created_at DESC, r.id DESC LIMIT ? OFFSET ?",
        RECIPIENT_SELECT, where_sql
    );
    let limit = pagination.limit();
    let offset = pagination.offset();
    let mut values = filter.params();
    values.push(&limit);
    values.push(&offset);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(values.as_slice(), map_recipient)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok((rows, total))
}
