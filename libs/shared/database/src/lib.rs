//! SQLite persistence shared by every cell.

pub mod query;
mod schema;
pub mod state;

pub use query::QueryFilter;
pub use schema::SCHEMA;
pub use state::{AppState, SharedDatabase};

use std::path::Path;

use rusqlite::{Connection, Transaction};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        debug!("Opening database at {}", path.as_ref().display());
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction. Dropping it without `commit()` rolls back.
    pub fn transaction(&mut self) -> DbResult<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }
}

/// True when the error is a SQLite foreign key or check constraint failure.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(db: &Database) -> Vec<String> {
        db.conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();
        let tables = table_names(&db);

        for table in [
            "users",
            "blood_groups",
            "hospitals",
            "blood_centers",
            "recipients",
            "appointments",
            "donations",
            "blood_requests",
            "blood_request_items",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }
    }

    #[test]
    fn test_blood_groups_seeded_once() {
        let db = Database::open_in_memory().unwrap();
        db.conn().execute_batch(SCHEMA).unwrap();

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM blood_groups", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 8);
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .conn()
            .execute(
                "INSERT INTO blood_requests (hospital_id, request_date, status, created_at, updated_at)
                 VALUES (999, '2024-01-01', 'pending', '2024-01-01', '2024-01-01')",
                [],
            )
            .unwrap_err();
        assert!(is_constraint_violation(&err));
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let mut db = Database::open_in_memory().unwrap();
        {
            let tx = db.transaction().unwrap();
            tx.execute("INSERT INTO blood_groups (name) VALUES ('X+')", []).unwrap();
        }
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM blood_groups WHERE name = 'X+'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bloodbank.db");
        {
            let db = Database::open(&path).unwrap();
            db.conn()
                .execute("INSERT INTO blood_groups (name) VALUES ('X+')", [])
                .unwrap();
        }
        let reopened = Database::open(&path).unwrap();
        let count: i64 = reopened
            .conn()
            .query_row("SELECT COUNT(*) FROM blood_groups", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 9);
    }
}
