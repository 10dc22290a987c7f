//! Maps an authenticated user to the institution it acts for.

use rusqlite::{Connection, OptionalExtension};
use tracing::warn;

use shared_models::auth::{User, UserType};
use shared_models::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    System,
    Hospital(i64),
    BloodCenter(i64),
    Donor(i64),
    Customer(i64),
}

impl Scope {
    pub fn hospital_id(&self) -> Option<i64> {
        match self {
            Scope::Hospital(id) => Some(*id),
            _ => None,
        }
    }

    pub fn blood_center_id(&self) -> Option<i64> {
        match self {
            Scope::BloodCenter(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Scope::System)
    }

    /// System users act on any hospital; hospital staff only on their own.
    pub fn ensure_hospital(&self, hospital_id: i64) -> Result<(), AppError> {
        match self {
            Scope::System => Ok(()),
            Scope::Hospital(own) if *own == hospital_id => Ok(()),
            _ => Err(AppError::Forbidden(
                "You are not allowed to access this hospital's records".to_string(),
            )),
        }
    }

    pub fn ensure_blood_center(&self, blood_center_id: i64) -> Result<(), AppError> {
        match self {
            Scope::System => Ok(()),
            Scope::BloodCenter(own) if *own == blood_center_id => Ok(()),
            _ => Err(AppError::Forbidden(
                "You are not allowed to access this blood center's records".to_string(),
            )),
        }
    }

    pub fn ensure_system(&self) -> Result<(), AppError> {
        if self.is_system() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Administrator access required".to_string()))
        }
    }
}

pub fn resolve_scope(conn: &Connection, user: &User) -> Result<Scope, AppError> {
    match user.user_type {
        UserType::System => Ok(Scope::System),
        UserType::Donor => Ok(Scope::Donor(user.id)),
        UserType::Customer => Ok(Scope::Customer(user.id)),
        UserType::HospitalStaff => owned_institution(conn, "hospitals", user.id).map(Scope::Hospital),
        UserType::CenterStaff => {
            owned_institution(conn, "blood_centers", user.id).map(Scope::BloodCenter)
        }
    }
}

fn owned_institution(conn: &Connection, table: &str, user_id: i64) -> Result<i64, AppError> {
    let sql = format!("SELECT id FROM {} WHERE user_id = ?1", table);
    conn.query_row(&sql, [user_id], |row| row.get(0))
        .optional()
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| {
            warn!("Staff user {} has no {} row", user_id, table);
            AppError::Forbidden("Staff account is not linked to an institution".to_string())
        })
}
