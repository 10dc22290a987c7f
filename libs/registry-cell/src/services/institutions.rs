use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info, instrument};

use shared_config::AppConfig;
use shared_database::Database;
use shared_models::error::FieldErrors;
use shared_models::pagination::{Paginated, Pagination};
use shared_utils::password::hash_password;
use shared_utils::scope::Scope;
use shared_utils::validation::{is_valid_email, is_valid_phone};

use crate::models::{Institution, InstitutionKind, InstitutionPayload, InstitutionQuery, RegistryError};
use crate::repository::{self, InstitutionRow};
use crate::services::{clean, hash_error};

/// Hospitals and blood centers. Each one owns a staff login created with
/// the configured default password.
pub struct InstitutionService<'a> {
    config: &'a AppConfig,
    kind: InstitutionKind,
}

impl<'a> InstitutionService<'a> {
    pub fn new(config: &'a AppConfig, kind: InstitutionKind) -> Self {
        Self { config, kind }
    }

    #[instrument(skip(self, db, payload), fields(kind = self.kind.table()))]
    pub fn create(
        &self,
        db: &mut Database,
        scope: &Scope,
        payload: InstitutionPayload,
    ) -> Result<Institution, RegistryError> {
        if !scope.is_system() {
            return Err(RegistryError::Forbidden);
        }

        let row = validate_institution(db.conn(), &payload, None)?;
        let password_hash = hash_password(&self.config.default_staff_password).map_err(hash_error)?;
        let now = Utc::now();

        let tx = db.transaction()?;
        let user_id = repository::insert_user(
            &tx,
            &row.name,
            &row.email,
            &password_hash,
            self.kind.staff_type(),
            row.phone.as_deref(),
            now,
        )?;
        let id = repository::insert_institution(&tx, self.kind, user_id, &row, now)?;
        tx.commit()?;

        info!("{} {} created with staff user {}", self.kind.label(), id, user_id);
        self.find(db.conn(), id)
    }

    #[instrument(skip(self, db, payload), fields(kind = self.kind.table()))]
    pub fn update(
        &self,
        db: &mut Database,
        scope: &Scope,
        id: i64,
        payload: InstitutionPayload,
    ) -> Result<Institution, RegistryError> {
        let existing = self.find(db.conn(), id)?;
        self.authorize_own(scope, id)?;

        let merged = InstitutionPayload {
            name: payload.name.or(Some(existing.name)),
            address: payload.address.or(existing.address),
            phone: payload.phone.or(existing.phone),
            email: payload.email.or(Some(existing.email)),
        };
        let row = validate_institution(db.conn(), &merged, Some(existing.user_id))?;
        let now = Utc::now();

        let tx = db.transaction()?;
        repository::update_institution(&tx, self.kind, id, &row, now)?;
        repository::sync_staff_user(&tx, existing.user_id, &row, now)?;
        tx.commit()?;

        info!("{} {} updated", self.kind.label(), id);
        self.find(db.conn(), id)
    }

    /// Removes the institution and its staff login together.
    #[instrument(skip(self, db), fields(kind = self.kind.table()))]
    pub fn delete(&self, db: &mut Database, scope: &Scope, id: i64) -> Result<(), RegistryError> {
        if !scope.is_system() {
            return Err(RegistryError::Forbidden);
        }
        let existing = self.find(db.conn(), id)?;

        let history = repository::institution_history(db.conn(), self.kind, id)?;
        if history > 0 {
            let records = match self.kind {
                InstitutionKind::Hospital => "blood requests",
                InstitutionKind::BloodCenter => "donations",
            };
            return Err(RegistryError::InUse(format!(
                "{} has {} {} and cannot be deleted",
                self.kind.label(),
                history,
                records
            )));
        }

        let tx = db.transaction()?;
        repository::delete_institution(&tx, self.kind, id)?;
        repository::delete_user(&tx, existing.user_id)?;
        tx.commit()?;

        info!("{} {} deleted with staff user {}", self.kind.label(), id, existing.user_id);
        Ok(())
    }

    /// Any signed-in user may look institutions up.
    pub fn show(&self, conn: &Connection, id: i64) -> Result<Institution, RegistryError> {
        self.find(conn, id)
    }

    pub fn list(&self, conn: &Connection, query: &InstitutionQuery) -> Result<Paginated<Institution>, RegistryError> {
        let pagination = Pagination::new(query.page, query.per_page);
        let (rows, total) = repository::list_institutions(conn, self.kind, query, pagination)?;
        debug!("Listed {} of {} {}", rows.len(), total, self.kind.table());
        Ok(Paginated::new(rows, pagination, total))
    }

    fn find(&self, conn: &Connection, id: i64) -> Result<Institution, RegistryError> {
        repository::find_institution(conn, self.kind, id)?.ok_or(RegistryError::NotFound(self.kind.label()))
    }

    /// System users edit any institution; staff edit only their own.
    fn authorize_own(&self, scope: &Scope, id: i64) -> Result<(), RegistryError> {
        let allowed = match (self.kind, scope) {
            (_, Scope::System) => true,
            (InstitutionKind::Hospital, Scope::Hospital(own)) => *own == id,
            (InstitutionKind::BloodCenter, Scope::BloodCenter(own)) => *own == id,
            _ => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(RegistryError::Forbidden)
        }
    }
}

fn validate_institution(
    conn: &Connection,
    payload: &InstitutionPayload,
    staff_user_id: Option<i64>,
) -> Result<InstitutionRow, RegistryError> {
    let mut errors = FieldErrors::new();

    let name = clean(payload.name.as_deref());
    if name.is_none() {
        errors.add("name", "The name field is required.");
    }

    let email = clean(payload.email.as_deref()).map(str::to_lowercase);
    match email.as_deref() {
        None => errors.add("email", "The email field is required."),
        Some(e) if !is_valid_email(e) => errors.add("email", "The email must be a valid email address."),
        Some(e) if repository::email_taken(conn, e, staff_user_id)? => {
            errors.add("email", "The email has already been taken.")
        }
        Some(_) => {}
    }

    let phone = clean(payload.phone.as_deref());
    if phone.is_some_and(|p| !is_valid_phone(p)) {
        errors.add("phone", "The phone format is invalid.");
    }
    errors.into_result()?;

    match (name, email) {
        (Some(name), Some(email)) => Ok(InstitutionRow {
            name: name.to_string(),
            address: clean(payload.address.as_deref()).map(str::to_string),
            phone: phone.map(str::to_string),
            email,
        }),
        _ => Err(FieldErrors::single("name", "The name field is required.").into()),
    }
}
