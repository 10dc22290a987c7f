use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info, instrument, warn};

use shared_database::Database;
use shared_models::error::FieldErrors;
use shared_models::pagination::{Paginated, Pagination};
use shared_utils::scope::Scope;

use crate::models::{Recipient, RecipientPayload, RecipientQuery, RegistryError, GENDERS};
use crate::repository::{self, RecipientRow};
use crate::services::clean;

/// Patients registered by a hospital. Hospital staff only ever see and
/// touch their own hospital's recipients.
pub struct RecipientService;

impl Default for RecipientService {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipientService {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, db, payload))]
    pub fn create(
        &self,
        db: &mut Database,
        scope: &Scope,
        payload: RecipientPayload,
    ) -> Result<Recipient, RegistryError> {
        let hospital_id = match (scope, payload.hospital_id) {
            (Scope::Hospital(own), Some(other)) if other != *own => return Err(RegistryError::Forbidden),
            (Scope::Hospital(own), _) => *own,
            (Scope::System, Some(id)) if repository::hospital_exists(db.conn(), id)? => id,
            (Scope::System, Some(_)) => {
                return Err(FieldErrors::single("hospital_id", "The selected hospital is invalid.").into())
            }
            (Scope::System, None) => {
                return Err(FieldErrors::single("hospital_id", "The hospital field is required.").into())
            }
            _ => return Err(RegistryError::Forbidden),
        };

        let row = validate_recipient(db.conn(), hospital_id, &payload)?;

        let tx = db.transaction()?;
        let id = repository::insert_recipient(&tx, &row, Utc::now())?;
        tx.commit()?;

        info!("Registered recipient {} at hospital {}", id, hospital_id);
        repository::find_recipient(db.conn(), id)?.ok_or(RegistryError::NotFound("Recipient"))
    }

    #[instrument(skip(self, db, payload))]
    pub fn update(
        &self,
        db: &mut Database,
        scope: &Scope,
        recipient_id: i64,
        payload: RecipientPayload,
    ) -> Result<Recipient, RegistryError> {
        let existing = self.show(db.conn(), scope, recipient_id)?;
        if payload.hospital_id.is_some_and(|id| id != existing.hospital_id) {
            return Err(FieldErrors::single(
                "hospital_id",
                "A recipient cannot be moved to another hospital.",
            )
            .into());
        }

        let merged = RecipientPayload {
            hospital_id: Some(existing.hospital_id),
            name: payload.name.or(Some(existing.name)),
            id_number: payload.id_number.or(existing.id_number),
            date_of_birth: payload.date_of_birth.or(existing.date_of_birth),
            gender: payload.gender.or(existing.gender),
            blood_group_id: payload.blood_group_id.or(Some(existing.blood_group_id)),
            medical_notes: payload.medical_notes.or(existing.medical_notes),
        };
        let row = validate_recipient(db.conn(), existing.hospital_id, &merged)?;

        let tx = db.transaction()?;
        repository::update_recipient(&tx, recipient_id, &row, Utc::now())?;
        tx.commit()?;

        info!("Updated recipient {}", recipient_id);
        repository::find_recipient(db.conn(), recipient_id)?.ok_or(RegistryError::NotFound("Recipient"))
    }

    /// Recipients named on a blood request item stay on record.
    #[instrument(skip(self, db))]
    pub fn delete(&self, db: &mut Database, scope: &Scope, recipient_id: i64) -> Result<(), RegistryError> {
        self.show(db.conn(), scope, recipient_id)?;

        let items = repository::recipient_item_count(db.conn(), recipient_id)?;
        if items > 0 {
            warn!("Recipient {} is referenced by {} request items", recipient_id, items);
            return Err(RegistryError::InUse(format!(
                "Recipient is referenced by {} blood request items and cannot be deleted",
                items
            )));
        }

        let tx = db.transaction()?;
        repository::delete_recipient(&tx, recipient_id)?;
        tx.commit()?;

        info!("Deleted recipient {}", recipient_id);
        Ok(())
    }

    pub fn show(&self, conn: &Connection, scope: &Scope, recipient_id: i64) -> Result<Recipient, RegistryError> {
        let recipient =
            repository::find_recipient(conn, recipient_id)?.ok_or(RegistryError::NotFound("Recipient"))?;
        match scope {
            Scope::System => Ok(recipient),
            Scope::Hospital(own) if *own == recipient.hospital_id => Ok(recipient),
            _ => Err(RegistryError::Forbidden),
        }
    }

    pub fn list(
        &self,
        conn: &Connection,
        scope: &Scope,
        query: &RecipientQuery,
    ) -> Result<Paginated<Recipient>, RegistryError> {
        let hospital_scope = match scope {
            Scope::System => None,
            Scope::Hospital(own) => Some(*own),
            _ => return Err(RegistryError::Forbidden),
        };

        let pagination = Pagination::new(query.page, query.per_page);
        let (rows, total) = repository::list_recipients(conn, query, hospital_scope, pagination)?;
        debug!("Listed {} of {} recipients", rows.len(), total);
        Ok(Paginated::new(rows, pagination, total))
    }
}

fn validate_recipient(
    conn: &Connection,
    hospital_id: i64,
    payload: &RecipientPayload,
) -> Result<RecipientRow, RegistryError> {
    let mut errors = FieldErrors::new();

    let name = clean(payload.name.as_deref());
    if name.is_none() {
        errors.add("name", "The name field is required.");
    }
    match payload.blood_group_id {
        None => errors.add("blood_group_id", "The blood group field is required."),
        Some(id) if !repository::blood_group_exists(conn, id)? => {
            errors.add("blood_group_id", "The selected blood group is invalid.")
        }
        Some(_) => {}
    }
    let gender = clean(payload.gender.as_deref()).map(str::to_lowercase);
    if gender.as_deref().is_some_and(|g| !GENDERS.contains(&g)) {
        errors.add("gender", "The selected gender is invalid.");
    }
    if payload
        .date_of_birth
        .is_some_and(|dob| dob > Utc::now().date_naive())
    {
        errors.add("date_of_birth", "The date of birth must be in the past.");
    }
    errors.into_result()?;

    match (name, payload.blood_group_id) {
        (Some(name), Some(blood_group_id)) => Ok(RecipientRow {
            hospital_id,
            name: name.to_string(),
            id_number: clean(payload.id_number.as_deref()).map(str::to_string),
            date_of_birth: payload.date_of_birth,
            gender,
            blood_group_id,
            medical_notes: clean(payload.medical_notes.as_deref()).map(str::to_string),
        }),
        _ => Err(FieldErrors::single("name", "The name field is required.").into()),
    }
}
