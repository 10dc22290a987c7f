use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{debug, info, instrument, warn};

use donation_cell::services::eligibility::{assess_age, AgeVerdict, MIN_DONOR_AGE};
use shared_database::Database;
use shared_models::error::FieldErrors;
use shared_models::pagination::{Paginated, Pagination};
use shared_utils::password::hash_password;
use shared_utils::scope::Scope;
use shared_utils::validation::{is_valid_email, is_valid_phone};

use crate::models::{Donor, DonorPayload, DonorQuery, DonorResponse, RegistryError, GENDERS};
use crate::repository::{self, DonorRow};
use crate::services::{clean, hash_error};

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub struct DonorService;

impl Default for DonorService {
    fn default() -> Self {
        Self::new()
    }
}

impl DonorService {
    pub fn new() -> Self {
        Self
    }

    /// Register a donor account. Under-age donors are refused; senior donors
    /// are registered with a warning.
    #[instrument(skip(self, db, payload))]
    pub fn create(
        &self,
        db: &mut Database,
        scope: &Scope,
        payload: DonorPayload,
    ) -> Result<DonorResponse, RegistryError> {
        authorize_manage(scope)?;

        let today = Utc::now().date_naive();
        let mut errors = FieldErrors::new();
        let password = match payload.password.as_deref().filter(|p| !p.is_empty()) {
            None => {
                errors.add("password", "The password field is required.");
                None
            }
            Some(p) if p.len() < MIN_PASSWORD_LENGTH => {
                errors.add(
                    "password",
                    format!("The password must be at least {} characters.", MIN_PASSWORD_LENGTH),
                );
                None
            }
            Some(p) => Some(p),
        };
        let row = validate_donor(db.conn(), &payload, None, today, &mut errors)?;
        errors.into_result()?;

        let (Some(row), Some(password)) = (row, password) else {
            return Err(FieldErrors::single("email", "The email field is required.").into());
        };
        let warnings = age_warnings(row.date_of_birth, today);
        let password_hash = hash_password(password).map_err(hash_error)?;

        let tx = db.transaction()?;
        let id = repository::insert_donor(&tx, &row, &password_hash, Utc::now())?;
        tx.commit()?;

        info!("Registered donor {} ({})", id, row.email);
        for warning in &warnings {
            warn!("Donor {}: {}", id, warning);
        }
        let donor = repository::find_donor(db.conn(), id)?.ok_or(RegistryError::NotFound("Donor"))?;
        Ok(DonorResponse { donor, warnings })
    }

    #[instrument(skip(self, db, payload))]
    pub fn update(
        &self,
        db: &mut Database,
        scope: &Scope,
        donor_id: i64,
        payload: DonorPayload,
    ) -> Result<DonorResponse, RegistryError> {
        let existing =
            repository::find_donor(db.conn(), donor_id)?.ok_or(RegistryError::NotFound("Donor"))?;
        match scope {
            Scope::Donor(own) if *own == donor_id => {}
            other => authorize_manage(other)?,
        }

        // Unset fields keep their stored values.
        let merged = DonorPayload {
            first_name: payload.first_name.or(existing.first_name),
            last_name: payload.last_name.or(existing.last_name),
            email: payload.email.or(Some(existing.email)),
            password: None,
            phone: payload.phone.or(existing.phone),
            date_of_birth: payload.date_of_birth.or(existing.date_of_birth),
            gender: payload.gender.or(existing.gender),
            blood_group_id: payload.blood_group_id.or(existing.blood_group_id),
        };

        let today = Utc::now().date_naive();
        let mut errors = FieldErrors::new();
        let password = payload.password.as_deref().filter(|p| !p.is_empty());
        if password.is_some_and(|p| p.len() < MIN_PASSWORD_LENGTH) {
            errors.add(
                "password",
                format!("The password must be at least {} characters.", MIN_PASSWORD_LENGTH),
            );
        }
        let row = validate_donor(db.conn(), &merged, Some(donor_id), today, &mut errors)?;
        errors.into_result()?;
        let Some(row) = row else {
            return Err(FieldErrors::single("email", "The email field is required.").into());
        };

        let password_hash = password.map(hash_password).transpose().map_err(hash_error)?;
        let warnings = age_warnings(row.date_of_birth, today);

        let tx = db.transaction()?;
        repository::update_donor(&tx, donor_id, &row, password_hash.as_deref(), Utc::now())?;
        tx.commit()?;

        info!("Updated donor {}", donor_id);
        let donor =
            repository::find_donor(db.conn(), donor_id)?.ok_or(RegistryError::NotFound("Donor"))?;
        Ok(DonorResponse { donor, warnings })
    }

    /// Donors with recorded donations are kept for traceability.
    #[instrument(skip(self, db))]
    pub fn delete(&self, db: &mut Database, scope: &Scope, donor_id: i64) -> Result<(), RegistryError> {
        if !scope.is_system() {
            return Err(RegistryError::Forbidden);
        }
        repository::find_donor(db.conn(), donor_id)?.ok_or(RegistryError::NotFound("Donor"))?;

        let donations = repository::donation_count(db.conn(), donor_id)?;
        if donations > 0 {
            return Err(RegistryError::InUse(format!(
                "Donor has {} recorded donations and cannot be deleted",
                donations
            )));
        }

        let tx = db.transaction()?;
        repository::delete_user(&tx, donor_id)?;
        tx.commit()?;

        info!("Deleted donor {}", donor_id);
        Ok(())
    }

    pub fn show(&self, conn: &Connection, scope: &Scope, donor_id: i64) -> Result<Donor, RegistryError> {
        match scope {
            Scope::Donor(own) if *own != donor_id => return Err(RegistryError::Forbidden),
            Scope::Donor(_) => {}
            other => authorize_manage(other)?,
        }
        repository::find_donor(conn, donor_id)?.ok_or(RegistryError::NotFound("Donor"))
    }

    pub fn list(
        &self,
        conn: &Connection,
        scope: &Scope,
        query: &DonorQuery,
    ) -> Result<Paginated<Donor>, RegistryError> {
        authorize_manage(scope)?;

        let pagination = Pagination::new(query.page, query.per_page);
        let (rows, total) = repository::list_donors(conn, query, pagination)?;
        debug!("Listed {} of {} donors", rows.len(), total);
        Ok(Paginated::new(rows, pagination, total))
    }
}

/// System users and blood center staff maintain the donor registry.
fn authorize_manage(scope: &Scope) -> Result<(), RegistryError> {
    match scope {
        Scope::System | Scope::BloodCenter(_) => Ok(()),
        _ => Err(RegistryError::Forbidden),
    }
}

fn age_warnings(date_of_birth: NaiveDate, today: NaiveDate) -> Vec<String> {
    assess_age(date_of_birth, today).warning().into_iter().collect()
}

/// Field checks shared by create and update. Returns the row to write when
/// every required field is present.
fn validate_donor(
    conn: &Connection,
    payload: &DonorPayload,
    donor_id: Option<i64>,
    today: NaiveDate,
    errors: &mut FieldErrors,
) -> Result<Option<DonorRow>, RegistryError> {
    let first_name = clean(payload.first_name.as_deref());
    if first_name.is_none() {
        errors.add("first_name", "The first name field is required.");
    }
    let last_name = clean(payload.last_name.as_deref());
    if last_name.is_none() {
        errors.add("last_name", "The last name field is required.");
    }

    let email = clean(payload.email.as_deref()).map(str::to_lowercase);
    match email.as_deref() {
        None => errors.add("email", "The email field is required."),
        Some(e) if !is_valid_email(e) => errors.add("email", "The email must be a valid email address."),
        Some(e) if repository::email_taken(conn, e, donor_id)? => {
            errors.add("email", "The email has already been taken.")
        }
        Some(_) => {}
    }

    let phone = clean(payload.phone.as_deref());
    if phone.is_some_and(|p| !is_valid_phone(p)) {
        errors.add("phone", "The phone format is invalid.");
    }

    let gender = clean(payload.gender.as_deref()).map(str::to_lowercase);
    if gender.as_deref().is_some_and(|g| !GENDERS.contains(&g)) {
        errors.add("gender", "The selected gender is invalid.");
    }

    match payload.date_of_birth {
        None => errors.add("date_of_birth", "The date of birth field is required."),
        Some(dob) if dob > today => errors.add("date_of_birth", "The date of birth must be in the past."),
        Some(dob) => {
            if let AgeVerdict::TooYoung { age } = assess_age(dob, today) {
                errors.add(
                    "date_of_birth",
                    format!("Donor must be at least {} years old (currently {}).", MIN_DONOR_AGE, age),
                );
            }
        }
    }

    match payload.blood_group_id {
        None => errors.add("blood_group_id", "The blood group field is required."),
        Some(id) if !repository::blood_group_exists(conn, id)? => {
            errors.add("blood_group_id", "The selected blood group is invalid.")
        }
        Some(_) => {}
    }

    let row = match (first_name, last_name, email, payload.date_of_birth, payload.blood_group_id) {
        (Some(first_name), Some(last_name), Some(email), Some(date_of_birth), Some(blood_group_id)) => {
            Some(DonorRow {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email,
                phone: phone.map(str::to_string),
                date_of_birth,
                gender,
                blood_group_id,
            })
        }
        _ => None,
    };
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_senior_donor_gets_warning() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(age_warnings(NaiveDate::from_ymd_opt(1950, 1, 1).unwrap(), today).len(), 1);
        assert!(age_warnings(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(), today).is_empty());
    }

    #[test]
    fn test_staff_roles_manage_donors() {
        assert!(authorize_manage(&Scope::System).is_ok());
        assert!(authorize_manage(&Scope::BloodCenter(1)).is_ok());
        assert!(authorize_manage(&Scope::Hospital(1)).is_err());
        assert!(authorize_manage(&Scope::Donor(1)).is_err());
    }
}
