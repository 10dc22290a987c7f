use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info, instrument, warn};

use appointment_cell::models::AppointmentStatus;
use appointment_cell::repository as appointments;
use appointment_cell::services::AppointmentLifecycleService;
use blood_request_cell::repository as requests;
use shared_database::Database;
use shared_models::error::FieldErrors;
use shared_models::pagination::{Paginated, Pagination};
use shared_utils::scope::Scope;

use crate::models::{
    CreateDonation, Donation, DonationError, DonationQuery, EligibilityRequest, EligibilityResponse,
    UpdateDonation,
};
use crate::repository::{self, DonationRow};
use crate::services::eligibility::{assess_volume, volume_limits, VolumeVerdict};

pub struct DonationService {
    lifecycle: AppointmentLifecycleService,
}

impl Default for DonationService {
    fn default() -> Self {
        Self::new()
    }
}

impl DonationService {
    pub fn new() -> Self {
        Self {
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Record a donation, completing its appointment and crediting its
    /// request item in the same transaction.
    #[instrument(skip(self, db, payload))]
    pub fn create(
        &self,
        db: &mut Database,
        scope: &Scope,
        payload: CreateDonation,
    ) -> Result<Donation, DonationError> {
        let blood_center_id = match (scope, payload.blood_center_id) {
            (Scope::BloodCenter(own), Some(other)) if other != *own => {
                warn!("Center {} tried to record a donation for center {}", own, other);
                return Err(DonationError::Forbidden);
            }
            (Scope::BloodCenter(own), _) => Some(*own),
            (Scope::System, requested) => requested,
            _ => return Err(DonationError::Forbidden),
        };

        let conn = db.conn();
        let mut errors = FieldErrors::new();

        let donor = match payload.user_id {
            None => {
                errors.add("user_id", "The donor field is required.");
                None
            }
            Some(user_id) => match repository::find_donor_blood_group(conn, user_id)? {
                None => {
                    errors.add("user_id", "The selected donor is invalid.");
                    None
                }
                Some(None) => {
                    errors.add("user_id", "The donor has no blood group on record.");
                    None
                }
                Some(Some(blood_group_id)) => Some((user_id, blood_group_id)),
            },
        };
        match blood_center_id {
            None => errors.add("blood_center_id", "The blood center field is required."),
            Some(id) if !repository::blood_center_exists(conn, id)? => {
                errors.add("blood_center_id", "The selected blood center is invalid.")
            }
            Some(_) => {}
        }
        check_measurements(payload.volume_ml, payload.weight, &mut errors);
        errors.into_result()?;

        let (Some((user_id, blood_group_id)), Some(blood_center_id), Some(volume_ml)) =
            (donor, blood_center_id, payload.volume_ml)
        else {
            return Err(FieldErrors::single("user_id", "The donor field is required.").into());
        };

        if let Some(appointment_id) = payload.appointment_id {
            self.check_appointment(conn, appointment_id, user_id, blood_center_id)?;
        }
        if let Some(item_id) = payload.blood_request_item_id {
            check_item(conn, item_id, blood_group_id)?;
        }

        let row = DonationRow {
            user_id,
            blood_center_id,
            blood_group_id,
            appointment_id: payload.appointment_id,
            blood_request_item_id: payload.blood_request_item_id,
            volume_ml,
            weight: payload.weight,
            donation_date_time: payload.donation_date_time.unwrap_or_else(Utc::now),
            screening_status: payload.screening_status.unwrap_or_default(),
            notes: clean_notes(payload.notes),
        };

        let now = Utc::now();
        let tx = db.transaction()?;
        let id = repository::insert_donation(&tx, &row, now)?;
        if let Some(appointment_id) = row.appointment_id {
            appointments::set_status(&tx, appointment_id, AppointmentStatus::Completed, now)?;
        }
        reconcile_items(&tx, &[row.blood_request_item_id])?;
        tx.commit()?;

        info!(
            "Recorded donation {} of {} ml from donor {} at center {}",
            id, row.volume_ml, row.user_id, row.blood_center_id
        );
        repository::find_donation(db.conn(), id)?.ok_or(DonationError::NotFound)
    }

    #[instrument(skip(self, db, payload))]
    pub fn update(
        &self,
        db: &mut Database,
        scope: &Scope,
        donation_id: i64,
        payload: UpdateDonation,
    ) -> Result<Donation, DonationError> {
        let existing = repository::find_donation(db.conn(), donation_id)?.ok_or(DonationError::NotFound)?;
        authorize_manage(scope, existing.blood_center_id)?;

        let mut row = DonationRow::from(&existing);
        if let Some(volume_ml) = payload.volume_ml {
            row.volume_ml = volume_ml;
        }
        if payload.weight.is_some() {
            row.weight = payload.weight;
        }
        if let Some(date) = payload.donation_date_time {
            row.donation_date_time = date;
        }
        if let Some(status) = payload.screening_status {
            row.screening_status = status;
        }
        if payload.notes.is_some() {
            row.notes = clean_notes(payload.notes);
        }

        let mut errors = FieldErrors::new();
        check_measurements(Some(row.volume_ml), row.weight, &mut errors);
        errors.into_result()?;

        if let Some(item_id) = payload.blood_request_item_id {
            if existing.blood_request_item_id != Some(item_id) {
                check_item(db.conn(), item_id, row.blood_group_id)?;
                row.blood_request_item_id = Some(item_id);
            }
        }

        let tx = db.transaction()?;
        repository::update_donation(&tx, donation_id, &row, Utc::now())?;
        reconcile_items(&tx, &[existing.blood_request_item_id, row.blood_request_item_id])?;
        tx.commit()?;

        if existing.screening_status != row.screening_status {
            info!(
                "Donation {} screening {} -> {}",
                donation_id, existing.screening_status, row.screening_status
            );
        }
        repository::find_donation(db.conn(), donation_id)?.ok_or(DonationError::NotFound)
    }

    #[instrument(skip(self, db))]
    pub fn delete(&self, db: &mut Database, scope: &Scope, donation_id: i64) -> Result<(), DonationError> {
        let existing = repository::find_donation(db.conn(), donation_id)?.ok_or(DonationError::NotFound)?;
        authorize_manage(scope, existing.blood_center_id)?;

        let tx = db.transaction()?;
        repository::delete_donation(&tx, donation_id)?;
        reconcile_items(&tx, &[existing.blood_request_item_id])?;
        tx.commit()?;

        info!("Deleted donation {}", donation_id);
        Ok(())
    }

    pub fn show(&self, conn: &Connection, scope: &Scope, donation_id: i64) -> Result<Donation, DonationError> {
        let donation = repository::find_donation(conn, donation_id)?.ok_or(DonationError::NotFound)?;
        let visible = match scope {
            Scope::System => true,
            Scope::BloodCenter(own) => *own == donation.blood_center_id,
            Scope::Donor(own) => *own == donation.user_id,
            Scope::Hospital(_) | Scope::Customer(_) => false,
        };
        if !visible {
            return Err(DonationError::Forbidden);
        }
        Ok(donation)
    }

    pub fn list(
        &self,
        conn: &Connection,
        scope: &Scope,
        query: &DonationQuery,
    ) -> Result<Paginated<Donation>, DonationError> {
        let (center_scope, donor_scope) = match scope {
            Scope::System => (None, None),
            Scope::BloodCenter(id) => (Some(*id), None),
            Scope::Donor(id) => (None, Some(*id)),
            Scope::Hospital(_) | Scope::Customer(_) => return Err(DonationError::Forbidden),
        };

        let pagination = Pagination::new(query.page, query.per_page);
        let (rows, total) =
            repository::list_donations(conn, query, center_scope, donor_scope, pagination)?;
        debug!("Listed {} of {} donations", rows.len(), total);
        Ok(Paginated::new(rows, pagination, total))
    }

    /// The same weight/volume rule that recording enforces, for clients.
    pub fn check_eligibility(&self, request: &EligibilityRequest) -> Result<EligibilityResponse, DonationError> {
        let mut errors = FieldErrors::new();
        if request.weight.is_some_and(|w| w <= 0.0) {
            errors.add("weight", "The weight must be greater than 0.");
        }
        if request.volume_ml.is_some_and(|v| v <= 0.0) {
            errors.add("volume_ml", "The volume must be greater than 0.");
        }
        errors.into_result()?;

        let assessment = assess_volume(request.weight, request.volume_ml);
        let message = match (&assessment, request.weight) {
            (Some(verdict), _) => verdict.message(),
            (None, None) => "Weight is required to assess eligibility".to_string(),
            (None, Some(_)) => "Volume is required to assess eligibility".to_string(),
        };

        Ok(EligibilityResponse {
            eligible: assessment.as_ref().map(VolumeVerdict::is_acceptable),
            assessment,
            message,
            limits: request.weight.and_then(volume_limits),
        })
    }

    fn check_appointment(
        &self,
        conn: &Connection,
        appointment_id: i64,
        user_id: i64,
        blood_center_id: i64,
    ) -> Result<(), DonationError> {
        let Some(appointment) = appointments::find_appointment_ref(conn, appointment_id)? else {
            return Err(
                FieldErrors::single("appointment_id", "The selected appointment is invalid.").into(),
            );
        };
        if appointment.user_id != user_id || appointment.blood_center_id != blood_center_id {
            return Err(FieldErrors::single(
                "appointment_id",
                "The appointment belongs to a different donor or blood center.",
            )
            .into());
        }
        self.lifecycle
            .validate_status_transition(appointment.status, AppointmentStatus::Completed)
            .map_err(|_| DonationError::AppointmentClosed(appointment.status.to_string()))
    }
}

fn authorize_manage(scope: &Scope, blood_center_id: i64) -> Result<(), DonationError> {
    match scope {
        Scope::System => Ok(()),
        Scope::BloodCenter(own) if *own == blood_center_id => Ok(()),
        other => {
            warn!("{:?} refused access to donations of center {}", other, blood_center_id);
            Err(DonationError::Forbidden)
        }
    }
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

/// Volume presence and the weight-derived safety rule.
fn check_measurements(volume_ml: Option<i64>, weight: Option<f64>, errors: &mut FieldErrors) {
    match volume_ml {
        None => errors.add("volume_ml", "The volume field is required."),
        Some(v) if v <= 0 => errors.add("volume_ml", "The volume must be at least 1 ml."),
        Some(_) => {}
    }
    if weight.is_some_and(|w| w <= 0.0) {
        errors.add("weight", "The weight must be greater than 0.");
        return;
    }

    match assess_volume(weight, volume_ml.map(|v| v as f64)) {
        Some(verdict @ VolumeVerdict::Ineligible) => errors.add("weight", verdict.message()),
        Some(verdict @ VolumeVerdict::Unsafe { .. }) => errors.add("volume_ml", verdict.message()),
        _ => {}
    }
}

fn check_item(conn: &Connection, item_id: i64, blood_group_id: i64) -> Result<(), DonationError> {
    let Some(item) = requests::find_stored_item(conn, item_id)? else {
        return Err(FieldErrors::single(
            "blood_request_item_id",
            "The selected blood request item is invalid.",
        )
        .into());
    };
    if !item.status.is_open() {
        return Err(DonationError::ItemClosed {
            code: item.unique_code,
            status: item.status.to_string(),
        });
    }
    if item.blood_group_id != blood_group_id {
        return Err(FieldErrors::single(
            "blood_request_item_id",
            "The item requests a different blood group than the donor's.",
        )
        .into());
    }
    Ok(())
}

/// Recount delivered units for the given items and refresh their requests.
fn reconcile_items(conn: &Connection, item_ids: &[Option<i64>]) -> Result<(), DonationError> {
    let mut seen = Vec::new();
    for item_id in item_ids.iter().flatten() {
        if seen.contains(item_id) {
            continue;
        }
        seen.push(*item_id);

        if requests::reconcile_item(conn, *item_id)?.is_some() {
            if let Some(item) = requests::find_stored_item(conn, *item_id)? {
                let status = requests::recompute_request_status(conn, item.blood_request_id)?;
                debug!("Request {} is {} after reconciling item {}", item.blood_request_id, status, item.unique_code);
            }
        }
    }
    Ok(())
}
