use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info, instrument, warn};

use shared_models::error::FieldErrors;
use shared_models::pagination::{Paginated, Pagination};
use shared_utils::scope::Scope;

use crate::models::{
    Appointment, AppointmentError, AppointmentQuery, AppointmentStatus, BookAppointmentRequest,
    UpdateAppointmentRequest,
};
use crate::repository;
use crate::services::lifecycle::AppointmentLifecycleService;

pub struct AppointmentService {
    lifecycle: AppointmentLifecycleService,
}

impl Default for AppointmentService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentService {
    pub fn new() -> Self {
        Self {
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    #[instrument(skip(self, conn, request))]
    pub fn book(
        &self,
        conn: &Connection,
        scope: &Scope,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let mut errors = FieldErrors::new();

        let user_id = match scope {
            Scope::Donor(id) => Some(*id),
            Scope::System | Scope::BloodCenter(_) => request.user_id,
            _ => return Err(AppointmentError::Forbidden),
        };
        let blood_center_id = match (scope, request.blood_center_id) {
            (Scope::BloodCenter(own), Some(other)) if other != *own => {
                return Err(AppointmentError::Forbidden)
            }
            (Scope::BloodCenter(own), _) => Some(*own),
            (_, requested) => requested,
        };

        match user_id {
            None => errors.add("user_id", "The donor field is required."),
            Some(id) if !repository::is_donor(conn, id)? => {
                errors.add("user_id", "The selected donor is invalid.")
            }
            Some(_) => {}
        }
        match blood_center_id {
            None => errors.add("blood_center_id", "The blood center field is required."),
            Some(id) if !repository::blood_center_exists(conn, id)? => {
                errors.add("blood_center_id", "The selected blood center is invalid.")
            }
            Some(_) => {}
        }
        let appointment_date = match request.appointment_date {
            Some(date) if self.lifecycle.validate_appointment_date(date, Utc::now()).is_err() => {
                errors.add("appointment_date", "The appointment date must be in the future.");
                None
            }
            Some(date) => Some(date),
            None => {
                errors.add("appointment_date", "The appointment date field is required.");
                None
            }
        };
        errors.into_result()?;

        let (Some(user_id), Some(blood_center_id), Some(appointment_date)) =
            (user_id, blood_center_id, appointment_date)
        else {
            return Err(FieldErrors::single("appointment", "Incomplete appointment request.").into());
        };

        let notes = request.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let id = repository::insert_appointment(
            conn,
            user_id,
            blood_center_id,
            appointment_date,
            notes,
            Utc::now(),
        )?;

        info!(
            "Booked appointment {} for donor {} at blood center {}",
            id, user_id, blood_center_id
        );
        self.show(conn, scope, id)
    }

    #[instrument(skip(self, conn, request))]
    pub fn update(
        &self,
        conn: &Connection,
        scope: &Scope,
        appointment_id: i64,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.show(conn, scope, appointment_id)?;
        self.lifecycle.ensure_modifiable(appointment.status)?;

        let appointment_date = match request.appointment_date {
            Some(date) => {
                self.lifecycle.validate_appointment_date(date, Utc::now())?;
                date
            }
            None => appointment.appointment_date,
        };
        let notes = match request.notes.as_deref() {
            Some(notes) => Some(notes.trim()).filter(|n| !n.is_empty()),
            None => appointment.notes.as_deref(),
        };

        repository::update_appointment(conn, appointment_id, appointment_date, notes, Utc::now())?;
        debug!("Updated appointment {}", appointment_id);
        self.show(conn, scope, appointment_id)
    }

    #[instrument(skip(self, conn))]
    pub fn change_status(
        &self,
        conn: &Connection,
        scope: &Scope,
        appointment_id: i64,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.show(conn, scope, appointment_id)?;

        if matches!(scope, Scope::Donor(_)) && new_status != AppointmentStatus::Cancelled {
            warn!("Donor attempted to set appointment {} to {}", appointment_id, new_status);
            return Err(AppointmentError::Forbidden);
        }
        self.lifecycle
            .validate_status_transition(appointment.status, new_status)?;

        repository::set_status(conn, appointment_id, new_status, Utc::now())?;
        info!(
            "Appointment {} moved {} -> {}",
            appointment_id, appointment.status, new_status
        );
        self.show(conn, scope, appointment_id)
    }

    #[instrument(skip(self, conn))]
    pub fn delete(&self, conn: &Connection, scope: &Scope, appointment_id: i64) -> Result<(), AppointmentError> {
        let appointment = self.show(conn, scope, appointment_id)?;
        if matches!(scope, Scope::Donor(_)) {
            return Err(AppointmentError::Forbidden);
        }

        repository::delete_appointment(conn, appointment.id)?;
        info!("Deleted appointment {}", appointment.id);
        Ok(())
    }

    pub fn show(&self, conn: &Connection, scope: &Scope, appointment_id: i64) -> Result<Appointment, AppointmentError> {
        let appointment =
            repository::find_appointment(conn, appointment_id)?.ok_or(AppointmentError::NotFound)?;

        let visible = match scope {
            Scope::System => true,
            Scope::BloodCenter(own) => *own == appointment.blood_center_id,
            Scope::Donor(own) => *own == appointment.user_id,
            Scope::Hospital(_) | Scope::Customer(_) => false,
        };
        if !visible {
            return Err(AppointmentError::Forbidden);
        }
        Ok(appointment)
    }

    pub fn list(
        &self,
        conn: &Connection,
        scope: &Scope,
        query: &AppointmentQuery,
    ) -> Result<Paginated<Appointment>, AppointmentError> {
        let (center_scope, donor_scope) = match scope {
            Scope::System => (None, None),
            Scope::BloodCenter(id) => (Some(*id), None),
            Scope::Donor(id) => (None, Some(*id)),
            Scope::Hospital(_) | Scope::Customer(_) => return Err(AppointmentError::Forbidden),
        };

        let pagination = Pagination::new(query.page, query.per_page);
        let (rows, total) =
            repository::list_appointments(conn, query, center_scope, donor_scope, pagination)?;
        Ok(Paginated::new(rows, pagination, total))
    }
}
