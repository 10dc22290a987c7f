use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use shared_models::error::FieldErrors;

use crate::models::{AppointmentError, AppointmentStatus};

pub struct AppointmentLifecycleService;

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        info!("Status transition validated: {} -> {}", current_status, new_status);
        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> &'static [AppointmentStatus] {
        match current_status {
            AppointmentStatus::Scheduled => &[
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
                AppointmentStatus::Completed,
            ],
            AppointmentStatus::Confirmed => &[
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            // Terminal states
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow => &[],
        }
    }

    /// Date and notes may change only while the appointment is open.
    pub fn ensure_modifiable(&self, current_status: AppointmentStatus) -> Result<(), AppointmentError> {
        if current_status.is_open() {
            Ok(())
        } else {
            Err(AppointmentError::NotModifiable(current_status))
        }
    }

    /// Bookings and reschedules must point to the future.
    pub fn validate_appointment_date(
        &self,
        appointment_date: DateTime<Utc>,
        current_time: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        if appointment_date <= current_time {
            return Err(FieldErrors::single(
                "appointment_date",
                "The appointment date must be in the future.",
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    #[test]
    fn test_transition_table() {
        let service = AppointmentLifecycleService::new();

        assert!(service
            .validate_status_transition(AppointmentStatus::Scheduled, AppointmentStatus::Confirmed)
            .is_ok());
        assert!(service
            .validate_status_transition(AppointmentStatus::Confirmed, AppointmentStatus::Completed)
            .is_ok());
        assert!(service
            .validate_status_transition(AppointmentStatus::Scheduled, AppointmentStatus::NoShow)
            .is_ok());

        assert_matches!(
            service.validate_status_transition(AppointmentStatus::Confirmed, AppointmentStatus::Scheduled),
            Err(AppointmentError::InvalidStatusTransition { .. })
        );
        for terminal in [
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
        ] {
            assert!(service.get_valid_transitions(terminal).is_empty());
            assert_matches!(service.ensure_modifiable(terminal), Err(AppointmentError::NotModifiable(_)));
        }
    }

    #[test]
    fn test_appointment_date_must_be_future() {
        let service = AppointmentLifecycleService::new();
        let now = Utc::now();

        assert!(service.validate_appointment_date(now + Duration::hours(2), now).is_ok());
        assert_matches!(
            service.validate_appointment_date(now - Duration::minutes(1), now),
            Err(AppointmentError::Validation(ref errors)) if errors.contains("appointment_date")
        );
    }
}
