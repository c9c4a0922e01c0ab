// libs/appointment-cell/src/services/lifecycle.rs
use crate::models::{AppointmentError, AppointmentStatus};

/// Guards the appointment state machine. Records are never deleted; a
/// scheduled appointment may complete or cancel, and both of those states
/// are terminal.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_status_transition(
        &self,
        current: &AppointmentStatus,
        next: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        let allowed = matches!(
            (current, next),
            (AppointmentStatus::Scheduled, AppointmentStatus::Completed)
                | (AppointmentStatus::Scheduled, AppointmentStatus::Cancelled)
        );

        if allowed {
            Ok(())
        } else {
            Err(AppointmentError::InvalidStatusTransition(*current))
        }
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
