// libs/appointment-cell/src/services/conflict.rs
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use doctor_cell::models::intervals_overlap;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentError};

/// True iff any scheduled appointment occupies part of
/// `[proposed_start, proposed_end)`.
pub fn has_conflict(
    proposed_start: DateTime<Utc>,
    proposed_end: DateTime<Utc>,
    existing: &[Appointment],
) -> bool {
    existing.iter().any(|appointment| {
        appointment.blocks_slot()
            && intervals_overlap(
                proposed_start,
                proposed_end,
                appointment.start_time,
                appointment.end_time,
            )
    })
}

pub struct ConflictDetectionService {
    supabase: Arc<SupabaseClient>,
}

impl ConflictDetectionService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Pre-write guard for the booking engine: fetches the doctor's
    /// appointments intersecting the proposed interval and applies the
    /// overlap predicate in memory.
    pub async fn check_conflicts(
        &self,
        doctor_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        debug!(
            "Checking conflicts for doctor {} from {} to {}",
            doctor_id, start_time, end_time
        );

        let existing = self
            .get_doctor_appointments_in_range(doctor_id, start_time, end_time, auth_token)
            .await?;

        let conflict = has_conflict(start_time, end_time, &existing);

        if conflict {
            warn!(
                "Conflict detected for doctor {} at {}",
                doctor_id, start_time
            );
        }

        Ok(conflict)
    }

    async fn get_doctor_appointments_in_range(
        &self,
        doctor_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        // Half-open intersection: rows starting before our end and ending
        // after our start.
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&start_time=lt.{}&end_time=gt.{}&order=start_time.asc",
            doctor_id,
            urlencoding::encode(&end_time.to_rfc3339()),
            urlencoding::encode(&start_time.to_rfc3339()),
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointments: Vec<Appointment> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))?;

        Ok(appointments)
    }
}
