// libs/doctor-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Consultation slots default to one hour when a doctor's policy does not
/// say otherwise.
pub const DEFAULT_SLOT_MINUTES: i32 = 60;

// ==============================================================================
// DOCTOR DIRECTORY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialty: String,
    pub work_start: Option<NaiveTime>,
    pub work_end: Option<NaiveTime>,
    pub slot_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    pub fn display_name(&self) -> String {
        format!("Dr. {} {}", self.first_name, self.last_name)
    }

    /// The per-day bookable window. A doctor without a configured window has
    /// no bookable hours at all.
    pub fn working_hours(&self) -> Option<WorkingHours> {
        match (self.work_start, self.work_end) {
            (Some(start), Some(end)) if start < end => Some(WorkingHours {
                start,
                end,
                slot_minutes: self.slot_minutes.unwrap_or(DEFAULT_SLOT_MINUTES),
            }),
            _ => None,
        }
    }
}

/// A doctor's daily schedule policy: the window candidate slots are carved
/// out of, and how long each slot runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub slot_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialty: String,
    pub work_start: Option<NaiveTime>,
    pub work_end: Option<NaiveTime>,
    pub slot_minutes: Option<i32>,
}

// ==============================================================================
// TIME SLOT MODEL
// ==============================================================================

/// A candidate appointment interval `[start_time, end_time)`. Computed on
/// demand for a doctor and day, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_available: bool,
}

impl Slot {
    pub fn overlaps(&self, other: &Slot) -> bool {
        intervals_overlap(self.start_time, self.end_time, other.start_time, other.end_time)
    }
}

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)`
/// share an instant iff a_start < b_end AND b_start < a_end. Back-to-back
/// intervals do not overlap.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Minimal view of a stored appointment: just the interval it occupies.
/// The availability calculator only needs this much.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedInterval {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorAvailabilityResponse {
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub specialty: String,
    pub date: NaiveDate,
    pub available_slots: Vec<Slot>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Doctor with email {0} already exists")]
    AlreadyExists(String),

    #[error("Invalid working hours: {0}")]
    InvalidWorkingHours(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn doctor(work_start: Option<&str>, work_end: Option<&str>, slot_minutes: Option<i32>) -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            first_name: "Indiana".to_string(),
            last_name: "Jones".to_string(),
            email: "jones@clinic.example".to_string(),
            specialty: "General Practice".to_string(),
            work_start: work_start.map(|t| NaiveTime::parse_from_str(t, "%H:%M").unwrap()),
            work_end: work_end.map(|t| NaiveTime::parse_from_str(t, "%H:%M").unwrap()),
            slot_minutes,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn display_name_carries_the_title() {
        assert_eq!(doctor(None, None, None).display_name(), "Dr. Indiana Jones");
    }

    #[test]
    fn working_hours_default_to_hour_slots() {
        let hours = doctor(Some("09:00"), Some("17:00"), None).working_hours().unwrap();
        assert_eq!(hours.slot_minutes, DEFAULT_SLOT_MINUTES);
    }

    #[test]
    fn missing_or_inverted_window_means_no_policy() {
        assert!(doctor(None, None, None).working_hours().is_none());
        assert!(doctor(Some("09:00"), None, None).working_hours().is_none());
        assert!(doctor(Some("17:00"), Some("09:00"), Some(30)).working_hours().is_none());
    }

    #[test]
    fn slot_overlap_matches_interval_overlap() {
        let at = |h: u32| Utc.with_ymd_and_hms(2025, 3, 10, h, 0, 0).unwrap();
        let nine = Slot { start_time: at(9), end_time: at(10), is_available: true };
        let half_past = Slot { start_time: at(9) + chrono::Duration::minutes(30), end_time: at(10) + chrono::Duration::minutes(30), is_available: true };
        let ten = Slot { start_time: at(10), end_time: at(11), is_available: true };

        assert!(nine.overlaps(&half_past));
        assert!(half_past.overlaps(&nine));
        assert!(nine.overlaps(&nine));
        assert!(!nine.overlaps(&ten));
        assert!(!ten.overlaps(&nine));
    }
}
