// libs/doctor-cell/src/services/availability.rs
use chrono::{Duration, NaiveDate};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{intervals_overlap, BookedInterval, DoctorError, Slot, WorkingHours};
use crate::services::doctor::DoctorService;

/// Partition a doctor's working window on `date` into consecutive
/// fixed-duration slots, marking each one unavailable when it overlaps a
/// booked interval. A trailing window shorter than one slot is not offered.
/// No working-hours policy means no slots at all.
pub fn compute_day_slots(
    hours: Option<&WorkingHours>,
    booked: &[BookedInterval],
    date: NaiveDate,
) -> Vec<Slot> {
    let Some(hours) = hours else {
        return Vec::new();
    };
    if hours.slot_minutes <= 0 || hours.start >= hours.end {
        return Vec::new();
    }

    let window_end = date.and_time(hours.end).and_utc();
    let slot_duration = Duration::minutes(hours.slot_minutes as i64);

    let mut slots = Vec::new();
    let mut current = date.and_time(hours.start).and_utc();

    while current + slot_duration <= window_end {
        let slot_end = current + slot_duration;

        let taken = booked
            .iter()
            .any(|interval| intervals_overlap(current, slot_end, interval.start_time, interval.end_time));

        slots.push(Slot {
            start_time: current,
            end_time: slot_end,
            is_available: !taken,
        });

        current = slot_end;
    }

    slots
}

/// The free subset of `compute_day_slots`, in chronological order.
pub fn compute_availability(
    hours: Option<&WorkingHours>,
    booked: &[BookedInterval],
    date: NaiveDate,
) -> Vec<Slot> {
    compute_day_slots(hours, booked, date)
        .into_iter()
        .filter(|slot| slot.is_available)
        .collect()
}

pub struct AvailabilityService {
    supabase: SupabaseClient,
    doctor_service: DoctorService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctor_service: DoctorService::new(config),
        }
    }

    /// Free slots for a doctor on a calendar date. Only scheduled
    /// appointments block slots; completed and cancelled ones do not.
    pub async fn get_available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Slot>, DoctorError> {
        debug!("Calculating available slots for doctor {} on {}", doctor_id, date);

        let doctor = self.doctor_service.get_doctor(doctor_id, auth_token).await?;

        let booked = self
            .get_scheduled_intervals(doctor_id, date, auth_token)
            .await?;

        let slots = compute_availability(doctor.working_hours().as_ref(), &booked, date);

        debug!("Found {} available slots for doctor {}", slots.len(), doctor_id);
        Ok(slots)
    }

    async fn get_scheduled_intervals(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<BookedInterval>, DoctorError> {
        let start_of_day = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let end_of_day = date.and_hms_opt(23, 59, 59).unwrap().and_utc();

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&status=eq.scheduled&start_time=gte.{}&start_time=lte.{}&order=start_time.asc",
            doctor_id,
            urlencoding::encode(&start_of_day.to_rfc3339()),
            urlencoding::encode(&end_of_day.to_rfc3339()),
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let intervals: Vec<BookedInterval> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<BookedInterval>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse appointments: {}", e)))?;

        Ok(intervals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn hours(start: &str, end: &str, slot_minutes: i32) -> WorkingHours {
        WorkingHours {
            start: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
            end: NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
            slot_minutes,
        }
    }

    fn booked(date: NaiveDate, start: &str, end: &str) -> BookedInterval {
        BookedInterval {
            start_time: date
                .and_time(NaiveTime::parse_from_str(start, "%H:%M").unwrap())
                .and_utc(),
            end_time: date
                .and_time(NaiveTime::parse_from_str(end, "%H:%M").unwrap())
                .and_utc(),
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn morning_booking_splits_the_day() {
        let hours = hours("09:00", "12:00", 60);
        let booked = vec![booked(day(), "10:00", "11:00")];

        let free = compute_availability(Some(&hours), &booked, day());

        assert_eq!(free.len(), 2);
        assert_eq!(free[0].start_time, day().and_hms_opt(9, 0, 0).unwrap().and_utc());
        assert_eq!(free[0].end_time, day().and_hms_opt(10, 0, 0).unwrap().and_utc());
        assert_eq!(free[1].start_time, day().and_hms_opt(11, 0, 0).unwrap().and_utc());
        assert_eq!(free[1].end_time, day().and_hms_opt(12, 0, 0).unwrap().and_utc());
    }

    #[test]
    fn no_working_hours_means_no_slots() {
        assert!(compute_availability(None, &[], day()).is_empty());
    }

    #[test]
    fn trailing_partial_slot_is_dropped() {
        // 09:00-12:30 with hour slots: the 12:00-12:30 remainder is not offered.
        let hours = hours("09:00", "12:30", 60);

        let slots = compute_day_slots(Some(&hours), &[], day());

        assert_eq!(slots.len(), 3);
        assert_eq!(
            slots.last().unwrap().end_time,
            day().and_hms_opt(12, 0, 0).unwrap().and_utc()
        );
    }

    #[test]
    fn free_slots_never_overlap_bookings() {
        let hours = hours("08:00", "18:00", 30);
        let booked = vec![
            booked(day(), "09:15", "10:15"),
            booked(day(), "13:00", "14:00"),
        ];

        let free = compute_availability(Some(&hours), &booked, day());

        for slot in &free {
            for interval in &booked {
                assert!(
                    !intervals_overlap(slot.start_time, slot.end_time, interval.start_time, interval.end_time),
                    "slot {:?} overlaps booking {:?}",
                    slot,
                    interval
                );
            }
        }
    }

    #[test]
    fn marked_slots_cover_the_whole_window() {
        let hours = hours("09:00", "17:00", 60);
        let booked = vec![booked(day(), "11:00", "12:00")];

        let slots = compute_day_slots(Some(&hours), &booked, day());

        // Consecutive, gap-free coverage of [09:00, 17:00).
        assert_eq!(slots.len(), 8);
        assert_eq!(slots[0].start_time, day().and_hms_opt(9, 0, 0).unwrap().and_utc());
        assert_eq!(
            slots.last().unwrap().end_time,
            day().and_hms_opt(17, 0, 0).unwrap().and_utc()
        );
        for pair in slots.windows(2) {
            assert_eq!(pair[0].end_time, pair[1].start_time);
        }

        // Exactly one slot lost to the booking.
        assert_eq!(slots.iter().filter(|s| !s.is_available).count(), 1);
    }

    #[test]
    fn fully_booked_day_has_no_free_slots() {
        let hours = hours("09:00", "11:00", 60);
        let booked = vec![booked(day(), "09:00", "11:00")];

        assert!(compute_availability(Some(&hours), &booked, day()).is_empty());
    }

    #[test]
    fn back_to_back_booking_does_not_block_neighbors() {
        let hours = hours("09:00", "12:00", 60);
        // Booking ends exactly where the 10:00 slot starts.
        let booked = vec![booked(day(), "09:00", "10:00")];

        let free = compute_availability(Some(&hours), &booked, day());

        assert_eq!(free.len(), 2);
        assert_eq!(free[0].start_time, day().and_hms_opt(10, 0, 0).unwrap().and_utc());
    }

    #[test]
    fn overlap_predicate_is_symmetric() {
        let a = booked(day(), "09:00", "10:00");
        let b = booked(day(), "09:30", "10:30");
        let c = booked(day(), "10:00", "11:00");

        assert!(intervals_overlap(a.start_time, a.end_time, b.start_time, b.end_time));
        assert!(intervals_overlap(b.start_time, b.end_time, a.start_time, a.end_time));

        // Self-overlap for any non-empty interval.
        assert!(intervals_overlap(a.start_time, a.end_time, a.start_time, a.end_time));

        // Adjacent half-open intervals are disjoint, both ways.
        assert!(!intervals_overlap(a.start_time, a.end_time, c.start_time, c.end_time));
        assert!(!intervals_overlap(c.start_time, c.end_time, a.start_time, a.end_time));
    }
}
