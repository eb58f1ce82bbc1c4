use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AvailableSlot, BookedTime, DayOfWeek, DoctorError, Shift};
use crate::services::shift::ShiftService;

pub const SLOT_MINUTES: i64 = 15;

pub fn slot_interval() -> Duration {
    Duration::minutes(SLOT_MINUTES)
}

/// Half a slot on either side of a booked start time. Used both when
/// listing free slots and when accepting a booking.
pub fn conflict_tolerance() -> Duration {
    Duration::seconds(SLOT_MINUTES * 60 / 2)
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, DoctorError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| DoctorError::InvalidDate(raw.to_string()))
}

/// Absolute `[start, end)` of a shift worked on `date`.
pub fn shift_window(shift: &Shift, date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), DoctorError> {
    let start = date.and_time(shift.start()?).and_utc();
    let mut end = date.and_time(shift.end()?).and_utc();

    if end < start {
        end += Duration::days(1);
    }

    Ok((start, end))
}

/// Whether `at` can start an appointment inside the shift worked on `date`.
pub fn shift_covers(shift: &Shift, date: NaiveDate, at: DateTime<Utc>) -> Result<bool, DoctorError> {
    let (start, end) = shift_window(shift, date)?;
    Ok(start <= at && at < end)
}

pub fn conflicts_with(candidate: DateTime<Utc>, booked: &[DateTime<Utc>]) -> bool {
    let tolerance = conflict_tolerance();
    booked
        .iter()
        .any(|existing| (*existing - candidate).abs() <= tolerance)
}

pub fn format_slot_time(at: DateTime<Utc>) -> String {
    at.format("%H:%M").to_string()
}

/// Walks every shift in 15-minute steps and keeps the steps no booking
/// collides with. `previous_day` shifts contribute only the part that runs
/// past midnight into `date`, on the grid of the night they started. The
/// result is chronological with duplicates from overlapping shifts removed.
pub fn compute_available_slots(
    shifts: &[Shift],
    previous_day: &[Shift],
    date: NaiveDate,
    booked: &[DateTime<Utc>],
) -> Result<Vec<AvailableSlot>, DoctorError> {
    let first = shifts
        .first()
        .ok_or_else(|| DoctorError::NoShiftConfigured(date.weekday().into()))?;
    debug!("Computing slots for {} shift(s) starting with '{}'", shifts.len(), first.shift_name);

    let midnight = day_start(date);
    let mut starts = Vec::new();

    for shift in shifts {
        let (window_start, window_end) = shift_window(shift, date)?;
        walk_window(window_start, window_end, window_start, booked, &mut starts);
    }

    for shift in previous_day {
        let (window_start, window_end) = shift_window(shift, date - Duration::days(1))?;
        if window_end > midnight {
            walk_window(window_start, window_end, midnight, booked, &mut starts);
        }
    }

    starts.sort();
    starts.dedup();

    Ok(starts
        .into_iter()
        .map(|start_time| AvailableSlot {
            time: format_slot_time(start_time),
            start_time,
        })
        .collect())
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Pushes the free grid points of `[start, end)` that are at or after `from`.
fn walk_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    from: DateTime<Utc>,
    booked: &[DateTime<Utc>],
    starts: &mut Vec<DateTime<Utc>>,
) {
    let step = slot_interval();
    let mut current = start;

    while current < end {
        if current >= from && !conflicts_with(current, booked) {
            starts.push(current);
        }
        current += step;
    }
}

pub struct SlotService {
    supabase: Arc<SupabaseClient>,
    shift_service: ShiftService,
}

impl SlotService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            shift_service: ShiftService::with_client(Arc::clone(&supabase)),
            supabase,
        }
    }

    /// Free start times for `doctor_id` on `date` (YYYY-MM-DD). A day with
    /// no shift is an error, not an empty list. Early hours covered by the
    /// previous day's overnight shift are listed too, matching what booking
    /// accepts.
    pub async fn get_available_slots(
        &self,
        doctor_id: &str,
        date: &str,
        auth_token: &str,
    ) -> Result<Vec<AvailableSlot>, DoctorError> {
        let date = parse_date(date)?;
        let day = DayOfWeek::from(date.weekday());
        debug!("Calculating available slots for doctor {} on {} ({})", doctor_id, date, day);

        let shifts = self.shift_service.get_shifts_for_day(doctor_id, day, auth_token).await?;
        if shifts.is_empty() {
            return Err(DoctorError::NoShiftConfigured(day));
        }

        let previous_date = date - Duration::days(1);
        let midnight = day_start(date);
        let mut overnight = Vec::new();
        for shift in self.shift_service
            .get_shifts_for_day(doctor_id, DayOfWeek::from(previous_date.weekday()), auth_token)
            .await?
        {
            if shift_window(&shift, previous_date)?.1 > midnight {
                overnight.push(shift);
            }
        }

        let mut range: Option<(DateTime<Utc>, DateTime<Utc>)> = None;
        for shift in &shifts {
            let (start, end) = shift_window(shift, date)?;
            range = Some(match range {
                Some((from, to)) => (from.min(start), to.max(end)),
                None => (start, end),
            });
        }
        for shift in &overnight {
            let (_, end) = shift_window(shift, previous_date)?;
            range = range.map(|(from, to)| (from.min(midnight), to.max(end)));
        }

        let booked = match range {
            Some((from, to)) => {
                let tolerance = conflict_tolerance();
                self.booked_times(doctor_id, from - tolerance, to + tolerance, auth_token).await?
            }
            None => Vec::new(),
        };

        let slots = compute_available_slots(&shifts, &overnight, date, &booked)?;
        info!("Doctor {} has {} free slot(s) on {}", doctor_id, slots.len(), date);
        Ok(slots)
    }

    /// Start times of the doctor's non-cancelled appointments in `[from, to]`.
    pub async fn booked_times(
        &self,
        doctor_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<DateTime<Utc>>, DoctorError> {
        let path = format!(
            "/rest/v1/appointments?select=scheduled_at&doctor_id=eq.{}&status=neq.cancelled&scheduled_at=gte.{}&scheduled_at=lte.{}&order=scheduled_at.asc",
            doctor_id,
            from.to_rfc3339_opts(SecondsFormat::Secs, true),
            to.to_rfc3339_opts(SecondsFormat::Secs, true)
        );

        let result: Vec<Value> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(|row| serde_json::from_value::<BookedTime>(row).map(|b| b.scheduled_at))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn shift(day: DayOfWeek, start: &str, end: &str) -> Shift {
        Shift {
            id: Uuid::new_v4(),
            doctor_id: Uuid::nil(),
            day_of_week: day,
            start_time: start.to_string(),
            end_time: end.to_string(),
            shift_name: "Clinic".to_string(),
            created_at: None,
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, hour, minute, 0).unwrap()
    }

    fn times(slots: &[AvailableSlot]) -> Vec<&str> {
        slots.iter().map(|s| s.time.as_str()).collect()
    }

    #[test]
    fn test_half_hour_shift_has_two_slots() {
        let shifts = vec![shift(DayOfWeek::Monday, "09:00", "09:30")];
        let slots = compute_available_slots(&shifts, &[], monday(), &[]).unwrap();

        assert_eq!(times(&slots), vec!["09:00", "09:15"]);
        assert_eq!(slots[0].start_time, at(6, 9, 0));
    }

    #[test]
    fn test_booked_slot_is_skipped() {
        let shifts = vec![shift(DayOfWeek::Monday, "09:00", "09:30")];
        let slots = compute_available_slots(&shifts, &[], monday(), &[at(6, 9, 0)]).unwrap();

        assert_eq!(times(&slots), vec!["09:15"]);
    }

    #[test]
    fn test_off_grid_booking_blocks_nearest_slot() {
        let shifts = vec![shift(DayOfWeek::Monday, "09:00", "10:00")];

        // 09:07 sits within 7.5 minutes of 09:00 only.
        let slots = compute_available_slots(&shifts, &[], monday(), &[at(6, 9, 7)]).unwrap();
        assert_eq!(times(&slots), vec!["09:15", "09:30", "09:45"]);

        // Halfway between two slots blocks both.
        let booked = [Utc.with_ymd_and_hms(2025, 1, 6, 9, 22, 30).unwrap()];
        let slots = compute_available_slots(&shifts, &[], monday(), &booked).unwrap();
        assert_eq!(times(&slots), vec!["09:00", "09:45"]);
    }

    #[test]
    fn test_no_shift_is_an_error() {
        let result = compute_available_slots(&[], &[], monday(), &[]);
        assert!(matches!(result, Err(DoctorError::NoShiftConfigured(DayOfWeek::Monday))));
    }

    #[test]
    fn test_overnight_shift_crosses_midnight() {
        let shifts = vec![shift(DayOfWeek::Monday, "22:00", "02:00")];
        let slots = compute_available_slots(&shifts, &[], monday(), &[]).unwrap();

        assert_eq!(slots.len(), 16);
        assert_eq!(slots.first().unwrap().start_time, at(6, 22, 0));
        assert_eq!(slots[8].time, "00:00");
        assert_eq!(slots[8].start_time, at(7, 0, 0));
        assert_eq!(slots.last().unwrap().start_time, at(7, 1, 45));
        assert!(slots.windows(2).all(|pair| pair[0].start_time < pair[1].start_time));
    }

    #[test]
    fn test_previous_night_tail_is_listed() {
        let tuesday = monday() + Duration::days(1);
        let shifts = vec![shift(DayOfWeek::Tuesday, "09:00", "09:30")];
        let previous = vec![shift(DayOfWeek::Monday, "23:10", "00:40")];

        let slots = compute_available_slots(&shifts, &previous, tuesday, &[at(7, 0, 10)]).unwrap();

        // 23:10 grid: 00:10 is booked, 00:25 is the last step before 00:40.
        assert_eq!(times(&slots), vec!["00:25", "09:00", "09:15"]);
        assert_eq!(slots[0].start_time, at(7, 0, 25));
        assert!(shift_covers(&previous[0], monday(), slots[0].start_time).unwrap());
    }

    #[test]
    fn test_same_day_shift_is_not_a_tail() {
        let tuesday = monday() + Duration::days(1);
        let shifts = vec![shift(DayOfWeek::Tuesday, "09:00", "09:15")];
        let previous = vec![shift(DayOfWeek::Monday, "20:00", "23:00")];

        let slots = compute_available_slots(&shifts, &previous, tuesday, &[]).unwrap();
        assert_eq!(times(&slots), vec!["09:00"]);
    }

    #[test]
    fn test_split_shifts_are_chronological() {
        let shifts = vec![
            shift(DayOfWeek::Monday, "17:00", "17:30"),
            shift(DayOfWeek::Monday, "09:00", "09:30"),
        ];
        let slots = compute_available_slots(&shifts, &[], monday(), &[]).unwrap();

        assert_eq!(times(&slots), vec!["09:00", "09:15", "17:00", "17:15"]);
    }

    #[test]
    fn test_overlapping_shifts_do_not_duplicate() {
        let shifts = vec![
            shift(DayOfWeek::Monday, "09:00", "10:00"),
            shift(DayOfWeek::Monday, "09:30", "10:30"),
        ];
        let slots = compute_available_slots(&shifts, &[], monday(), &[]).unwrap();

        assert_eq!(
            times(&slots),
            vec!["09:00", "09:15", "09:30", "09:45", "10:00", "10:15"]
        );
    }

    #[test]
    fn test_every_slot_lies_inside_its_shift() {
        let shifts = vec![shift(DayOfWeek::Monday, "08:10", "09:00")];
        let slots = compute_available_slots(&shifts, &[], monday(), &[]).unwrap();

        assert_eq!(times(&slots), vec!["08:10", "08:25", "08:40", "08:55"]);
        for slot in &slots {
            assert!(shift_covers(&shifts[0], monday(), slot.start_time).unwrap());
        }
    }

    #[test]
    fn test_shift_covers_is_end_exclusive() {
        let morning = shift(DayOfWeek::Monday, "09:00", "12:00");
        assert!(shift_covers(&morning, monday(), at(6, 9, 0)).unwrap());
        assert!(shift_covers(&morning, monday(), at(6, 11, 59)).unwrap());
        assert!(!shift_covers(&morning, monday(), at(6, 12, 0)).unwrap());
        assert!(!shift_covers(&morning, monday(), at(6, 8, 59)).unwrap());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2025-01-06").unwrap(), monday());
        assert!(matches!(parse_date("2025-02-30"), Err(DoctorError::InvalidDate(_))));
        assert!(parse_date("06/01/2025").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_conflict_window_is_inclusive() {
        let booked = [at(6, 9, 0)];
        let edge = at(6, 9, 0) + conflict_tolerance();

        assert!(conflicts_with(edge, &booked));
        assert!(!conflicts_with(edge + Duration::seconds(1), &booked));
        assert!(!conflicts_with(at(6, 9, 15), &booked));
    }
}
