use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveTime, Utc, Weekday};

use shared_models::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "MONDAY",
            DayOfWeek::Tuesday => "TUESDAY",
            DayOfWeek::Wednesday => "WEDNESDAY",
            DayOfWeek::Thursday => "THURSDAY",
            DayOfWeek::Friday => "FRIDAY",
            DayOfWeek::Saturday => "SATURDAY",
            DayOfWeek::Sunday => "SUNDAY",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recurring weekly working window. Times are "HH:MM" UTC wall-clock;
/// an end earlier than the start runs past midnight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day_of_week: DayOfWeek,
    pub start_time: String,
    pub end_time: String,
    pub shift_name: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Shift {
    pub fn start(&self) -> Result<NaiveTime, DoctorError> {
        parse_shift_time(&self.start_time)
    }

    pub fn end(&self) -> Result<NaiveTime, DoctorError> {
        parse_shift_time(&self.end_time)
    }

    pub fn is_overnight(&self) -> Result<bool, DoctorError> {
        Ok(self.end()? < self.start()?)
    }
}

/// Accepts "HH:MM" and the "HH:MM:SS" form Postgres `time` columns return.
pub fn parse_shift_time(raw: &str) -> Result<NaiveTime, DoctorError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| DoctorError::InvalidShiftTime(raw.to_string()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShiftRequest {
    pub day_of_week: DayOfWeek,
    pub start_time: String,
    pub end_time: String,
    pub shift_name: Option<String>,
}

/// A bookable start time. `time` is the "HH:MM" label; `start_time` keeps
/// the date, which matters for the after-midnight part of overnight shifts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub time: String,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedTime {
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid shift time '{0}', expected HH:MM")]
    InvalidShiftTime(String),

    #[error("Doctor has no shift configured on {0}")]
    NoShiftConfigured(DayOfWeek),

    #[error("Shift not found")]
    ShiftNotFound,

    #[error("Shift overlaps existing shift '{0}'")]
    OverlappingShift(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::InvalidDate(_)
            | DoctorError::InvalidShiftTime(_)
            | DoctorError::ValidationError(_) => AppError::ValidationError(err.to_string()),
            DoctorError::NoShiftConfigured(_) | DoctorError::ShiftNotFound => {
                AppError::NotFound(err.to_string())
            }
            DoctorError::OverlappingShift(_) => AppError::Conflict(err.to_string()),
            DoctorError::DatabaseError(_) => AppError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_of_week_wire_format() {
        assert_eq!(serde_json::to_string(&DayOfWeek::Monday).unwrap(), "\"MONDAY\"");
        assert_eq!(DayOfWeek::from(Weekday::Sun).as_str(), "SUNDAY");
    }

    #[test]
    fn test_parse_shift_time() {
        assert_eq!(parse_shift_time("09:30").unwrap(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(parse_shift_time("22:00:00").unwrap(), NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert!(matches!(parse_shift_time("25:00"), Err(DoctorError::InvalidShiftTime(_))));
        assert!(parse_shift_time("9am").is_err());
    }

    #[test]
    fn test_no_shift_maps_to_not_found() {
        let err: AppError = DoctorError::NoShiftConfigured(DayOfWeek::Friday).into();
        match err {
            AppError::NotFound(msg) => assert!(msg.contains("FRIDAY")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
