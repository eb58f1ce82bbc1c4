use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use shared_models::error::AppError;
use shared_models::VisitType;
use shared_utils::IdentifierError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub uhid: String,
    pub doctor_id: Uuid,
    pub visit_id: String,
    pub visit_type: VisitType,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub visit_type: VisitType,
    pub scheduled_at: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorScheduleQuery {
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PatientUhid {
    pub uhid: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Doctor has no shift covering {0}")]
    OutsideShift(DateTime<Utc>),

    #[error("Appointment conflicts with existing booking")]
    ConflictDetected,

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Could not reserve a unique Visit ID after {0} attempts")]
    VisitIdConflict(u32),

    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound | AppointmentError::PatientNotFound => {
                AppError::NotFound(err.to_string())
            }
            AppointmentError::InvalidTime(_)
            | AppointmentError::OutsideShift(_)
            | AppointmentError::Identifier(_)
            | AppointmentError::ValidationError(_) => AppError::ValidationError(err.to_string()),
            AppointmentError::ConflictDetected
            | AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::VisitIdConflict(_) => AppError::Conflict(err.to_string()),
            AppointmentError::Doctor(inner) => inner.into(),
            AppointmentError::DatabaseError(_) => AppError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_string(&AppointmentStatus::Cancelled).unwrap(), "\"cancelled\"");
        let parsed: AppointmentStatus = serde_json::from_str("\"scheduled\"").unwrap();
        assert_eq!(parsed, AppointmentStatus::Scheduled);
    }

    #[test]
    fn test_error_mapping() {
        let conflict: AppError = AppointmentError::ConflictDetected.into();
        assert!(matches!(conflict, AppError::Conflict(_)));

        let empty: AppError = AppointmentError::Identifier(IdentifierError::EmptyUhid).into();
        assert!(matches!(empty, AppError::ValidationError(_)));

        let no_shift: AppError = AppointmentError::Doctor(DoctorError::ShiftNotFound).into();
        assert!(matches!(no_shift, AppError::NotFound(_)));
    }
}
