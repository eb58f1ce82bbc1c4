use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};

use shared_models::error::AppError;
use shared_utils::IdentifierError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub uhid: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
}

impl CreatePatientRequest {
    pub fn validate(&self, today: NaiveDate) -> Result<(), PatientError> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(PatientError::ValidationError("First and last name are required".to_string()));
        }
        validate_phone(&self.phone_number)?;
        if let Some(dob) = self.date_of_birth {
            if dob > today {
                return Err(PatientError::InvalidDateOfBirth);
            }
        }
        Ok(())
    }
}

/// Demographic updates. The UHID is not part of this payload and cannot change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
}

impl UpdatePatientRequest {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone_number.is_none()
            && self.email.is_none()
            && self.gender.is_none()
            && self.date_of_birth.is_none()
            && self.address.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientSearchQuery {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub uhid: Option<String>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

fn validate_phone(phone: &str) -> Result<(), PatientError> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-'));

    if !allowed || !(7..=15).contains(&digits) {
        return Err(PatientError::ValidationError(format!("Invalid phone number: {}", phone)));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Invalid date of birth")]
    InvalidDateOfBirth,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error("UHID generation failed: {0}")]
    UhidGeneration(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppError::NotFound(err.to_string()),
            PatientError::InvalidDateOfBirth
            | PatientError::ValidationError(_)
            | PatientError::Identifier(_) => AppError::ValidationError(err.to_string()),
            PatientError::UhidGeneration(_) | PatientError::DatabaseError(_) => {
                AppError::Database(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreatePatientRequest {
        CreatePatientRequest {
            first_name: "Asha".to_string(),
            last_name: "Verma".to_string(),
            phone_number: "+91 98000-00000".to_string(),
            email: None,
            gender: Some("female".to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1),
            address: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_valid_request() {
        assert!(request().validate(today()).is_ok());
    }

    #[test]
    fn test_rejects_blank_names_and_bad_phone() {
        let mut blank = request();
        blank.first_name = "  ".to_string();
        assert!(matches!(blank.validate(today()), Err(PatientError::ValidationError(_))));

        let mut phone = request();
        phone.phone_number = "call me".to_string();
        assert!(matches!(phone.validate(today()), Err(PatientError::ValidationError(_))));

        phone.phone_number = "123".to_string();
        assert!(phone.validate(today()).is_err());
    }

    #[test]
    fn test_rejects_future_birth_date() {
        let mut future = request();
        future.date_of_birth = NaiveDate::from_ymd_opt(2030, 1, 1);
        assert!(matches!(future.validate(today()), Err(PatientError::InvalidDateOfBirth)));
    }

    #[test]
    fn test_error_mapping() {
        let not_found: AppError = PatientError::NotFound.into();
        assert!(matches!(not_found, AppError::NotFound(_)));

        let store: AppError = PatientError::UhidGeneration("timeout".into()).into();
        assert!(matches!(store, AppError::Database(_)));

        let bad_name: AppError = PatientError::from(IdentifierError::InvalidHospitalName("1".into())).into();
        assert!(matches!(bad_name, AppError::ValidationError(_)));
    }
}
