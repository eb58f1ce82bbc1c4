use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub user_metadata: Option<serde_json::Value>,
    pub iat: Option<u64>,
}

/// Hospital staff roles carried in the `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Admin,
    Doctor,
    Receptionist,
    Nurse,
    Patient,
}

impl StaffRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(StaffRole::Admin),
            "doctor" => Some(StaffRole::Doctor),
            "receptionist" => Some(StaffRole::Receptionist),
            "nurse" => Some(StaffRole::Nurse),
            "patient" => Some(StaffRole::Patient),
            _ => None,
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaffRole::Admin => write!(f, "admin"),
            StaffRole::Doctor => write!(f, "doctor"),
            StaffRole::Receptionist => write!(f, "receptionist"),
            StaffRole::Nurse => write!(f, "nurse"),
            StaffRole::Patient => write!(f, "patient"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<StaffRole>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn has_role(&self, role: StaffRole) -> bool {
        self.role == Some(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(StaffRole::Admin)
    }

    /// Front-desk registration of new patients.
    pub fn can_register_patients(&self) -> bool {
        matches!(self.role, Some(StaffRole::Admin | StaffRole::Receptionist))
    }

    pub fn can_book_appointments(&self) -> bool {
        matches!(
            self.role,
            Some(StaffRole::Admin | StaffRole::Receptionist | StaffRole::Doctor)
        )
    }

    /// Admins manage every roster; a doctor only their own.
    pub fn can_manage_shifts_of(&self, doctor_id: &str) -> bool {
        self.is_admin() || (self.has_role(StaffRole::Doctor) && self.id == doctor_id)
    }
}
