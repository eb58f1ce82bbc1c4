use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, SecondsFormat, Utc};
use reqwest::{header::{HeaderMap, HeaderValue}, Method};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use doctor_cell::services::ShiftService;
use doctor_cell::services::slots::parse_date;
use doctor_cell::shift_covers;
use doctor_cell::DayOfWeek;
use shared_config::AppConfig;
use shared_database::{is_unique_violation, SupabaseClient};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest, PatientUhid,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::visit_id::VisitIdService;

/// Visit ID derivation and insert are retried together when another
/// booking claims the same Visit ID first.
pub const VISIT_ID_MAX_ATTEMPTS: u32 = 3;

pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    shift_service: ShiftService,
    conflict_service: ConflictDetectionService,
    visit_id_service: VisitIdService,
    lifecycle_service: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            shift_service: ShiftService::with_client(Arc::clone(&supabase)),
            conflict_service: ConflictDetectionService::new(Arc::clone(&supabase)),
            visit_id_service: VisitIdService::new(Arc::clone(&supabase)),
            lifecycle_service: AppointmentLifecycleService::new(),
            supabase,
        }
    }

    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.book_appointment_at(request, Utc::now(), auth_token).await
    }

    /// Books against an explicit clock.
    pub async fn book_appointment_at(
        &self,
        request: BookAppointmentRequest,
        now: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking {} appointment for patient {} with doctor {} at {}",
            request.visit_type, request.patient_id, request.doctor_id, request.scheduled_at
        );

        // Step 1: time must be in the future
        if request.scheduled_at <= now {
            return Err(AppointmentError::InvalidTime(
                "Appointments cannot be booked in the past".to_string(),
            ));
        }

        // Step 2: patient must exist and carry a UHID
        let uhid = self.resolve_uhid(request.patient_id, auth_token).await?;

        // Step 3: the doctor must be on shift
        self.ensure_within_shift(request.doctor_id, request.scheduled_at, auth_token).await?;

        // Step 4: no booking within the conflict window
        self.conflict_service
            .check_conflicts(request.doctor_id, request.scheduled_at, auth_token)
            .await?;

        // Steps 5 and 6: Visit ID plus insert, retried on a Visit ID collision
        for attempt in 1..=VISIT_ID_MAX_ATTEMPTS {
            let visit_id = self.visit_id_service
                .generate_visit_id(&uhid, request.visit_type, auth_token)
                .await?;

            match self.insert_appointment(&request, &uhid, &visit_id, auth_token).await {
                Ok(appointment) => {
                    info!("Appointment {} booked as {}", appointment.id, appointment.visit_id);
                    return Ok(appointment);
                }
                Err(e) if is_unique_violation(&e) => {
                    warn!("Visit ID {} already taken (attempt {}/{})", visit_id, attempt, VISIT_ID_MAX_ATTEMPTS);
                }
                Err(e) => {
                    error!("Failed to store appointment {}: {}", visit_id, e);
                    return Err(AppointmentError::DatabaseError(e.to_string()));
                }
            }
        }

        Err(AppointmentError::VisitIdConflict(VISIT_ID_MAX_ATTEMPTS))
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        self.fetch(&path, auth_token)
            .await?
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn get_patient_appointments(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=scheduled_at.desc",
            patient_id
        );
        self.fetch(&path, auth_token).await
    }

    /// A doctor's appointments, optionally narrowed to one UTC day.
    pub async fn get_doctor_appointments(
        &self,
        doctor_id: Uuid,
        date: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=scheduled_at.asc",
            doctor_id
        );

        if let Some(raw) = date {
            let day_start = parse_date(raw)?.and_hms_opt(0, 0, 0)
                .ok_or_else(|| AppointmentError::ValidationError(format!("Invalid date: {}", raw)))?
                .and_utc();
            let day_end = day_start + Duration::days(1);

            path.push_str(&format!(
                "&scheduled_at=gte.{}&scheduled_at=lt.{}",
                day_start.to_rfc3339_opts(SecondsFormat::Secs, true),
                day_end.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }

        self.fetch(&path, auth_token).await
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::Cancelled, auth_token).await
    }

    pub async fn complete_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::Completed, auth_token).await
    }

    async fn transition(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle_service.validate_status_transition(current.status, new_status)?;

        // Filtering on the current status keeps two concurrent transitions
        // from both succeeding.
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}",
            appointment_id, current.status
        );
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let body = json!({
            "status": new_status,
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.supabase
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(body), Some(headers))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let updated = parse_appointments(result)?
            .into_iter()
            .next()
            .ok_or(AppointmentError::InvalidStatusTransition {
                from: current.status,
                to: new_status,
            })?;

        info!("Appointment {} is now {}", appointment_id, updated.status);
        Ok(updated)
    }

    async fn resolve_uhid(&self, patient_id: Uuid, auth_token: &str) -> Result<String, AppointmentError> {
        let path = format!("/rest/v1/patients?select=uhid&id=eq.{}", patient_id);

        let result: Vec<Value> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(AppointmentError::PatientNotFound)?;
        let patient: PatientUhid = serde_json::from_value(row)
            .map_err(|e| AppointmentError::DatabaseError(format!("Malformed patient row: {}", e)))?;

        Ok(patient.uhid)
    }

    /// Accepts a time inside one of the day's shifts or inside the
    /// after-midnight tail of the previous day's overnight shift.
    async fn ensure_within_shift(
        &self,
        doctor_id: Uuid,
        scheduled_at: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let doctor_id = doctor_id.to_string();
        let date = scheduled_at.date_naive();

        for day in [date, date - Duration::days(1)] {
            let shifts = self.shift_service
                .get_shifts_for_day(&doctor_id, DayOfWeek::from(day.weekday()), auth_token)
                .await?;

            for shift in &shifts {
                if shift_covers(shift, day, scheduled_at)? {
                    debug!("{} falls inside shift '{}'", scheduled_at, shift.shift_name);
                    return Ok(());
                }
            }
        }

        Err(AppointmentError::OutsideShift(scheduled_at))
    }

    async fn insert_appointment(
        &self,
        request: &BookAppointmentRequest,
        uhid: &str,
        visit_id: &str,
        auth_token: &str,
    ) -> anyhow::Result<Appointment> {
        let now = Utc::now().to_rfc3339();
        let appointment_data = json!({
            "patient_id": request.patient_id,
            "uhid": uhid,
            "doctor_id": request.doctor_id,
            "visit_id": visit_id,
            "visit_type": request.visit_type,
            "scheduled_at": request.scheduled_at.to_rfc3339(),
            "status": AppointmentStatus::Scheduled,
            "reason": request.reason,
            "created_at": now,
            "updated_at": now
        });

        let result: Vec<Appointment> = self.supabase
            .insert("appointments", auth_token, appointment_data)
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Insert returned no appointment"))
    }

    async fn fetch(&self, path: &str, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let result: Vec<Value> = self.supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        parse_appointments(result)
    }
}

fn parse_appointments(rows: Vec<Value>) -> Result<Vec<Appointment>, AppointmentError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Appointment>, _>>()
        .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))
}
