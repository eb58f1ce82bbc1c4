use std::sync::Arc;

use chrono::{NaiveTime, Timelike, Utc};
use reqwest::{header::{HeaderMap, HeaderValue}, Method};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{parse_shift_time, CreateShiftRequest, DayOfWeek, DoctorError, Shift};

const DEFAULT_SHIFT_NAME: &str = "Consultation";
const MINUTES_PER_DAY: u32 = 24 * 60;

pub struct ShiftService {
    supabase: Arc<SupabaseClient>,
}

impl ShiftService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn create_shift(
        &self,
        doctor_id: &str,
        request: CreateShiftRequest,
        auth_token: &str,
    ) -> Result<Shift, DoctorError> {
        let start = parse_shift_time(&request.start_time)?;
        let end = parse_shift_time(&request.end_time)?;

        if start == end {
            return Err(DoctorError::ValidationError(
                "Shift start and end times must differ".to_string(),
            ));
        }
        debug!(
            "Creating {} shift {}-{} for doctor {}",
            request.day_of_week, request.start_time, request.end_time, doctor_id
        );

        let existing = self.get_shifts_for_day(doctor_id, request.day_of_week, auth_token).await?;
        check_shift_overlap(start, end, &existing)?;

        let shift_name = request
            .shift_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_SHIFT_NAME);

        let shift_data = json!({
            "doctor_id": doctor_id,
            "day_of_week": request.day_of_week,
            "start_time": start.format("%H:%M").to_string(),
            "end_time": end.format("%H:%M").to_string(),
            "shift_name": shift_name,
            "created_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.supabase
            .insert("doctor_shifts", auth_token, shift_data)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let shift = parse_shifts(result)?
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::DatabaseError("Failed to create shift".to_string()))?;

        info!("Shift {} created for doctor {}", shift.id, doctor_id);
        Ok(shift)
    }

    /// All of a doctor's shifts, ordered Monday first then by start time.
    pub async fn list_shifts(&self, doctor_id: &str, auth_token: &str) -> Result<Vec<Shift>, DoctorError> {
        let path = format!("/rest/v1/doctor_shifts?doctor_id=eq.{}&order=start_time.asc", doctor_id);
        let mut shifts = self.fetch(&path, auth_token).await?;

        shifts.sort_by(|a, b| {
            a.day_of_week
                .cmp(&b.day_of_week)
                .then_with(|| a.start_time.cmp(&b.start_time))
        });

        Ok(shifts)
    }

    pub async fn get_shifts_for_day(
        &self,
        doctor_id: &str,
        day: DayOfWeek,
        auth_token: &str,
    ) -> Result<Vec<Shift>, DoctorError> {
        let path = format!(
            "/rest/v1/doctor_shifts?doctor_id=eq.{}&day_of_week=eq.{}&order=start_time.asc",
            doctor_id, day
        );

        self.fetch(&path, auth_token).await
    }

    pub async fn delete_shift(&self, doctor_id: &str, shift_id: &str, auth_token: &str) -> Result<(), DoctorError> {
        debug!("Deleting shift {} of doctor {}", shift_id, doctor_id);

        let path = format!("/rest/v1/doctor_shifts?id=eq.{}&doctor_id=eq.{}", shift_id, doctor_id);
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let deleted: Vec<Value> = self.supabase
            .request_with_headers(Method::DELETE, &path, Some(auth_token), None, Some(headers))
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if deleted.is_empty() {
            warn!("Shift {} not found for doctor {}", shift_id, doctor_id);
            return Err(DoctorError::ShiftNotFound);
        }

        Ok(())
    }

    async fn fetch(&self, path: &str, auth_token: &str) -> Result<Vec<Shift>, DoctorError> {
        let result: Vec<Value> = self.supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        parse_shifts(result)
    }
}

fn parse_shifts(rows: Vec<Value>) -> Result<Vec<Shift>, DoctorError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Shift>, _>>()
        .map_err(|e| DoctorError::DatabaseError(format!("Malformed shift row: {}", e)))
}

fn minute_span(start: NaiveTime, end: NaiveTime) -> (u32, u32) {
    let start_min = start.hour() * 60 + start.minute();
    let mut end_min = end.hour() * 60 + end.minute();

    if end_min < start_min {
        end_min += MINUTES_PER_DAY;
    }

    (start_min, end_min)
}

/// Rejects a new shift whose span intersects another shift on the same day.
/// Touching endpoints are allowed.
pub fn check_shift_overlap(start: NaiveTime, end: NaiveTime, existing: &[Shift]) -> Result<(), DoctorError> {
    let (new_start, new_end) = minute_span(start, end);

    for shift in existing {
        let (other_start, other_end) = minute_span(shift.start()?, shift.end()?);

        if new_start < other_end && other_start < new_end {
            return Err(DoctorError::OverlappingShift(shift.shift_name.clone()));
        }
    }

    Ok(())
}
