use std::sync::Arc;

use chrono::Utc;
use reqwest::{header::{HeaderMap, HeaderValue}, Method};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::validate_uhid;

use crate::models::{Patient, CreatePatientRequest, UpdatePatientRequest, PatientSearchQuery, PatientError};
use crate::services::uhid::UhidService;

const DEFAULT_SEARCH_LIMIT: i32 = 50;
const MAX_SEARCH_LIMIT: i32 = 200;

pub struct PatientService {
    supabase: Arc<SupabaseClient>,
    uhid_service: UhidService,
    hospital_name: String,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            uhid_service: UhidService::new(Arc::clone(&supabase)),
            supabase,
            hospital_name: config.hospital_name.clone(),
        }
    }

    /// Registers a patient. The UHID is allocated first; if that fails no
    /// patient row is written.
    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        request.validate(Utc::now().date_naive())?;

        let uhid = self.uhid_service.generate_uhid(&self.hospital_name, auth_token).await?;
        debug!("Registering patient {} {} as {}", request.first_name, request.last_name, uhid);

        let now = Utc::now().to_rfc3339();
        let patient_data = json!({
            "uhid": uhid,
            "first_name": request.first_name.trim(),
            "last_name": request.last_name.trim(),
            "phone_number": request.phone_number,
            "email": request.email,
            "gender": request.gender,
            "date_of_birth": request.date_of_birth,
            "address": request.address,
            "created_at": now,
            "updated_at": now
        });

        let result: Vec<Value> = self.supabase
            .insert("patients", auth_token, patient_data)
            .await
            .map_err(|e| {
                error!("Failed to store patient {}: {}", uhid, e);
                PatientError::DatabaseError(e.to_string())
            })?;

        let patient = first_patient(result)?
            .ok_or_else(|| PatientError::DatabaseError("Failed to create patient".to_string()))?;

        info!("Patient {} ({}) registered with UHID {}", patient.id, patient.full_name(), patient.uhid);
        Ok(patient)
    }

    pub async fn get_patient(&self, patient_id: &str, auth_token: &str) -> Result<Patient, PatientError> {
        debug!("Fetching patient: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result = self.fetch(&path, auth_token).await?;

        first_patient(result)?.ok_or(PatientError::NotFound)
    }

    pub async fn get_patient_by_uhid(&self, uhid: &str, auth_token: &str) -> Result<Patient, PatientError> {
        if !validate_uhid(uhid) {
            return Err(PatientError::ValidationError(format!("Malformed UHID: {}", uhid)));
        }
        debug!("Fetching patient by UHID: {}", uhid);

        let path = format!("/rest/v1/patients?uhid=eq.{}", uhid);
        let result = self.fetch(&path, auth_token).await?;

        first_patient(result)?.ok_or(PatientError::NotFound)
    }

    pub async fn update_patient(
        &self,
        patient_id: &str,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        if request.is_empty() {
            return Err(PatientError::ValidationError("Nothing to update".to_string()));
        }
        debug!("Updating patient: {}", patient_id);

        let mut update_data = serde_json::Map::new();

        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(phone_number) = request.phone_number {
            update_data.insert("phone_number".to_string(), json!(phone_number));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(gender) = request.gender {
            update_data.insert("gender".to_string(), json!(gender));
        }
        if let Some(date_of_birth) = request.date_of_birth {
            update_data.insert("date_of_birth".to_string(), json!(date_of_birth));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        first_patient(result)?.ok_or(PatientError::NotFound)
    }

    pub async fn search_patients(
        &self,
        query: PatientSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Patient>, PatientError> {
        debug!("Searching patients with query: {:?}", query);

        let mut query_parts = vec![];

        if let Some(name) = query.name.as_deref().filter(|n| !n.trim().is_empty()) {
            let pattern = urlencoding::encode(name.trim());
            query_parts.push(format!("or=(first_name.ilike.*{0}*,last_name.ilike.*{0}*)", pattern));
        }
        if let Some(phone) = query.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            query_parts.push(format!("phone_number=ilike.*{}*", urlencoding::encode(phone.trim())));
        }
        if let Some(uhid) = query.uhid.as_deref().filter(|u| !u.trim().is_empty()) {
            query_parts.push(format!("uhid=eq.{}", urlencoding::encode(uhid.trim())));
        }

        let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);
        let offset = query.offset.unwrap_or(0).max(0);
        query_parts.push("order=created_at.desc".to_string());
        query_parts.push(format!("limit={}", limit));
        query_parts.push(format!("offset={}", offset));

        let path = format!("/rest/v1/patients?{}", query_parts.join("&"));
        let result = self.fetch(&path, auth_token).await?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Patient>, _>>()
            .map_err(|e| PatientError::DatabaseError(e.to_string()))
    }

    async fn fetch(&self, path: &str, auth_token: &str) -> Result<Vec<Value>, PatientError> {
        self.supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))
    }
}

fn first_patient(rows: Vec<Value>) -> Result<Option<Patient>, PatientError> {
    match rows.into_iter().next() {
        Some(row) => serde_json::from_value(row)
            .map(Some)
            .map_err(|e| PatientError::DatabaseError(format!("Malformed patient row: {}", e))),
        None => Ok(None),
    }
}
