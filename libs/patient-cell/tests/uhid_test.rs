use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use chrono::{Datelike, TimeZone, Utc};
use serde_json::{json, Value};
use wiremock::{MockServer, Mock, Request, Respond, ResponseTemplate};
use wiremock::matchers::{method, path};

use patient_cell::models::{CreatePatientRequest, PatientError};
use patient_cell::services::{PatientService, UhidService};
use shared_database::SupabaseClient;
use shared_utils::identifiers::year_code;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};
use shared_utils::{validate_uhid, IdentifierError};

/// Stands in for `next_uhid_sequence`: one counter per year code.
#[derive(Default)]
struct YearCounters(Mutex<HashMap<String, i64>>);

impl Respond for YearCounters {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let args: Value = serde_json::from_slice(&request.body).unwrap();
        let year = args["p_year_code"].as_str().unwrap().to_string();

        let mut counters = self.0.lock().unwrap();
        let sequence = counters.entry(year).or_insert(0);
        *sequence += 1;

        ResponseTemplate::new(200).set_body_json(json!(*sequence))
    }
}

async fn mount_counter(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/next_uhid_sequence"))
        .respond_with(YearCounters::default())
        .mount(mock_server)
        .await;
}

fn uhid_service(mock_server: &MockServer) -> UhidService {
    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();
    UhidService::new(Arc::new(SupabaseClient::new(&config)))
}

fn registration() -> CreatePatientRequest {
    CreatePatientRequest {
        first_name: "Asha".to_string(),
        last_name: "Verma".to_string(),
        phone_number: "+919800000000".to_string(),
        email: None,
        gender: Some("female".to_string()),
        date_of_birth: None,
        address: None,
    }
}

#[tokio::test]
async fn test_serial_generation_is_contiguous() {
    let mock_server = MockServer::start().await;
    mount_counter(&mock_server).await;

    let service = uhid_service(&mock_server);
    let now = Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap();

    let mut issued = Vec::new();
    for _ in 0..3 {
        issued.push(service.generate_uhid_at("Avenue Hospital", now, "token").await.unwrap());
    }

    assert_eq!(issued, vec!["TRAV25001", "TRAV25002", "TRAV25003"]);
    assert!(issued.iter().all(|uhid| validate_uhid(uhid)));
}

#[tokio::test]
async fn test_each_year_has_its_own_counter() {
    let mock_server = MockServer::start().await;
    mount_counter(&mock_server).await;

    let service = uhid_service(&mock_server);
    let last_year = Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 0).unwrap();
    let new_year = Utc.with_ymd_and_hms(2026, 1, 1, 1, 0, 0).unwrap();

    assert_eq!(service.generate_uhid_at("Avenue", last_year, "t").await.unwrap(), "TRAV25001");
    assert_eq!(service.generate_uhid_at("Avenue", new_year, "t").await.unwrap(), "TRAV26001");
    assert_eq!(service.generate_uhid_at("Avenue", last_year, "t").await.unwrap(), "TRAV25002");
}

#[tokio::test]
async fn test_sequence_past_999_widens() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/next_uhid_sequence"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(1000)))
        .mount(&mock_server)
        .await;

    let service = uhid_service(&mock_server);
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

    let uhid = service.generate_uhid_at("Avenue", now, "t").await.unwrap();
    assert_eq!(uhid, "TRAV251000");
    assert!(validate_uhid(&uhid));
}

#[tokio::test]
async fn test_bad_hospital_name_never_touches_counter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/next_uhid_sequence"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(1)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = uhid_service(&mock_server);
    let result = service.generate_uhid("A", "t").await;

    assert_matches!(
        result,
        Err(PatientError::Identifier(IdentifierError::InvalidHospitalName(_)))
    );
}

#[tokio::test]
async fn test_store_failure_surfaces_as_generation_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/next_uhid_sequence"))
        .respond_with(ResponseTemplate::new(503).set_body_string("connection refused"))
        .mount(&mock_server)
        .await;

    let service = uhid_service(&mock_server);
    let result = service.generate_uhid("Avenue", "t").await;

    assert_matches!(result, Err(PatientError::UhidGeneration(_)));
}

#[tokio::test]
async fn test_create_patient_stores_generated_uhid() {
    let mock_server = MockServer::start().await;
    mount_counter(&mock_server).await;

    let expected_uhid = format!("TRAV{}001", year_code(Utc::now().year()));
    let patient_id = uuid::Uuid::new_v4().to_string();

    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::patient_response(&patient_id, &expected_uhid)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();
    let service = PatientService::new(&config);

    let patient = service.create_patient(registration(), "token").await.unwrap();
    assert_eq!(patient.uhid, expected_uhid);

    let requests = mock_server.received_requests().await.unwrap();
    let insert = requests
        .iter()
        .find(|r| r.url.path() == "/rest/v1/patients")
        .unwrap();
    let body: Value = serde_json::from_slice(&insert.body).unwrap();
    assert_eq!(body["uhid"], expected_uhid);
    assert_eq!(body["first_name"], "Asha");
}

#[tokio::test]
async fn test_create_patient_aborts_without_uhid() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/next_uhid_sequence"))
        .respond_with(ResponseTemplate::new(500).set_body_string("deadlock detected"))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();
    let service = PatientService::new(&config);

    let result = service.create_patient(registration(), "token").await;
    assert_matches!(result, Err(PatientError::UhidGeneration(_)));
}

#[tokio::test]
async fn test_invalid_registration_does_not_allocate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/next_uhid_sequence"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(1)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(mock_server.uri()).to_app_config();
    let service = PatientService::new(&config);

    let mut request = registration();
    request.last_name = String::new();

    let result = service.create_patient(request, "token").await;
    assert_matches!(result, Err(PatientError::ValidationError(_)));
}
