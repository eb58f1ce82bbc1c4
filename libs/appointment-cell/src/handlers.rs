use std::sync::Arc;
use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::identifiers::visit_type_of;
use shared_utils::{extract_uhid_from_visit_id, validate_visit_id};

use crate::models::{BookAppointmentRequest, DoctorScheduleQuery};
use crate::services::AppointmentBookingService;

fn require_booking_role(user: &User) -> Result<(), AppError> {
    if user.can_book_appointments() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not allowed to manage appointments".to_string()))
    }
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_booking_role(&user)?;

    let service = AppointmentBookingService::new(&config);
    let appointment = service.book_appointment(request, auth.token()).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&config);
    let appointment = service.get_appointment(appointment_id, auth.token()).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&config);
    let appointments = service.get_patient_appointments(patient_id, auth.token()).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DoctorScheduleQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&config);
    let appointments = service
        .get_doctor_appointments(doctor_id, query.date.as_deref(), auth.token())
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_booking_role(&user)?;

    let service = AppointmentBookingService::new(&config);
    let appointment = service.cancel_appointment(appointment_id, auth.token()).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_booking_role(&user)?;

    let service = AppointmentBookingService::new(&config);
    let appointment = service.complete_appointment(appointment_id, auth.token()).await?;

    Ok(Json(json!(appointment)))
}

/// Format check plus the hospital/year scope recovered from the ID. The
/// scope is rebuilt with a placeholder sequence and is not the patient's
/// exact UHID.
pub async fn check_visit_id(Path(visit_id): Path<String>) -> Json<Value> {
    Json(json!({
        "visit_id": visit_id,
        "valid": validate_visit_id(&visit_id),
        "visit_type": visit_type_of(&visit_id),
        "uhid_scope": extract_uhid_from_visit_id(&visit_id)
    }))
}
