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

use crate::models::{AvailabilityQuery, CreateShiftRequest};
use crate::services::{ShiftService, SlotService};

#[axum::debug_handler]
pub async fn create_shift(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<CreateShiftRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = doctor_id.to_string();
    if !user.can_manage_shifts_of(&doctor_id) {
        return Err(AppError::Forbidden("Not allowed to manage this doctor's shifts".to_string()));
    }

    let service = ShiftService::new(&config);
    let shift = service.create_shift(&doctor_id, request, auth.token()).await?;

    Ok(Json(json!(shift)))
}

#[axum::debug_handler]
pub async fn list_shifts(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ShiftService::new(&config);
    let shifts = service.list_shifts(&doctor_id.to_string(), auth.token()).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "shifts": shifts,
        "total": shifts.len()
    })))
}

#[axum::debug_handler]
pub async fn delete_shift(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((doctor_id, shift_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = doctor_id.to_string();
    if !user.can_manage_shifts_of(&doctor_id) {
        return Err(AppError::Forbidden("Not allowed to manage this doctor's shifts".to_string()));
    }

    let service = ShiftService::new(&config);
    service.delete_shift(&doctor_id, &shift_id.to_string(), auth.token()).await?;

    Ok(Json(json!({
        "deleted": true,
        "shift_id": shift_id
    })))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let service = SlotService::new(&config);
    let slots = service
        .get_available_slots(&doctor_id.to_string(), &query.date, auth.token())
        .await?;

    let labels: Vec<&str> = slots.iter().map(|slot| slot.time.as_str()).collect();

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "available_slots": labels,
        "slots": slots,
        "total_slots": slots.len()
    })))
}
