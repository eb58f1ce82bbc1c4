use std::sync::Arc;
use axum::{middleware, routing::{delete, get}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/{doctor_id}/shifts", get(handlers::list_shifts).post(handlers::create_shift))
        .route("/{doctor_id}/shifts/{shift_id}", delete(handlers::delete_shift))
        .route("/{doctor_id}/available-slots", get(handlers::get_available_slots))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
