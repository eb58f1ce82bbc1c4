use std::sync::Arc;
use axum::{middleware, routing::{get, post}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn patient_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_patient))
        .route("/search", get(handlers::search_patients))
        .route("/uhid/{uhid}", get(handlers::get_patient_by_uhid))
        .route("/uhid/{uhid}/validate", get(handlers::check_uhid))
        .route("/{patient_id}", get(handlers::get_patient).put(handlers::update_patient))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
