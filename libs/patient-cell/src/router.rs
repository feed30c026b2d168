// libs/patient-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn patient_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/resolve", post(handlers::resolve_patient))
        .route("/{patient_id}/record", get(handlers::get_medical_record))
        .route("/{patient_id}/record/documents", post(handlers::add_medical_documents))
        .with_state(state)
}
