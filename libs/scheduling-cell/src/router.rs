// libs/scheduling-cell/src/router.rs
use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::handlers::{self, SchedulingState};

pub fn scheduling_routes(state: SchedulingState) -> Router {
    Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/availability", get(handlers::check_availability))
        .route("/user/{user_id}", get(handlers::get_user_appointments))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/{appointment_id}/archive", patch(handlers::archive_appointment))
        .route("/{appointment_id}/unarchive", patch(handlers::unarchive_appointment))
        .route("/consultations", post(handlers::create_consultation))
        .route("/consultations/{consultation_id}", get(handlers::get_consultation))
        .with_state(state)
}
