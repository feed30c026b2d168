// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use notification_cell::events::EventPublisher;
use patient_cell::handlers::map_identity_error;
use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    CreateAppointmentRequest, CreateConsultationRequest, RescheduleRequest, SchedulingError,
    UpdateStatusRequest,
};
use crate::services::availability::AvailabilityService;
use crate::services::booking::SchedulingService;
use crate::services::consultation::ConsultationService;

/// Router state: configuration plus the outbound event channel. Handlers
/// build their services per request, the channel is shared.
#[derive(Clone)]
pub struct SchedulingState {
    pub config: Arc<AppConfig>,
    pub events: EventPublisher,
}

pub fn map_scheduling_error(e: SchedulingError) -> AppError {
    match e {
        SchedulingError::AppointmentNotFound
        | SchedulingError::DoctorNotFound
        | SchedulingError::ConsultationNotFound => AppError::NotFound(e.to_string()),
        SchedulingError::SlotConflict => AppError::Conflict(e.to_string()),
        SchedulingError::PastAppointment | SchedulingError::InvalidTransition { .. } => {
            AppError::State(e.to_string())
        }
        SchedulingError::PaymentMismatch { .. } | SchedulingError::Validation(_) => {
            AppError::Validation(e.to_string())
        }
        SchedulingError::Identity(inner) => map_identity_error(inner),
        SchedulingError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<SchedulingState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state.config, state.events.clone());
    let response = service
        .create_appointment(request, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "message": "Appointment booked",
        "appointment": response.appointment,
        "patient": response.patient,
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<SchedulingState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state.config, state.events.clone());
    let appointment = service
        .update_status(appointment_id, request.status, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<SchedulingState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state.config, state.events.clone());
    let appointment = service
        .reschedule(appointment_id, request, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

#[axum::debug_handler]
pub async fn check_availability(
    State(state): State<SchedulingState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state.config);
    let availability = service
        .check_availability(params.doctor_id, params.date, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "availability": availability })))
}

#[axum::debug_handler]
pub async fn get_user_appointments(
    State(state): State<SchedulingState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state.config, state.events.clone());
    let appointments = service
        .get_for_user(user_id, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "count": appointments.len(),
        "appointments": appointments,
    })))
}

#[axum::debug_handler]
pub async fn archive_appointment(
    State(state): State<SchedulingState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    set_archived(state, auth, appointment_id, true).await
}

#[axum::debug_handler]
pub async fn unarchive_appointment(
    State(state): State<SchedulingState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    set_archived(state, auth, appointment_id, false).await
}

async fn set_archived(
    state: SchedulingState,
    auth: Authorization<Bearer>,
    appointment_id: Uuid,
    archived: bool,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state.config, state.events.clone());
    let appointment = service
        .set_archived(appointment_id, archived, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn create_consultation(
    State(state): State<SchedulingState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateConsultationRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ConsultationService::new(&state.config, state.events.clone());
    let consultation = service
        .create_consultation(request, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "message": "Consultation recorded",
        "consultation": consultation,
    })))
}

#[axum::debug_handler]
pub async fn get_consultation(
    State(state): State<SchedulingState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(consultation_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ConsultationService::new(&state.config, state.events.clone());
    let consultation = service
        .get_consultation(consultation_id, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({ "consultation": consultation })))
}
