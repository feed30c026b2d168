// libs/patient-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::error::AppError;

use crate::models::{DocumentInput, IdentityError, PatientRef, WalkInPatient};
use crate::services::identity::PatientIdentityService;
use crate::services::records::RecordsService;

#[derive(Debug, Deserialize)]
pub struct ResolvePatientRequest {
    pub patient_id: Option<Uuid>,
    pub patient: Option<WalkInPatient>,
}

pub fn map_identity_error(e: IdentityError) -> AppError {
    match e {
        IdentityError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
        IdentityError::Database(msg) => AppError::Database(msg),
        IdentityError::FileNumberExhausted => {
            AppError::Conflict("Could not allocate a unique file number".to_string())
        }
        other => AppError::Validation(other.to_string()),
    }
}

#[axum::debug_handler]
pub async fn resolve_patient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<ResolvePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let patient_ref = match (request.patient_id, request.patient) {
        (Some(id), _) => PatientRef::Existing(id),
        (None, Some(data)) => PatientRef::WalkIn(data),
        (None, None) => {
            return Err(AppError::Validation(
                "Either patient_id or inline patient data is required".to_string(),
            ))
        }
    };

    let service = PatientIdentityService::new(Arc::new(SupabaseClient::new(&state)));
    let account = service
        .resolve(patient_ref, token)
        .await
        .map_err(map_identity_error)?;

    Ok(Json(json!({
        "id": account.id,
        "first_name": account.first_name,
        "last_name": account.last_name,
        "email": account.email,
        "file_number": account.file_number,
    })))
}

#[axum::debug_handler]
pub async fn get_medical_record(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let service = RecordsService::new(Arc::new(SupabaseClient::new(&state)));
    let record = service
        .get_record(patient_id, token)
        .await
        .map_err(map_identity_error)?
        .ok_or_else(|| AppError::NotFound("Medical record not found".to_string()))?;

    Ok(Json(json!({ "record": record })))
}

#[axum::debug_handler]
pub async fn add_medical_documents(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
    Json(documents): Json<Vec<DocumentInput>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if documents.is_empty() {
        return Err(AppError::Validation("At least one document is required".to_string()));
    }

    let service = RecordsService::new(Arc::new(SupabaseClient::new(&state)));
    let record = service
        .add_documents(patient_id, documents, token)
        .await
        .map_err(map_identity_error)?;

    Ok(Json(json!({
        "message": "Documents added to medical record",
        "record": record,
    })))
}
