// libs/subscription-cell/src/handlers.rs
use std::sync::Arc;

use axum::{extract::State, Json};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{RenewRequest, StartTrialRequest, SubscribeRequest, SubscriptionError};
use crate::services::billing::BillingService;
use crate::services::lifecycle::LifecycleService;

pub fn map_subscription_error(e: SubscriptionError) -> AppError {
    match e {
        SubscriptionError::AccountNotFound => AppError::NotFound(e.to_string()),
        SubscriptionError::TrialAlreadyUsed
        | SubscriptionError::AlreadyActive
        | SubscriptionError::NotRenewable => AppError::State(e.to_string()),
        SubscriptionError::Payment(msg) => AppError::ExternalService(msg),
        SubscriptionError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn start_trial(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<StartTrialRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BillingService::new(&state);
    let account = service
        .start_trial(request.user_id, auth.token())
        .await
        .map_err(map_subscription_error)?;

    Ok(Json(json!({
        "message": "Trial activated",
        "trial_status": account.trial_status,
        "trial_end_date": account.trial_end_date,
    })))
}

#[axum::debug_handler]
pub async fn subscribe(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BillingService::new(&state);
    let account = service
        .subscribe(
            request.user_id,
            request.subscription_type,
            request.amount,
            auth.token(),
        )
        .await
        .map_err(map_subscription_error)?;

    Ok(Json(json!({
        "message": "Subscription active",
        "subscription_status": account.subscription_status,
        "subscription_end_date": account.subscription_end_date,
    })))
}

#[axum::debug_handler]
pub async fn renew(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<RenewRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BillingService::new(&state);
    let account = service
        .renew(request.user_id, request.amount, auth.token())
        .await
        .map_err(map_subscription_error)?;

    Ok(Json(json!({
        "message": "Subscription renewed",
        "subscription_status": account.subscription_status,
        "subscription_end_date": account.subscription_end_date,
    })))
}

/// Invoked by an external scheduler; walks every account whose trial or
/// subscription window can move and reports the tally.
#[axum::debug_handler]
pub async fn run_sweep(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = LifecycleService::new(&state);
    let report = service
        .run_sweep(auth.token())
        .await
        .map_err(map_subscription_error)?;

    Ok(Json(json!({ "report": report })))
}
