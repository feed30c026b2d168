// libs/subscription-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::SubscriptionType;

/// One-time free trial length.
pub const TRIAL_DAYS: i64 = 15;
/// Days past the subscription end date during which access is kept.
pub const GRACE_DAYS: i64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct StartTrialRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    pub user_id: Uuid,
    pub subscription_type: SubscriptionType,
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenewRequest {
    pub user_id: Uuid,
    pub amount: f64,
}

/// Tally of one sweep pass, returned to the invoking scheduler.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub updated: usize,
    pub trials_expired: usize,
    pub subscriptions_expired: usize,
    pub entered_grace: usize,
    pub failed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Account not found")]
    AccountNotFound,

    #[error("Free trial already used")]
    TrialAlreadyUsed,

    #[error("An active subscription or trial is already in place")]
    AlreadyActive,

    #[error("Only expired or grace-period subscriptions can be renewed")]
    NotRenewable,

    #[error("Payment was not confirmed: {0}")]
    Payment(String),

    #[error("Database error: {0}")]
    Database(String),
}
