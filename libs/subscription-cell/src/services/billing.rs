// libs/subscription-cell/src/services/billing.rs
use chrono::{Duration, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::{Account, SubscriptionStatus, SubscriptionType, TrialStatus};

use crate::models::{SubscriptionError, TRIAL_DAYS};
use crate::services::mailer::{
    self, MailerClient,
};

/// Opaque payment-provider client. The core only needs a confirmed charge
/// and the provider's customer/subscription identifiers back.
pub struct PaymentClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct ChargeOutcome {
    pub customer_id: String,
    pub subscription_id: String,
}

impl PaymentClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.payment_base_url.clone(),
            api_key: config.payment_api_key.clone(),
        }
    }

    pub async fn charge(
        &self,
        user_id: Uuid,
        amount: f64,
        subscription_type: SubscriptionType,
    ) -> Result<ChargeOutcome, SubscriptionError> {
        let response = self
            .client
            .post(format!("{}/charges", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "reference": user_id,
                "amount": amount,
                "plan": subscription_type,
            }))
            .send()
            .await
            .map_err(|e| SubscriptionError::Payment(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(SubscriptionError::Payment(format!("{}: {}", status, message)));
        }

        response
            .json()
            .await
            .map_err(|e| SubscriptionError::Payment(e.to_string()))
    }
}

pub struct BillingService {
    supabase: Arc<SupabaseClient>,
    payment: PaymentClient,
    mailer: MailerClient,
}

impl BillingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            payment: PaymentClient::new(config),
            mailer: MailerClient::new(config),
        }
    }

    /// Activate the one-time 15-day free trial.
    pub async fn start_trial(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Account, SubscriptionError> {
        let account = self.fetch_account(user_id, auth_token).await?;

        if account.trial_used {
            return Err(SubscriptionError::TrialAlreadyUsed);
        }
        if matches!(
            account.subscription_status,
            SubscriptionStatus::Active | SubscriptionStatus::Trial
        ) {
            return Err(SubscriptionError::AlreadyActive);
        }

        let now = Utc::now();
        let trial_end = now + Duration::days(TRIAL_DAYS);
        let updated = self
            .patch_account(
                user_id,
                json!({
                    "trial_status": TrialStatus::Active,
                    "trial_used": true,
                    "trial_start_date": now.to_rfc3339(),
                    "trial_end_date": trial_end.to_rfc3339(),
                    "subscription_status": SubscriptionStatus::Trial,
                }),
                auth_token,
            )
            .await?;

        info!("Trial started for account {} until {}", user_id, trial_end);

        let (subject, body) =
            mailer::trial_started_email(updated.first_name.as_deref().unwrap_or_default());
        self.mailer.send(&updated.email, &subject, &body).await;

        Ok(updated)
    }

    /// Charge the provider and open a paid subscription window.
    pub async fn subscribe(
        &self,
        user_id: Uuid,
        subscription_type: SubscriptionType,
        amount: f64,
        auth_token: &str,
    ) -> Result<Account, SubscriptionError> {
        let account = self.fetch_account(user_id, auth_token).await?;

        if account.subscription_status == SubscriptionStatus::Active {
            return Err(SubscriptionError::AlreadyActive);
        }

        let charge = self.payment.charge(user_id, amount, subscription_type).await?;
        let updated = self
            .open_subscription_window(user_id, subscription_type, &charge, auth_token)
            .await?;

        info!(
            "Account {} subscribed ({:?}) until {:?}",
            user_id, subscription_type, updated.subscription_end_date
        );

        let (subject, body) =
            mailer::subscription_confirmed_email(updated.first_name.as_deref().unwrap_or_default());
        self.mailer.send(&updated.email, &subject, &body).await;

        Ok(updated)
    }

    /// Re-open a window after expiry. Only expired or grace-period
    /// subscriptions qualify; everything else is a state error.
    pub async fn renew(
        &self,
        user_id: Uuid,
        amount: f64,
        auth_token: &str,
    ) -> Result<Account, SubscriptionError> {
        let account = self.fetch_account(user_id, auth_token).await?;

        if !matches!(
            account.subscription_status,
            SubscriptionStatus::Expired | SubscriptionStatus::Grace
        ) {
            return Err(SubscriptionError::NotRenewable);
        }

        let subscription_type = account.subscription_type.unwrap_or(SubscriptionType::Annual);
        let charge = self.payment.charge(user_id, amount, subscription_type).await?;
        let updated = self
            .open_subscription_window(user_id, subscription_type, &charge, auth_token)
            .await?;

        info!(
            "Account {} renewed until {:?}",
            user_id, updated.subscription_end_date
        );

        let (subject, body) =
            mailer::subscription_confirmed_email(updated.first_name.as_deref().unwrap_or_default());
        self.mailer.send(&updated.email, &subject, &body).await;

        Ok(updated)
    }

    async fn open_subscription_window(
        &self,
        user_id: Uuid,
        subscription_type: SubscriptionType,
        charge: &ChargeOutcome,
        auth_token: &str,
    ) -> Result<Account, SubscriptionError> {
        let now = Utc::now();
        let end = match subscription_type {
            SubscriptionType::Annual => now + Duration::days(365),
            SubscriptionType::Monthly => now + Duration::days(30),
        };

        self.patch_account(
            user_id,
            json!({
                "subscription_status": SubscriptionStatus::Active,
                "subscription_type": subscription_type,
                "subscription_start_date": now.to_rfc3339(),
                "subscription_end_date": end.to_rfc3339(),
                "last_payment_date": now.to_rfc3339(),
                "next_payment_date": end.to_rfc3339(),
                "payment_customer_id": charge.customer_id,
                "payment_subscription_id": charge.subscription_id,
            }),
            auth_token,
        )
        .await
    }

    async fn fetch_account(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Account, SubscriptionError> {
        let path = format!("/rest/v1/accounts?id=eq.{}", user_id);
        let result: Vec<Account> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SubscriptionError::Database(e.to_string()))?;

        result.into_iter().next().ok_or(SubscriptionError::AccountNotFound)
    }

    async fn patch_account(
        &self,
        user_id: Uuid,
        patch: serde_json::Value,
        auth_token: &str,
    ) -> Result<Account, SubscriptionError> {
        let updated = self
            .supabase
            .update_returning("accounts", &format!("id=eq.{}", user_id), patch, auth_token)
            .await
            .map_err(|e| SubscriptionError::Database(e.to_string()))?;

        let row = updated.into_iter().next().ok_or_else(|| {
            warn!("Account {} vanished during update", user_id);
            SubscriptionError::AccountNotFound
        })?;
        serde_json::from_value(row).map_err(|e| SubscriptionError::Database(e.to_string()))
    }
}
