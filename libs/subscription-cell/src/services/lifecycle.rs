// libs/subscription-cell/src/services/lifecycle.rs
use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info};

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::{Account, SubscriptionStatus, TrialStatus};

use crate::models::{SubscriptionError, SweepReport, GRACE_DAYS};
use crate::services::mailer::{self, MailerClient};

/// Email sends owed by one account's transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepEmail {
    TrialExpired,
    SubscriptionExpired,
}

/// The state changes one sweep pass owes a single account. `None` fields
/// leave the column untouched, which is what makes re-runs no-ops.
#[derive(Debug, Default, PartialEq)]
pub struct SweepPlan {
    pub trial_status: Option<TrialStatus>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub emails: Vec<SweepEmail>,
}

impl SweepPlan {
    pub fn is_empty(&self) -> bool {
        self.trial_status.is_none() && self.subscription_status.is_none()
    }
}

/// Decide what one account owes at `now`. Pure so it can be tested without
/// a store. Trial state is resolved first, then the subscription status is
/// derived from it and from the paid window:
/// - trial active past its end date -> trial expired, email;
/// - trial window still open -> subscription shows `trial`; window just
///   closed while the status still shows `trial` -> paid period, `active`;
/// - paid window over by more than the grace allowance -> `expired`, email;
/// - paid window over but within the allowance -> `grace`.
pub fn plan_transitions(account: &Account, now: DateTime<Utc>) -> SweepPlan {
    let mut plan = SweepPlan::default();

    let mut trial_status = account.trial_status;
    if trial_status == TrialStatus::Active {
        match account.trial_end_date {
            Some(end) if now > end => {
                trial_status = TrialStatus::Expired;
                plan.trial_status = Some(trial_status);
                plan.emails.push(SweepEmail::TrialExpired);
            }
            _ => {}
        }
    }

    if trial_status == TrialStatus::Active {
        if account.subscription_status != SubscriptionStatus::Trial {
            plan.subscription_status = Some(SubscriptionStatus::Trial);
        }
        return plan;
    }
    if trial_status == TrialStatus::Expired
        && account.subscription_status == SubscriptionStatus::Trial
    {
        plan.subscription_status = Some(SubscriptionStatus::Active);
        return plan;
    }

    if let Some(end) = account.subscription_end_date {
        if now > end + Duration::days(GRACE_DAYS) {
            if account.subscription_status != SubscriptionStatus::Expired {
                plan.subscription_status = Some(SubscriptionStatus::Expired);
                plan.emails.push(SweepEmail::SubscriptionExpired);
            }
        } else if now > end && account.subscription_status != SubscriptionStatus::Grace {
            plan.subscription_status = Some(SubscriptionStatus::Grace);
        }
    }

    plan
}

pub struct LifecycleService {
    supabase: Arc<SupabaseClient>,
    mailer: MailerClient,
}

impl LifecycleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            mailer: MailerClient::new(config),
        }
    }

    /// One pass over every account whose trial or subscription can move.
    /// Account failures are logged and counted; the pass never aborts.
    pub async fn run_sweep(&self, auth_token: &str) -> Result<SweepReport, SubscriptionError> {
        let now = Utc::now();
        let path = "/rest/v1/accounts?or=(subscription_status.in.(active,grace,trial),trial_status.eq.active)";
        let accounts: Vec<Account> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| SubscriptionError::Database(e.to_string()))?;

        let mut report = SweepReport {
            scanned: accounts.len(),
            ..SweepReport::default()
        };

        for account in accounts {
            let plan = plan_transitions(&account, now);
            if plan.is_empty() {
                continue;
            }

            match self.apply(&account, &plan, auth_token).await {
                Ok(()) => {
                    report.updated += 1;
                    if plan.trial_status == Some(TrialStatus::Expired) {
                        report.trials_expired += 1;
                    }
                    match plan.subscription_status {
                        Some(SubscriptionStatus::Expired) => report.subscriptions_expired += 1,
                        Some(SubscriptionStatus::Grace) => report.entered_grace += 1,
                        _ => {}
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Sweep skipped account {}: {}", account.id, e);
                }
            }
        }

        info!(
            "Sweep done: {} scanned, {} updated, {} failed",
            report.scanned, report.updated, report.failed
        );
        Ok(report)
    }

    async fn apply(
        &self,
        account: &Account,
        plan: &SweepPlan,
        auth_token: &str,
    ) -> Result<(), SubscriptionError> {
        let mut patch = json!({});
        if let Some(trial) = plan.trial_status {
            patch["trial_status"] = json!(trial);
        }
        if let Some(status) = plan.subscription_status {
            patch["subscription_status"] = json!(status);
        }

        debug!("Sweep patching account {}: {}", account.id, patch);
        self.supabase
            .update_returning("accounts", &format!("id=eq.{}", account.id), patch, auth_token)
            .await
            .map_err(|e| SubscriptionError::Database(e.to_string()))?;

        // Persisted first; a lost email never rolls back the transition.
        let first_name = account.first_name.as_deref().unwrap_or_default();
        for email in &plan.emails {
            let (subject, body) = match email {
                SweepEmail::TrialExpired => mailer::trial_expired_email(first_name),
                SweepEmail::SubscriptionExpired => mailer::subscription_expired_email(first_name),
            };
            self.mailer.send(&account.email, &subject, &body).await;
        }

        Ok(())
    }
}
