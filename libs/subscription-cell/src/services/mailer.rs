// libs/subscription-cell/src/services/mailer.rs
use serde_json::json;
use tracing::{debug, warn};

use shared_config::AppConfig;

/// Transactional mail client. Every send is best effort: callers log a
/// failed send and move on, subscription state never depends on it.
pub struct MailerClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    from: String,
    enabled: bool,
}

impl MailerClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.mailer_base_url.clone(),
            api_key: config.mailer_api_key.clone(),
            from: config.mailer_from.clone(),
            enabled: config.is_mailer_configured(),
        }
    }

    pub async fn send(&self, recipient: &str, subject: &str, body: &str) {
        if !self.enabled {
            debug!("Mailer not configured, skipping email to {}", recipient);
            return;
        }

        let result = self
            .client
            .post(format!("{}/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": recipient,
                "subject": subject,
                "body": body,
            }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Email '{}' sent to {}", subject, recipient);
            }
            Ok(response) => {
                warn!(
                    "Mailer returned {} for email to {}",
                    response.status(),
                    recipient
                );
            }
            Err(e) => {
                warn!("Could not reach mailer for {}: {}", recipient, e);
            }
        }
    }
}

pub fn trial_started_email(first_name: &str) -> (String, String) {
    (
        "Votre essai gratuit a commencé".to_string(),
        format!(
            "Bonjour {},\n\nVotre période d'essai gratuite de 15 jours est maintenant active. \
             Profitez de toutes les fonctionnalités de la plateforme.\n\nL'équipe",
            first_name
        ),
    )
}

pub fn trial_expired_email(first_name: &str) -> (String, String) {
    (
        "Votre essai gratuit est terminé".to_string(),
        format!(
            "Bonjour {},\n\nVotre période d'essai gratuite est arrivée à son terme. \
             Abonnez-vous pour continuer à utiliser la plateforme.\n\nL'équipe",
            first_name
        ),
    )
}

pub fn subscription_confirmed_email(first_name: &str) -> (String, String) {
    (
        "Votre abonnement est confirmé".to_string(),
        format!(
            "Bonjour {},\n\nVotre paiement a bien été reçu et votre abonnement est actif. \
             Merci de votre confiance.\n\nL'équipe",
            first_name
        ),
    )
}

pub fn subscription_expired_email(first_name: &str) -> (String, String) {
    (
        "Votre abonnement a expiré".to_string(),
        format!(
            "Bonjour {},\n\nVotre abonnement est arrivé à expiration. \
             Renouvelez-le pour conserver l'accès à votre espace.\n\nL'équipe",
            first_name
        ),
    )
}
