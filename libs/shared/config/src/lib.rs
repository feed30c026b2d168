use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: String,
    pub mailer_base_url: String,
    pub mailer_api_key: String,
    pub mailer_from: String,
    pub payment_base_url: String,
    pub payment_api_key: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            mailer_base_url: env::var("MAILER_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("MAILER_BASE_URL not set, using empty value");
                    String::new()
                }),
            mailer_api_key: env::var("MAILER_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("MAILER_API_KEY not set, using empty value");
                    String::new()
                }),
            mailer_from: env::var("MAILER_FROM")
                .unwrap_or_else(|_| {
                    warn!("MAILER_FROM not set, using default");
                    "no-reply@clinic.local".to_string()
                }),
            payment_base_url: env::var("PAYMENT_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("PAYMENT_BASE_URL not set, using empty value");
                    String::new()
                }),
            payment_api_key: env::var("PAYMENT_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("PAYMENT_API_KEY not set, using empty value");
                    String::new()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    pub fn is_mailer_configured(&self) -> bool {
        !self.mailer_base_url.is_empty() && !self.mailer_api_key.is_empty()
    }

    pub fn is_payment_configured(&self) -> bool {
        !self.payment_base_url.is_empty() && !self.payment_api_key.is_empty()
    }
}
