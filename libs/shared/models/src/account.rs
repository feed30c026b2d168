use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// ACCOUNT ENTITY
// ==============================================================================

/// A user account. Patients, doctors and admins share the same table; the
/// role-specific columns are nullable and validated at the service layer
/// (a doctor needs specialty/bio/hourly_rate, a patient that has booked at
/// least once always carries a file number).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub role: AccountRole,

    // Patient-specific fields
    pub file_number: Option<String>,
    pub identity_document_type: Option<String>,
    pub identity_document_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,

    // Doctor-specific fields
    pub specialty: Option<String>,
    pub bio: Option<String>,
    pub hourly_rate: Option<f64>,

    // Relationship lists
    #[serde(default)]
    pub appointments: Vec<Uuid>,
    #[serde(default)]
    pub medical_records: Vec<Uuid>,
    /// Counterpart accounts met through appointments.
    #[serde(default)]
    pub users: Vec<Uuid>,

    // Lifecycle flags
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_archived: bool,
    pub activated_at: Option<DateTime<Utc>>,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,

    // Subscription sub-state
    #[serde(default)]
    pub subscription_status: SubscriptionStatus,
    pub subscription_type: Option<SubscriptionType>,
    pub subscription_start_date: Option<DateTime<Utc>>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub next_payment_date: Option<DateTime<Utc>>,
    pub payment_customer_id: Option<String>,
    pub payment_subscription_id: Option<String>,
    #[serde(default)]
    pub trial_status: TrialStatus,
    pub trial_start_date: Option<DateTime<Utc>>,
    pub trial_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trial_used: bool,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Patient,
    Doctor,
    Admin,
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRole::Patient => write!(f, "patient"),
            AccountRole::Doctor => write!(f, "doctor"),
            AccountRole::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    M,
    F,
    #[serde(rename = "other")]
    Other,
}

// ==============================================================================
// SUBSCRIPTION SUB-STATE
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Inactive,
    Trial,
    Active,
    Expired,
    Grace,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionStatus::Inactive => write!(f, "inactive"),
            SubscriptionStatus::Trial => write!(f, "trial"),
            SubscriptionStatus::Active => write!(f, "active"),
            SubscriptionStatus::Expired => write!(f, "expired"),
            SubscriptionStatus::Grace => write!(f, "grace"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionType {
    Annual,
    Monthly,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    #[default]
    Inactive,
    Active,
    Expired,
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialStatus::Inactive => write!(f, "inactive"),
            TrialStatus::Active => write!(f, "active"),
            TrialStatus::Expired => write!(f, "expired"),
        }
    }
}
