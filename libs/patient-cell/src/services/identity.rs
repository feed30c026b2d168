// libs/patient-cell/src/services/identity.rs
use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use regex::Regex;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{StoreError, SupabaseClient};
use shared_models::Account;

use crate::models::{IdentityDocument, IdentityDocumentInput, IdentityError, PatientRef, WalkInPatient};

static NATIONAL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[A-Z0-9]{4,12}$").expect("valid national id pattern"));
static PASSPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[A-Z0-9]{6,12}$").expect("valid passport pattern"));

const FILE_NUMBER_ATTEMPTS: u32 = 3;

pub struct PatientIdentityService {
    supabase: Arc<SupabaseClient>,
}

impl PatientIdentityService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Locate or provision the patient account behind a booking request.
    ///
    /// Every account returned from here carries a file number: walk-in
    /// creation generates one, and legacy matches without one are backfilled.
    pub async fn resolve(
        &self,
        patient: PatientRef,
        auth_token: &str,
    ) -> Result<Account, IdentityError> {
        match patient {
            PatientRef::Existing(id) => self.get_account(id, auth_token).await,
            PatientRef::WalkIn(data) => self.resolve_walk_in(data, auth_token).await,
        }
    }

    async fn resolve_walk_in(
        &self,
        patient: WalkInPatient,
        auth_token: &str,
    ) -> Result<Account, IdentityError> {
        validate_walk_in_fields(&patient)?;
        let document = validate_identity_document(&patient.identity_document)?;

        if let Some(existing) = self
            .find_by_document_or_email(&document, &patient.email, auth_token)
            .await?
        {
            if existing.file_number.is_some() {
                debug!("Matched existing patient account {}", existing.id);
                return Ok(existing);
            }
            // Legacy record without a file number: backfill it.
            return self.backfill_file_number(existing, &patient, &document, auth_token).await;
        }

        self.create_patient(&patient, &document, auth_token).await
    }

    pub async fn get_account(&self, id: Uuid, auth_token: &str) -> Result<Account, IdentityError> {
        let path = format!("/rest/v1/accounts?id=eq.{}", id);
        let result: Vec<Account> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| IdentityError::Database(e.to_string()))?;

        result.into_iter().next().ok_or(IdentityError::PatientNotFound)
    }

    async fn find_by_document_or_email(
        &self,
        document: &IdentityDocument,
        email: &str,
        auth_token: &str,
    ) -> Result<Option<Account>, IdentityError> {
        let path = format!(
            "/rest/v1/accounts?or=(and(identity_document_type.eq.{},identity_document_number.eq.{}),email.eq.{})",
            document.doc_type, document.number, email
        );

        let result: Vec<Account> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| IdentityError::Database(e.to_string()))?;

        Ok(result.into_iter().next())
    }

    async fn create_patient(
        &self,
        patient: &WalkInPatient,
        document: &IdentityDocument,
        auth_token: &str,
    ) -> Result<Account, IdentityError> {
        // The random suffix makes collisions rare but not impossible; a
        // duplicate-key rejection from the store triggers a fresh draw.
        for attempt in 1..=FILE_NUMBER_ATTEMPTS {
            let file_number = generate_file_number(
                &document.doc_type,
                &patient.first_name,
                &patient.last_name,
                Utc::now(),
            );

            let row = json!({
                "first_name": patient.first_name,
                "last_name": patient.last_name,
                "email": patient.email,
                "phone": patient.phone,
                "identity_document_type": document.doc_type,
                "identity_document_number": document.number,
                "file_number": file_number,
                "role": "patient",
                "address": patient.address,
                "date_of_birth": patient.date_of_birth,
                "gender": patient.gender,
                "created_at": Utc::now().to_rfc3339(),
            });

            match self.supabase.insert_returning("accounts", row, auth_token).await {
                Ok(created) => {
                    let account: Account = serde_json::from_value(created)
                        .map_err(|e| IdentityError::Database(e.to_string()))?;
                    info!(
                        "Provisioned patient account {} with file number {}",
                        account.id, file_number
                    );
                    return Ok(account);
                }
                Err(StoreError::Conflict(msg)) => {
                    warn!(
                        "File number collision on attempt {}/{}: {}",
                        attempt, FILE_NUMBER_ATTEMPTS, msg
                    );
                }
                Err(e) => return Err(IdentityError::Database(e.to_string())),
            }
        }

        Err(IdentityError::FileNumberExhausted)
    }

    async fn backfill_file_number(
        &self,
        account: Account,
        patient: &WalkInPatient,
        document: &IdentityDocument,
        auth_token: &str,
    ) -> Result<Account, IdentityError> {
        let file_number = generate_file_number(
            &document.doc_type,
            &patient.first_name,
            &patient.last_name,
            Utc::now(),
        );

        debug!("Backfilling file number for legacy account {}", account.id);

        let updated = self
            .supabase
            .update_returning(
                "accounts",
                &format!("id=eq.{}", account.id),
                json!({ "file_number": file_number }),
                auth_token,
            )
            .await
            .map_err(|e| IdentityError::Database(e.to_string()))?;

        let row: Value = updated
            .into_iter()
            .next()
            .ok_or(IdentityError::PatientNotFound)?;
        serde_json::from_value(row).map_err(|e| IdentityError::Database(e.to_string()))
    }
}

fn validate_walk_in_fields(patient: &WalkInPatient) -> Result<(), IdentityError> {
    if patient.first_name.trim().is_empty() || patient.last_name.trim().is_empty() {
        return Err(IdentityError::IncompletePatient("name is required"));
    }
    if patient.email.trim().is_empty() {
        return Err(IdentityError::IncompletePatient("email is required"));
    }
    if patient.phone.trim().is_empty() {
        return Err(IdentityError::IncompletePatient("phone is required"));
    }
    Ok(())
}

/// Normalize the submitted document fields, checking kinds in priority order.
pub fn validate_identity_document(
    input: &IdentityDocumentInput,
) -> Result<IdentityDocument, IdentityError> {
    if let Some(national_id) = &input.national_id {
        if !NATIONAL_ID_RE.is_match(national_id) {
            return Err(IdentityError::InvalidDocumentFormat("national id"));
        }
        return Ok(IdentityDocument {
            doc_type: "national_id".to_string(),
            number: national_id.to_uppercase(),
        });
    }

    if let Some(passport) = &input.passport {
        if !PASSPORT_RE.is_match(passport) {
            return Err(IdentityError::InvalidDocumentFormat("passport"));
        }
        return Ok(IdentityDocument {
            doc_type: "passport".to_string(),
            number: passport.to_uppercase(),
        });
    }

    if let (Some(other), Some(number)) = (&input.other, &input.number) {
        if other.trim().is_empty() || number.trim().is_empty() {
            return Err(IdentityError::MissingDocument);
        }
        return Ok(IdentityDocument {
            doc_type: other.to_lowercase(),
            number: number.to_uppercase(),
        });
    }

    Err(IdentityError::MissingDocument)
}

/// Build a human-readable patient identifier: document-type prefix, name
/// initials, two-digit year and month, and a random 4-digit suffix.
pub fn generate_file_number(
    doc_type: &str,
    first_name: &str,
    last_name: &str,
    now: DateTime<Utc>,
) -> String {
    let prefix: String = doc_type.chars().take(2).collect::<String>().to_uppercase();
    let first: String = first_name.chars().take(2).collect::<String>().to_uppercase();
    let last: String = last_name.chars().take(2).collect::<String>().to_uppercase();
    let suffix: u32 = rand::thread_rng().gen_range(1000..10000);

    format!(
        "{}{}{}{:02}{:02}{}",
        prefix,
        first,
        last,
        now.year() % 100,
        now.month(),
        suffix
    )
}
