// libs/patient-cell/src/services/records.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::SupabaseClient;
use shared_models::Account;

use crate::models::{DocumentInput, DocumentMeta, IdentityError, MedicalRecord};

pub struct RecordsService {
    supabase: Arc<SupabaseClient>,
}

impl RecordsService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Append documents to the patient's medical record, creating the record
    /// on first use. The record id is back-linked on the account.
    pub async fn add_documents(
        &self,
        patient_id: Uuid,
        documents: Vec<DocumentInput>,
        auth_token: &str,
    ) -> Result<MedicalRecord, IdentityError> {
        let now = Utc::now();
        let stamped: Vec<DocumentMeta> = documents
            .into_iter()
            .map(|d| DocumentMeta {
                name: d.name,
                mime_type: d.mime_type,
                path: d.path,
                added_at: now,
            })
            .collect();

        let record: MedicalRecord = match self.get_record(patient_id, auth_token).await? {
            Some(mut record) => {
                record.documents.extend(stamped);
                let updated = self
                    .supabase
                    .update_returning(
                        "medical_records",
                        &format!("id=eq.{}", record.id),
                        json!({
                            "documents": record.documents,
                            "last_updated": now.to_rfc3339(),
                        }),
                        auth_token,
                    )
                    .await
                    .map_err(|e| IdentityError::Database(e.to_string()))?;

                let row: Value = updated
                    .into_iter()
                    .next()
                    .ok_or(IdentityError::PatientNotFound)?;
                serde_json::from_value(row).map_err(|e| IdentityError::Database(e.to_string()))?
            }
            None => {
                debug!("Creating first medical record for patient {}", patient_id);
                let created = self
                    .supabase
                    .insert_returning(
                        "medical_records",
                        json!({
                            "patient_id": patient_id,
                            "documents": stamped,
                            "created_at": now.to_rfc3339(),
                            "last_updated": now.to_rfc3339(),
                        }),
                        auth_token,
                    )
                    .await
                    .map_err(|e| IdentityError::Database(e.to_string()))?;
                serde_json::from_value(created)
                    .map_err(|e| IdentityError::Database(e.to_string()))?
            }
        };

        self.link_record_to_account(patient_id, record.id, auth_token).await?;

        info!(
            "Medical record {} for patient {} now holds {} documents",
            record.id,
            patient_id,
            record.documents.len()
        );
        Ok(record)
    }

    pub async fn get_record(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<MedicalRecord>, IdentityError> {
        let path = format!("/rest/v1/medical_records?patient_id=eq.{}", patient_id);
        let result: Vec<MedicalRecord> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| IdentityError::Database(e.to_string()))?;

        Ok(result.into_iter().next())
    }

    async fn link_record_to_account(
        &self,
        patient_id: Uuid,
        record_id: Uuid,
        auth_token: &str,
    ) -> Result<(), IdentityError> {
        let path = format!("/rest/v1/accounts?id=eq.{}", patient_id);
        let result: Vec<Account> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| IdentityError::Database(e.to_string()))?;

        let mut account = result.into_iter().next().ok_or(IdentityError::PatientNotFound)?;

        if account.medical_records.contains(&record_id) {
            return Ok(());
        }
        account.medical_records.push(record_id);

        self.supabase
            .update_returning(
                "accounts",
                &format!("id=eq.{}", patient_id),
                json!({ "medical_records": account.medical_records }),
                auth_token,
            )
            .await
            .map_err(|e| IdentityError::Database(e.to_string()))?;

        Ok(())
    }
}
