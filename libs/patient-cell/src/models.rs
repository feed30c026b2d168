// libs/patient-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::Gender;

// ==============================================================================
// PATIENT RESOLUTION MODELS
// ==============================================================================

/// How a booking request identifies its patient: either a reference to an
/// existing account, or inline walk-in data to locate or provision one.
#[derive(Debug, Clone)]
pub enum PatientRef {
    Existing(Uuid),
    WalkIn(WalkInPatient),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkInPatient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub identity_document: IdentityDocumentInput,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
}

/// Raw identity-document fields as submitted. Exactly one kind is expected;
/// they are checked in priority order: national id, passport, other.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityDocumentInput {
    pub national_id: Option<String>,
    pub passport: Option<String>,
    pub other: Option<String>,
    pub number: Option<String>,
}

/// A validated, normalized identity document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityDocument {
    pub doc_type: String,
    pub number: String,
}

// ==============================================================================
// MEDICAL RECORD MODELS
// ==============================================================================

/// One record per patient; documents are appended, never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    #[serde(default)]
    pub documents: Vec<DocumentMeta>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub name: String,
    pub mime_type: String,
    pub path: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    pub name: String,
    pub mime_type: String,
    pub path: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("At least one identity document is required (national id, passport or other)")]
    MissingDocument,

    #[error("Invalid {0} format")]
    InvalidDocumentFormat(&'static str),

    #[error("Incomplete patient information: {0}")]
    IncompletePatient(&'static str),

    #[error("Patient not found")]
    PatientNotFound,

    #[error("File number generation kept colliding")]
    FileNumberExhausted,

    #[error("Database error: {0}")]
    Database(String),
}
