// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use patient_cell::models::{DocumentInput, DocumentMeta, IdentityError, WalkInPatient};
use shared_models::LocalizedText;

// ==============================================================================
// TIME SLOTS
// ==============================================================================

/// The fixed daily slot catalog: 8 one-hour slots with a 12:00-14:00 lunch
/// gap. A slot plus a date identifies one bookable unit for one doctor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimeSlot {
    #[serde(rename = "09:00")]
    T0900,
    #[serde(rename = "10:00")]
    T1000,
    #[serde(rename = "11:00")]
    T1100,
    #[serde(rename = "12:00")]
    T1200,
    #[serde(rename = "14:00")]
    T1400,
    #[serde(rename = "15:00")]
    T1500,
    #[serde(rename = "16:00")]
    T1600,
    #[serde(rename = "17:00")]
    T1700,
}

impl TimeSlot {
    pub const DAILY_CATALOG: [TimeSlot; 8] = [
        TimeSlot::T0900,
        TimeSlot::T1000,
        TimeSlot::T1100,
        TimeSlot::T1200,
        TimeSlot::T1400,
        TimeSlot::T1500,
        TimeSlot::T1600,
        TimeSlot::T1700,
    ];

    pub fn start_time(&self) -> NaiveTime {
        let (hour, minute) = match self {
            TimeSlot::T0900 => (9, 0),
            TimeSlot::T1000 => (10, 0),
            TimeSlot::T1100 => (11, 0),
            TimeSlot::T1200 => (12, 0),
            TimeSlot::T1400 => (14, 0),
            TimeSlot::T1500 => (15, 0),
            TimeSlot::T1600 => (16, 0),
            TimeSlot::T1700 => (17, 0),
        };
        NaiveTime::from_hms_opt(hour, minute, 0).expect("catalog times are valid")
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start_time().format("%H:%M"))
    }
}

// ==============================================================================
// APPOINTMENT MODELS
// ==============================================================================

/// Appointment lifecycle. A closed set: transitions outside the table below
/// are rejected rather than stored as free-form strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    /// Transition table: Pending -> Confirmed | Cancelled,
    /// Confirmed -> Cancelled, Cancelled is terminal.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (AppointmentStatus::Pending, AppointmentStatus::Confirmed)
                | (AppointmentStatus::Pending, AppointmentStatus::Cancelled)
                | (AppointmentStatus::Confirmed, AppointmentStatus::Cancelled)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub amount: f64,
    pub status: PaymentStatus,
}

/// Snapshot of the patient at booking time, denormalized onto the
/// appointment so listings need no join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub identity_document_type: Option<String>,
    pub identity_document_number: Option<String>,
    pub file_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub file_number: Option<String>,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub payment: PaymentInfo,
    pub patient_info: Option<PatientSnapshot>,
    pub rating: Option<i32>,
    #[serde(default)]
    pub is_archived: bool,
    pub consultation_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// The moment the slot begins, used for past-date guards.
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.date.and_time(self.time_slot.start_time()).and_utc()
    }
}

// ==============================================================================
// CONSULTATION MODELS
// ==============================================================================

/// The written outcome of a completed visit. Its mandatory follow-up
/// appointment forms a singly-linked chain of visits:
/// appointment -> consultation -> next appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub diagnostic: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub documents: Vec<DocumentMeta>,
    pub next_appointment_id: Uuid,
    pub created_at: Option<DateTime<Utc>>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub reason: Option<String>,
    /// Reference to an existing patient account...
    pub patient_id: Option<Uuid>,
    /// ...or inline walk-in data; exactly one of the two is required.
    pub patient: Option<WalkInPatient>,
    pub payment: PaymentRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientSummary {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub file_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateAppointmentResponse {
    pub appointment: Appointment,
    pub patient: PatientSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub available_slots: Vec<TimeSlot>,
    pub total_slots: usize,
    pub reserved_count: usize,
    pub available_count: usize,
    pub message: LocalizedText,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateConsultationRequest {
    pub appointment_id: Uuid,
    pub diagnostic: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub documents: Vec<DocumentInput>,
    pub next_date: NaiveDate,
    pub next_time_slot: TimeSlot,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Consultation not found")]
    ConsultationNotFound,

    #[error("This time slot is no longer available")]
    SlotConflict,

    #[error("Past appointments cannot be modified")]
    PastAppointment,

    #[error("Cannot transition appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Payment amount {actual} does not match the doctor's rate {expected}")]
    PaymentMismatch { expected: f64, actual: f64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("Database error: {0}")]
    Database(String),
}
