// libs/scheduling-cell/src/services/consultation.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use notification_cell::events::{DomainEvent, EventPublisher};
use patient_cell::services::records::RecordsService;
use shared_config::AppConfig;
use shared_database::{StoreError, SupabaseClient};

use crate::models::{
    Appointment, AppointmentStatus, Consultation, CreateConsultationRequest, PaymentStatus,
    SchedulingError,
};
use crate::services::booking::SchedulingService;

pub struct ConsultationService {
    supabase: Arc<SupabaseClient>,
    scheduling: SchedulingService,
    records: RecordsService,
    events: EventPublisher,
}

impl ConsultationService {
    pub fn new(config: &AppConfig, events: EventPublisher) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            scheduling: SchedulingService::new(config, events.clone()),
            records: RecordsService::new(Arc::clone(&supabase)),
            supabase,
            events,
        }
    }

    /// Close a visit: write the consultation, file its documents into the
    /// patient's medical record, and book the mandatory follow-up slot. The
    /// follow-up goes through the same conflict path as a regular booking,
    /// so the whole operation fails before anything is written when the
    /// requested slot is taken.
    pub async fn create_consultation(
        &self,
        request: CreateConsultationRequest,
        auth_token: &str,
    ) -> Result<Consultation, SchedulingError> {
        let appointment = self
            .scheduling
            .fetch_appointment(request.appointment_id, auth_token)
            .await?;

        if self
            .scheduling
            .slot_taken(
                appointment.doctor_id,
                request.next_date,
                request.next_time_slot,
                None,
                auth_token,
            )
            .await?
        {
            return Err(SchedulingError::SlotConflict);
        }

        let follow_up = self
            .insert_follow_up(&appointment, &request, auth_token)
            .await?;

        if !request.documents.is_empty() {
            self.records
                .add_documents(appointment.patient_id, request.documents.clone(), auth_token)
                .await?;
        }

        let row = json!({
            "appointment_id": appointment.id,
            "doctor_id": appointment.doctor_id,
            "patient_id": appointment.patient_id,
            "diagnostic": request.diagnostic,
            "symptoms": request.symptoms,
            "medications": request.medications,
            "documents": [],
            "next_appointment_id": follow_up.id,
            "created_at": Utc::now().to_rfc3339(),
        });
        let created = self
            .supabase
            .insert_returning("consultations", row, auth_token)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;
        let consultation: Consultation = serde_json::from_value(created)
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        // Back-link so the visit chain can be walked from either end.
        self.supabase
            .update_returning(
                "appointments",
                &format!("id=eq.{}", appointment.id),
                json!({ "consultation_id": consultation.id }),
                auth_token,
            )
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        info!(
            "Consultation {} recorded for appointment {}, follow-up {}",
            consultation.id, appointment.id, follow_up.id
        );
        Ok(consultation)
    }

    pub async fn get_consultation(
        &self,
        consultation_id: Uuid,
        auth_token: &str,
    ) -> Result<Consultation, SchedulingError> {
        let path = format!("/rest/v1/consultations?id=eq.{}", consultation_id);
        let result: Vec<Consultation> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or(SchedulingError::ConsultationNotFound)
    }

    /// The follow-up inherits the patient snapshot from the closed visit and
    /// is created already confirmed with no payment due.
    async fn insert_follow_up(
        &self,
        appointment: &Appointment,
        request: &CreateConsultationRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let row = json!({
            "doctor_id": appointment.doctor_id,
            "patient_id": appointment.patient_id,
            "file_number": appointment.file_number,
            "date": request.next_date,
            "time_slot": request.next_time_slot,
            "reason": "Suivi de consultation",
            "status": AppointmentStatus::Confirmed,
            "payment": { "amount": 0.0, "status": PaymentStatus::Completed },
            "patient_info": appointment.patient_info,
            "is_archived": false,
            "created_at": Utc::now().to_rfc3339(),
        });

        let created = match self
            .supabase
            .insert_returning("appointments", row, auth_token)
            .await
        {
            Ok(value) => value,
            Err(StoreError::Conflict(msg)) => {
                warn!("Follow-up slot lost to concurrent booking: {}", msg);
                return Err(SchedulingError::SlotConflict);
            }
            Err(e) => return Err(SchedulingError::Database(e.to_string())),
        };

        let follow_up: Appointment = serde_json::from_value(created)
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let patient_name = appointment
            .patient_info
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default();
        self.events.publish(DomainEvent::AppointmentCreated {
            appointment_id: follow_up.id,
            doctor_id: follow_up.doctor_id,
            patient_id: follow_up.patient_id,
            doctor_name: self.doctor_name(follow_up.doctor_id, auth_token).await,
            patient_name,
            date: follow_up.date,
            time_slot: follow_up.time_slot.to_string(),
        });

        Ok(follow_up)
    }

    /// Best effort; a missing name degrades the notification text, not the
    /// consultation itself.
    async fn doctor_name(&self, doctor_id: Uuid, auth_token: &str) -> String {
        let path = format!("/rest/v1/accounts?id=eq.{}", doctor_id);
        let result: Result<Vec<shared_models::Account>, _> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await;

        match result {
            Ok(accounts) => accounts
                .into_iter()
                .next()
                .map(|a| a.full_name())
                .unwrap_or_default(),
            Err(e) => {
                warn!("Could not load doctor {} for notification: {}", doctor_id, e);
                String::new()
            }
        }
    }
}
