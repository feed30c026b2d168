// libs/scheduling-cell/src/services/booking.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::events::{DomainEvent, EventPublisher};
use patient_cell::models::PatientRef;
use patient_cell::services::identity::PatientIdentityService;
use shared_config::AppConfig;
use shared_database::{StoreError, SupabaseClient};
use shared_models::{Account, AccountRole};

use crate::models::{
    Appointment, AppointmentStatus, CreateAppointmentRequest, CreateAppointmentResponse,
    PatientSnapshot, PatientSummary, PaymentStatus, RescheduleRequest, SchedulingError, TimeSlot,
};

pub struct SchedulingService {
    supabase: Arc<SupabaseClient>,
    identity: PatientIdentityService,
    events: EventPublisher,
}

impl SchedulingService {
    pub fn new(config: &AppConfig, events: EventPublisher) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let identity = PatientIdentityService::new(Arc::clone(&supabase));
        Self {
            supabase,
            identity,
            events,
        }
    }

    /// Book a slot for a doctor. Slot and payment are validated before the
    /// patient is resolved, so a rejected booking provisions no walk-in
    /// account; the insert then relies on the conflict pre-check as fast
    /// path and the store's uniqueness constraint as the authoritative
    /// backstop. Account cross-references are written before the created
    /// event is published; notification delivery can never undo the booking.
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<CreateAppointmentResponse, SchedulingError> {
        info!(
            "Booking request for doctor {} on {} at {}",
            request.doctor_id, request.date, request.time_slot
        );

        let patient_ref = match (request.patient_id, request.patient.clone()) {
            (Some(id), _) => PatientRef::Existing(id),
            (None, Some(data)) => PatientRef::WalkIn(data),
            (None, None) => {
                return Err(SchedulingError::Validation(
                    "Either patient_id or inline patient data is required".to_string(),
                ))
            }
        };

        if self
            .slot_taken(request.doctor_id, request.date, request.time_slot, None, auth_token)
            .await?
        {
            return Err(SchedulingError::SlotConflict);
        }

        let doctor = self.fetch_doctor(request.doctor_id, auth_token).await?;
        let rate = doctor.hourly_rate.ok_or_else(|| {
            SchedulingError::Validation("Doctor has no hourly rate configured".to_string())
        })?;
        if (request.payment.amount - rate).abs() > f64::EPSILON {
            return Err(SchedulingError::PaymentMismatch {
                expected: rate,
                actual: request.payment.amount,
            });
        }

        let patient = self.identity.resolve(patient_ref, auth_token).await?;

        let snapshot = PatientSnapshot {
            name: patient.full_name(),
            email: patient.email.clone(),
            phone: patient.phone.clone(),
            identity_document_type: patient.identity_document_type.clone(),
            identity_document_number: patient.identity_document_number.clone(),
            file_number: patient.file_number.clone(),
        };

        let row = json!({
            "doctor_id": request.doctor_id,
            "patient_id": patient.id,
            "file_number": patient.file_number,
            "date": request.date,
            "time_slot": request.time_slot,
            "reason": request.reason,
            "status": AppointmentStatus::Pending,
            "payment": { "amount": request.payment.amount, "status": PaymentStatus::Pending },
            "patient_info": snapshot,
            "is_archived": false,
            "created_at": Utc::now().to_rfc3339(),
        });

        let created = match self.supabase.insert_returning("appointments", row, auth_token).await {
            Ok(value) => value,
            // The pre-check is racy by nature; the unique index on
            // (doctor_id, date, time_slot) over non-cancelled rows is what
            // actually holds the invariant.
            Err(StoreError::Conflict(msg)) => {
                warn!("Slot uniqueness rejected concurrent booking: {}", msg);
                return Err(SchedulingError::SlotConflict);
            }
            Err(e) => return Err(SchedulingError::Database(e.to_string())),
        };

        let appointment: Appointment = serde_json::from_value(created)
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        self.link_participants(&patient, &doctor, appointment.id, auth_token).await?;

        self.events.publish(DomainEvent::AppointmentCreated {
            appointment_id: appointment.id,
            doctor_id: doctor.id,
            patient_id: patient.id,
            doctor_name: doctor.full_name(),
            patient_name: patient.full_name(),
            date: appointment.date,
            time_slot: appointment.time_slot.to_string(),
        });

        info!("Appointment {} booked for doctor {}", appointment.id, doctor.id);

        Ok(CreateAppointmentResponse {
            patient: PatientSummary {
                id: patient.id,
                first_name: patient.first_name,
                last_name: patient.last_name,
                email: patient.email,
                file_number: patient.file_number,
            },
            appointment,
        })
    }

    /// Drive a status transition. Historical appointments are frozen, the
    /// transition table is closed, and cancelling a completed payment forces
    /// it to refunded as part of the same transition.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;

        if appointment.starts_at() < Utc::now() {
            return Err(SchedulingError::PastAppointment);
        }
        if !appointment.status.can_transition_to(new_status) {
            return Err(SchedulingError::InvalidTransition {
                from: appointment.status,
                to: new_status,
            });
        }

        let mut patch = json!({ "status": new_status });
        if new_status == AppointmentStatus::Cancelled
            && appointment.payment.status == PaymentStatus::Completed
        {
            debug!("Cancellation of paid appointment {}, marking refunded", appointment_id);
            patch["payment"] = json!({
                "amount": appointment.payment.amount,
                "status": PaymentStatus::Refunded,
            });
        }

        let updated = self.patch_appointment(appointment_id, patch, auth_token).await?;

        // The transition is already persisted; a failed party lookup only
        // costs the notification, never the operation.
        match self.fetch_parties(&updated, auth_token).await {
            Ok((doctor, patient)) => {
                self.events.publish(DomainEvent::AppointmentStatusChanged {
                    appointment_id: updated.id,
                    doctor_id: doctor.id,
                    patient_id: patient.id,
                    doctor_name: doctor.full_name(),
                    patient_first_name: patient.first_name.unwrap_or_default(),
                    date: updated.date,
                    new_status: new_status.to_string(),
                });
            }
            Err(e) => {
                warn!(
                    "Skipping status-change notification for appointment {}: {}",
                    updated.id, e
                );
            }
        }

        Ok(updated)
    }

    /// Move an appointment to a new slot of the same doctor.
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        request: RescheduleRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;

        let now = Utc::now();
        let new_start = request.date.and_time(request.time_slot.start_time()).and_utc();
        if appointment.starts_at() < now || new_start < now {
            return Err(SchedulingError::PastAppointment);
        }

        if self
            .slot_taken(
                appointment.doctor_id,
                request.date,
                request.time_slot,
                Some(appointment_id),
                auth_token,
            )
            .await?
        {
            return Err(SchedulingError::SlotConflict);
        }

        let updated = self
            .patch_appointment(
                appointment_id,
                json!({ "date": request.date, "time_slot": request.time_slot }),
                auth_token,
            )
            .await?;

        match self.fetch_parties(&updated, auth_token).await {
            Ok((doctor, patient)) => {
                self.events.publish(DomainEvent::AppointmentRescheduled {
                    appointment_id: updated.id,
                    doctor_id: doctor.id,
                    patient_id: patient.id,
                    doctor_name: doctor.full_name(),
                    patient_name: patient.full_name(),
                    date: updated.date,
                    time_slot: updated.time_slot.to_string(),
                });
            }
            Err(e) => {
                warn!(
                    "Skipping reschedule notification for appointment {}: {}",
                    updated.id, e
                );
            }
        }

        Ok(updated)
    }

    /// Appointments for one account, doctors seeing their agenda and
    /// patients their visits, ordered chronologically.
    pub async fn get_for_user(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let account = self
            .identity
            .get_account(user_id, auth_token)
            .await
            .map_err(SchedulingError::Identity)?;

        let side = match account.role {
            AccountRole::Doctor => "doctor_id",
            _ => "patient_id",
        };
        let path = format!(
            "/rest/v1/appointments?{}=eq.{}&order=date.asc,time_slot.asc",
            side, user_id
        );

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))
    }

    pub async fn set_archived(
        &self,
        appointment_id: Uuid,
        archived: bool,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        self.patch_appointment(appointment_id, json!({ "is_archived": archived }), auth_token)
            .await
    }

    // ==============================================================================
    // HELPERS (shared with the consultation service)
    // ==============================================================================

    /// Any non-cancelled appointment already holding this doctor/date/slot?
    pub(crate) async fn slot_taken(
        &self,
        doctor_id: Uuid,
        date: chrono::NaiveDate,
        time_slot: TimeSlot,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        let mut query_parts = vec![
            format!("doctor_id=eq.{}", doctor_id),
            format!("date=eq.{}", date),
            format!("time_slot=eq.{}", time_slot),
            "status=neq.cancelled".to_string(),
        ];
        if let Some(exclude_id) = exclude_appointment_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        let existing: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        if !existing.is_empty() {
            warn!(
                "Slot {} {} already reserved for doctor {}",
                date, time_slot, doctor_id
            );
        }
        Ok(!existing.is_empty())
    }

    pub(crate) async fn fetch_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        result.into_iter().next().ok_or(SchedulingError::AppointmentNotFound)
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        patch: Value,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let updated = match self
            .supabase
            .update_returning(
                "appointments",
                &format!("id=eq.{}", appointment_id),
                patch,
                auth_token,
            )
            .await
        {
            Ok(rows) => rows,
            Err(StoreError::Conflict(msg)) => {
                warn!("Slot uniqueness rejected reschedule: {}", msg);
                return Err(SchedulingError::SlotConflict);
            }
            Err(e) => return Err(SchedulingError::Database(e.to_string())),
        };

        let row = updated.into_iter().next().ok_or(SchedulingError::AppointmentNotFound)?;
        serde_json::from_value(row).map_err(|e| SchedulingError::Database(e.to_string()))
    }

    async fn fetch_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Account, SchedulingError> {
        let path = format!("/rest/v1/accounts?id=eq.{}&role=eq.doctor", doctor_id);
        let result: Vec<Account> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        result.into_iter().next().ok_or(SchedulingError::DoctorNotFound)
    }

    async fn fetch_parties(
        &self,
        appointment: &Appointment,
        auth_token: &str,
    ) -> Result<(Account, Account), SchedulingError> {
        let doctor = self
            .identity
            .get_account(appointment.doctor_id, auth_token)
            .await
            .map_err(SchedulingError::Identity)?;
        let patient = self
            .identity
            .get_account(appointment.patient_id, auth_token)
            .await
            .map_err(SchedulingError::Identity)?;
        Ok((doctor, patient))
    }

    /// Cross-reference the appointment and counterpart on both accounts.
    async fn link_participants(
        &self,
        patient: &Account,
        doctor: &Account,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        self.link_account(patient, doctor.id, appointment_id, auth_token).await?;
        self.link_account(doctor, patient.id, appointment_id, auth_token).await?;
        Ok(())
    }

    async fn link_account(
        &self,
        account: &Account,
        counterpart_id: Uuid,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        let mut appointments = account.appointments.clone();
        appointments.push(appointment_id);

        let mut users = account.users.clone();
        if !users.contains(&counterpart_id) {
            users.push(counterpart_id);
        }

        self.supabase
            .update_returning(
                "accounts",
                &format!("id=eq.{}", account.id),
                json!({ "appointments": appointments, "users": users }),
                auth_token,
            )
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        Ok(())
    }
}
