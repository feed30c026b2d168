// libs/notification-cell/src/events.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

/// Domain events appended by the scheduling engine. A separate consumer task
/// turns them into persisted + pushed notifications, so delivery failures can
/// never fail the operation that produced the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    AppointmentCreated {
        appointment_id: Uuid,
        doctor_id: Uuid,
        patient_id: Uuid,
        doctor_name: String,
        patient_name: String,
        date: NaiveDate,
        time_slot: String,
    },
    AppointmentStatusChanged {
        appointment_id: Uuid,
        doctor_id: Uuid,
        patient_id: Uuid,
        doctor_name: String,
        patient_first_name: String,
        date: NaiveDate,
        new_status: String,
    },
    AppointmentRescheduled {
        appointment_id: Uuid,
        doctor_id: Uuid,
        patient_id: Uuid,
        doctor_name: String,
        patient_name: String,
        date: NaiveDate,
        time_slot: String,
    },
}

/// Producer half of the outbound event queue.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: mpsc::UnboundedSender<DomainEvent>,
}

impl EventPublisher {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DomainEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Append an event. Intentionally infallible for callers: if the consumer
    /// is gone the event is dropped and logged, the triggering operation has
    /// already succeeded.
    pub fn publish(&self, event: DomainEvent) {
        if let Err(e) = self.tx.send(event) {
            warn!("Dropping domain event, consumer is not running: {}", e);
        }
    }
}
