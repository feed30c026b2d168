use assert_matches::assert_matches;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::events::{DomainEvent, EventPublisher};
use patient_cell::models::{IdentityDocumentInput, WalkInPatient};
use scheduling_cell::models::{
    AppointmentStatus, CreateAppointmentRequest, PaymentRequest, RescheduleRequest,
    SchedulingError, TimeSlot,
};
use scheduling_cell::services::booking::SchedulingService;
use shared_config::AppConfig;

const TOKEN: &str = "test-token";

fn test_config(mock_server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: mock_server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_service_key: "test-service-key".to_string(),
        mailer_base_url: String::new(),
        mailer_api_key: String::new(),
        mailer_from: "no-reply@clinic.local".to_string(),
        payment_base_url: String::new(),
        payment_api_key: String::new(),
    }
}

fn account_json(id: Uuid, role: &str) -> Value {
    json!({
        "id": id,
        "first_name": "Amine",
        "last_name": "Ben Salah",
        "email": "amine@example.com",
        "role": role,
        "file_number": "NAAMBE260342",
        "hourly_rate": if role == "doctor" { json!(500.0) } else { Value::Null },
    })
}

fn appointment_json(
    id: Uuid,
    doctor_id: Uuid,
    patient_id: Uuid,
    date: &str,
    time_slot: &str,
    status: &str,
    payment_status: &str,
) -> Value {
    json!({
        "id": id,
        "doctor_id": doctor_id,
        "patient_id": patient_id,
        "file_number": "NAAMBE260342",
        "date": date,
        "time_slot": time_slot,
        "status": status,
        "payment": { "amount": 500.0, "status": payment_status },
        "is_archived": false,
    })
}

async fn mount_account(mock_server: &MockServer, id: Uuid, role: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([account_json(id, role)])))
        .mount(mock_server)
        .await;
}

fn booking_request(doctor_id: Uuid, patient_id: Uuid) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        doctor_id,
        date: "2030-05-20".parse().unwrap(),
        time_slot: TimeSlot::T1000,
        reason: Some("Consultation générale".to_string()),
        patient_id: Some(patient_id),
        patient: None,
        payment: PaymentRequest { amount: 500.0 },
    }
}

#[tokio::test]
async fn booking_a_free_slot_succeeds_and_publishes_an_event() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    mount_account(&mock_server, doctor_id, "doctor").await;
    mount_account(&mock_server, patient_id, "patient").await;

    // The pre-check ignores cancelled rows, so a previously cancelled
    // appointment on the same slot does not block this booking.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "neq.cancelled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([appointment_json(
            appointment_id,
            doctor_id,
            patient_id,
            "2030-05-20",
            "10:00",
            "pending",
            "pending"
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/accounts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([account_json(patient_id, "patient")])),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let (events, mut events_rx) = EventPublisher::channel();
    let service = SchedulingService::new(&test_config(&mock_server), events);

    let response = service
        .create_appointment(booking_request(doctor_id, patient_id), TOKEN)
        .await
        .unwrap();

    assert_eq!(response.appointment.id, appointment_id);
    assert_eq!(response.appointment.status, AppointmentStatus::Pending);
    assert_eq!(response.patient.id, patient_id);

    let event = events_rx.try_recv().unwrap();
    assert_matches!(
        event,
        DomainEvent::AppointmentCreated { appointment_id: id, .. } if id == appointment_id
    );
}

#[tokio::test]
async fn reserved_slot_is_rejected_before_any_write() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    mount_account(&mock_server, patient_id, "patient").await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "neq.cancelled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_json(
            Uuid::new_v4(),
            doctor_id,
            Uuid::new_v4(),
            "2030-05-20",
            "10:00",
            "confirmed",
            "completed"
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (events, mut events_rx) = EventPublisher::channel();
    let service = SchedulingService::new(&test_config(&mock_server), events);

    let err = service
        .create_appointment(booking_request(doctor_id, patient_id), TOKEN)
        .await
        .unwrap_err();

    assert_matches!(err, SchedulingError::SlotConflict);
    assert!(events_rx.try_recv().is_err());
}

#[tokio::test]
async fn storage_conflict_on_insert_is_the_backstop() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    mount_account(&mock_server, doctor_id, "doctor").await;
    mount_account(&mock_server, patient_id, "patient").await;

    // Pre-check sees a free slot, but a concurrent booking wins the insert.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key"))
        .mount(&mock_server)
        .await;

    let (events, _events_rx) = EventPublisher::channel();
    let service = SchedulingService::new(&test_config(&mock_server), events);

    let err = service
        .create_appointment(booking_request(doctor_id, patient_id), TOKEN)
        .await
        .unwrap_err();

    assert_matches!(err, SchedulingError::SlotConflict);
}

#[tokio::test]
async fn payment_mismatch_is_rejected_with_no_side_effects() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    mount_account(&mock_server, doctor_id, "doctor").await;
    mount_account(&mock_server, patient_id, "patient").await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut request = booking_request(doctor_id, patient_id);
    request.payment = PaymentRequest { amount: 300.0 };

    let (events, _events_rx) = EventPublisher::channel();
    let service = SchedulingService::new(&test_config(&mock_server), events);

    let err = service.create_appointment(request, TOKEN).await.unwrap_err();
    assert_matches!(
        err,
        SchedulingError::PaymentMismatch { expected, actual }
            if expected == 500.0 && actual == 300.0
    );
}

#[tokio::test]
async fn mismatched_payment_provisions_no_walk_in_account() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    mount_account(&mock_server, doctor_id, "doctor").await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // The rate check fires before identity resolution, so the walk-in is
    // neither looked up nor provisioned.
    Mock::given(method("POST"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let request = CreateAppointmentRequest {
        doctor_id,
        date: "2030-05-20".parse().unwrap(),
        time_slot: TimeSlot::T1000,
        reason: None,
        patient_id: None,
        patient: Some(WalkInPatient {
            first_name: "Amine".to_string(),
            last_name: "Ben Salah".to_string(),
            email: "amine@example.com".to_string(),
            phone: "+21655123456".to_string(),
            identity_document: IdentityDocumentInput {
                national_id: Some("AB123456".to_string()),
                ..Default::default()
            },
            address: None,
            date_of_birth: None,
            gender: None,
        }),
        payment: PaymentRequest { amount: 300.0 },
    };

    let (events, _events_rx) = EventPublisher::channel();
    let service = SchedulingService::new(&test_config(&mock_server), events);

    let err = service.create_appointment(request, TOKEN).await.unwrap_err();
    assert_matches!(err, SchedulingError::PaymentMismatch { .. });
}

#[tokio::test]
async fn cancelling_a_paid_appointment_refunds_it() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    mount_account(&mock_server, doctor_id, "doctor").await;
    mount_account(&mock_server, patient_id, "patient").await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_json(
            appointment_id,
            doctor_id,
            patient_id,
            "2030-05-20",
            "10:00",
            "confirmed",
            "completed"
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({
            "status": "cancelled",
            "payment": { "status": "refunded" },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_json(
            appointment_id,
            doctor_id,
            patient_id,
            "2030-05-20",
            "10:00",
            "cancelled",
            "refunded"
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (events, mut events_rx) = EventPublisher::channel();
    let service = SchedulingService::new(&test_config(&mock_server), events);

    let updated = service
        .update_status(appointment_id, AppointmentStatus::Cancelled, TOKEN)
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Cancelled);
    assert_matches!(
        events_rx.try_recv().unwrap(),
        DomainEvent::AppointmentStatusChanged { new_status, .. } if new_status == "cancelled"
    );
}

#[tokio::test]
async fn broken_party_lookup_does_not_undo_a_persisted_transition() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_json(
            appointment_id,
            doctor_id,
            patient_id,
            "2030-05-20",
            "10:00",
            "pending",
            "pending"
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_json(
            appointment_id,
            doctor_id,
            patient_id,
            "2030-05-20",
            "10:00",
            "confirmed",
            "pending"
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The accounts lookup only feeds the notification; its failure must not
    // surface once the transition is stored.
    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(500).set_body_string("store down"))
        .mount(&mock_server)
        .await;

    let (events, mut events_rx) = EventPublisher::channel();
    let service = SchedulingService::new(&test_config(&mock_server), events);

    let updated = service
        .update_status(appointment_id, AppointmentStatus::Confirmed, TOKEN)
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Confirmed);
    assert!(events_rx.try_recv().is_err());
}

#[tokio::test]
async fn reopening_a_cancelled_appointment_is_rejected() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_json(
            appointment_id,
            Uuid::new_v4(),
            Uuid::new_v4(),
            "2030-05-20",
            "10:00",
            "cancelled",
            "refunded"
        )])))
        .mount(&mock_server)
        .await;

    let (events, _events_rx) = EventPublisher::channel();
    let service = SchedulingService::new(&test_config(&mock_server), events);

    let err = service
        .update_status(appointment_id, AppointmentStatus::Confirmed, TOKEN)
        .await
        .unwrap_err();

    assert_matches!(
        err,
        SchedulingError::InvalidTransition {
            from: AppointmentStatus::Cancelled,
            to: AppointmentStatus::Confirmed,
        }
    );
}

#[tokio::test]
async fn past_appointments_are_frozen() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_json(
            appointment_id,
            Uuid::new_v4(),
            Uuid::new_v4(),
            "2020-01-15",
            "09:00",
            "confirmed",
            "completed"
        )])))
        .mount(&mock_server)
        .await;

    let (events, _events_rx) = EventPublisher::channel();
    let service = SchedulingService::new(&test_config(&mock_server), events);

    let err = service
        .update_status(appointment_id, AppointmentStatus::Cancelled, TOKEN)
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::PastAppointment);
}

#[tokio::test]
async fn rescheduling_to_a_taken_slot_is_rejected() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_json(
            appointment_id,
            doctor_id,
            Uuid::new_v4(),
            "2030-05-20",
            "10:00",
            "confirmed",
            "completed"
        )])))
        .mount(&mock_server)
        .await;

    // The target slot is held by a different appointment; the moved one is
    // excluded from its own conflict check.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("neq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_json(
            Uuid::new_v4(),
            doctor_id,
            Uuid::new_v4(),
            "2030-05-21",
            "11:00",
            "pending",
            "pending"
        )])))
        .mount(&mock_server)
        .await;

    let (events, _events_rx) = EventPublisher::channel();
    let service = SchedulingService::new(&test_config(&mock_server), events);

    let err = service
        .reschedule(
            appointment_id,
            RescheduleRequest {
                date: "2030-05-21".parse().unwrap(),
                time_slot: TimeSlot::T1100,
            },
            TOKEN,
        )
        .await
        .unwrap_err();

    assert_matches!(err, SchedulingError::SlotConflict);
}
