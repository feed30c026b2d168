use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::models::TimeSlot;
use scheduling_cell::services::availability::AvailabilityService;
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

#[tokio::test]
async fn empty_day_offers_the_full_catalog() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "neq.cancelled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&test_config(&mock_server));
    let day = service
        .check_availability(doctor_id, "2030-05-20".parse().unwrap(), TOKEN)
        .await
        .unwrap();

    assert_eq!(day.total_slots, 8);
    assert_eq!(day.reserved_count, 0);
    assert_eq!(day.available_count, 8);
    assert_eq!(day.available_slots.len(), 8);
}

#[tokio::test]
async fn reserved_slot_is_excluded_from_the_offer() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "neq.cancelled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "patient_id": Uuid::new_v4(),
            "date": "2030-05-20",
            "time_slot": "10:00",
            "status": "confirmed",
            "payment": { "amount": 500.0, "status": "completed" },
        }])))
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&test_config(&mock_server));
    let day = service
        .check_availability(doctor_id, "2030-05-20".parse().unwrap(), TOKEN)
        .await
        .unwrap();

    assert_eq!(day.reserved_count, 1);
    assert_eq!(day.available_count, 7);
    assert!(!day.available_slots.contains(&TimeSlot::T1000));
    assert!(day.available_slots.contains(&TimeSlot::T0900));
    assert!(!day.message.is_empty());
}
