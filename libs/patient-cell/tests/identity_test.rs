use assert_matches::assert_matches;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_cell::models::{IdentityDocumentInput, IdentityError, PatientRef, WalkInPatient};
use patient_cell::services::identity::PatientIdentityService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;

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

fn test_service(mock_server: &MockServer) -> PatientIdentityService {
    PatientIdentityService::new(Arc::new(SupabaseClient::new(&test_config(mock_server))))
}

fn walk_in() -> WalkInPatient {
    WalkInPatient {
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
    }
}

fn account_json(id: Uuid, file_number: Option<&str>) -> Value {
    json!({
        "id": id,
        "first_name": "Amine",
        "last_name": "Ben Salah",
        "email": "amine@example.com",
        "role": "patient",
        "identity_document_type": "national_id",
        "identity_document_number": "AB123456",
        "file_number": file_number,
    })
}

#[tokio::test]
async fn matching_document_returns_the_existing_account() {
    let mock_server = MockServer::start().await;
    let existing_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([account_json(existing_id, Some("NAAMBE260342"))])),
        )
        .mount(&mock_server)
        .await;

    // Dedupe: no provisioning when the document already matches.
    Mock::given(method("POST"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server);

    let first = service.resolve(PatientRef::WalkIn(walk_in()), TOKEN).await.unwrap();
    let second = service.resolve(PatientRef::WalkIn(walk_in()), TOKEN).await.unwrap();

    assert_eq!(first.id, existing_id);
    assert_eq!(second.id, existing_id);
}

#[tokio::test]
async fn unknown_walk_in_is_provisioned_with_a_file_number() {
    let mock_server = MockServer::start().await;
    let new_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/accounts"))
        .and(body_partial_json(json!({
            "role": "patient",
            "identity_document_type": "national_id",
            "identity_document_number": "AB123456",
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([account_json(new_id, Some("NAAMBE260342"))])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server);
    let account = service.resolve(PatientRef::WalkIn(walk_in()), TOKEN).await.unwrap();

    assert_eq!(account.id, new_id);
    assert!(account.file_number.is_some());
}

#[tokio::test]
async fn legacy_match_without_file_number_is_backfilled() {
    let mock_server = MockServer::start().await;
    let legacy_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([account_json(legacy_id, None)])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/accounts"))
        .and(query_param("id", format!("eq.{}", legacy_id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([account_json(legacy_id, Some("NAAMBE260342"))])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server);
    let account = service.resolve(PatientRef::WalkIn(walk_in()), TOKEN).await.unwrap();

    assert_eq!(account.id, legacy_id);
    assert_eq!(account.file_number.as_deref(), Some("NAAMBE260342"));
}

#[tokio::test]
async fn malformed_document_never_reaches_the_store() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut patient = walk_in();
    patient.identity_document = IdentityDocumentInput {
        national_id: Some("a!".to_string()),
        ..Default::default()
    };

    let service = test_service(&mock_server);
    let err = service
        .resolve(PatientRef::WalkIn(patient), TOKEN)
        .await
        .unwrap_err();

    assert_matches!(err, IdentityError::InvalidDocumentFormat("national id"));
}

#[tokio::test]
async fn repeated_file_number_collisions_give_up_after_three_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server);
    let err = service
        .resolve(PatientRef::WalkIn(walk_in()), TOKEN)
        .await
        .unwrap_err();

    assert_matches!(err, IdentityError::FileNumberExhausted);
}
