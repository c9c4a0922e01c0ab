use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use prescription_cell::router::prescription_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn test_config(mock_server: &MockServer) -> AppConfig {
    TestConfig::with_supabase_url(&mock_server.uri()).to_app_config()
}

fn create_test_app(config: AppConfig) -> Router {
    prescription_routes(Arc::new(config))
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn prescription_row(patient_id: &str, doctor_id: &str, medication: &str) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "patient_id": patient_id,
        "doctor_id": doctor_id,
        "medication": medication,
        "dosage": "20mg",
        "instructions": "Once daily with food",
        "issue_date": "2025-03-10",
        "refills": 2,
        "created_at": "2025-03-10T09:00:00Z",
        "updated_at": "2025-03-10T09:00:00Z"
    })
}

#[tokio::test]
async fn doctor_can_issue_a_prescription() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let user = TestUser::doctor("prescriber@clinic.example");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let patient_id = Uuid::new_v4().to_string();
    let doctor_id = user.id.clone();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(&patient_id, "p@example.com", "Test", "Patient")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&doctor_id, "Greta", "House", "General Practice")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            prescription_row(&patient_id, &doctor_id, "Lisinopril")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_vec(&json!({
                        "patient_id": patient_id,
                        "doctor_id": doctor_id,
                        "medication": "Lisinopril",
                        "dosage": "20mg",
                        "instructions": "Once daily with food",
                        "refills": 2
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["prescription"]["medication"], json!("Lisinopril"));
}

#[tokio::test]
async fn patient_cannot_issue_prescriptions() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let app = create_test_app(config);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_vec(&json!({
                        "patient_id": user.id,
                        "doctor_id": Uuid::new_v4(),
                        "medication": "Lisinopril",
                        "dosage": "20mg"
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn patient_prescriptions_come_back_most_recent_first() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let user = TestUser::doctor("reader@clinic.example");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let patient_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(&patient_id, "p@example.com", "Test", "Patient")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .and(query_param("order", "issue_date.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            prescription_row(&patient_id, &Uuid::new_v4().to_string(), "Atorvastatin"),
            prescription_row(&patient_id, &Uuid::new_v4().to_string(), "Lisinopril")
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/patients/{}", patient_id))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["prescriptions"].as_array().unwrap().len(), 2);
    assert_eq!(body["prescriptions"][0]["medication"], json!("Atorvastatin"));
}
