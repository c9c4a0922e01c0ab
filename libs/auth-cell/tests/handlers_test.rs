use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue};

use auth_cell::handlers::{validate_token, verify_token};
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn create_test_config() -> AppConfig {
    TestConfig::default().to_app_config()
}

fn create_auth_header(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "authorization",
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    headers
}

#[tokio::test]
async fn test_validate_token_success() {
    let config = Arc::new(create_test_config());
    let user = TestUser::default();
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let headers = create_auth_header(&token);

    let result = validate_token(State(config), headers).await;

    assert!(result.is_ok());
    let response = result.unwrap().0;
    assert!(response.valid);
    assert_eq!(response.user_id, user.id);
    assert_eq!(response.email, Some(user.email));
    assert_eq!(response.role, Some(user.role));
}

#[tokio::test]
async fn test_validate_token_missing_header() {
    let config = Arc::new(create_test_config());
    let headers = HeaderMap::new();

    let result = validate_token(State(config), headers).await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::Auth(msg) => assert_eq!(msg, "Missing authorization header"),
        _ => panic!("Expected Auth error"),
    }
}

#[tokio::test]
async fn test_validate_token_no_bearer_prefix() {
    let config = Arc::new(create_test_config());
    let mut headers = HeaderMap::new();
    headers.insert("authorization", HeaderValue::from_static("sometoken"));

    let result = validate_token(State(config), headers).await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::Auth(msg) => assert_eq!(msg, "Invalid authorization header format"),
        _ => panic!("Expected Auth error"),
    }
}

#[tokio::test]
async fn test_validate_expired_token_rejected() {
    let config = Arc::new(create_test_config());
    let user = TestUser::default();
    let token = JwtTestUtils::create_expired_token(&user, &config.supabase_jwt_secret);
    let headers = create_auth_header(&token);

    let result = validate_token(State(config), headers).await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::Auth(msg) => assert_eq!(msg, "Token expired"),
        _ => panic!("Expected Auth error"),
    }
}

#[tokio::test]
async fn test_validate_wrong_signature_rejected() {
    let config = Arc::new(create_test_config());
    let user = TestUser::default();
    let token = JwtTestUtils::create_invalid_signature_token(&user);
    let headers = create_auth_header(&token);

    let result = validate_token(State(config), headers).await;

    assert!(result.is_err());
    match result.unwrap_err() {
        AppError::Auth(msg) => assert_eq!(msg, "Invalid token signature"),
        _ => panic!("Expected Auth error"),
    }
}

#[tokio::test]
async fn test_verify_token_reports_validity_as_body() {
    let config = Arc::new(create_test_config());
    let user = TestUser::default();

    let good = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let result = verify_token(State(config.clone()), create_auth_header(&good))
        .await
        .unwrap();
    assert_eq!(result.0["valid"], serde_json::json!(true));

    let bad = JwtTestUtils::create_malformed_token();
    let result = verify_token(State(config), create_auth_header(&bad))
        .await
        .unwrap();
    assert_eq!(result.0["valid"], serde_json::json!(false));
}
