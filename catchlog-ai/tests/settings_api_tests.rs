//! Integration tests for the Settings API endpoint
//!
//! POST /api/settings/gemini_api_key: validation, database write, TOML
//! write-back and live analyzer installation.

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use helpers::{json_body, TestApp};
use serde_json::json;
use tower::ServiceExt;

fn set_key_request(api_key: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/settings/gemini_api_key")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "api_key": api_key }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_set_api_key_success() {
    let app = TestApp::new().await;
    assert!(!app.state.uploader.has_analyzer().await);

    let response = app
        .router()
        .oneshot(set_key_request("  test-key-valid-123 "))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("configured successfully"));

    // Database is authoritative
    let db_key = catchlog_ai::db::settings::get_gemini_api_key(&app.pool)
        .await
        .unwrap();
    assert_eq!(db_key, Some("test-key-valid-123".to_string()));

    // TOML backup written
    let toml = catchlog_common::config::load_toml_config(&app.config_path()).unwrap();
    assert_eq!(toml.gemini_api_key, Some("test-key-valid-123".to_string()));

    // Analysis is live without a restart
    assert!(app.state.uploader.has_analyzer().await);
}

#[tokio::test]
async fn test_set_api_key_preserves_other_toml_settings() {
    let app = TestApp::new().await;
    let existing = catchlog_common::config::TomlConfig {
        gemini_model: Some("gemini-1.5-pro".to_string()),
        ..Default::default()
    };
    catchlog_common::config::write_toml_config(&existing, &app.config_path()).unwrap();

    let response = app.router().oneshot(set_key_request("k")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let toml = catchlog_common::config::load_toml_config(&app.config_path()).unwrap();
    assert_eq!(toml.gemini_model.as_deref(), Some("gemini-1.5-pro"));
    assert_eq!(toml.gemini_api_key.as_deref(), Some("k"));
}

#[tokio::test]
async fn test_set_api_key_rejects_blank_keys() {
    let app = TestApp::new().await;

    for key in ["", "   \t"] {
        let response = app.router().oneshot(set_key_request(key)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    let db_key = catchlog_ai::db::settings::get_gemini_api_key(&app.pool)
        .await
        .unwrap();
    assert_eq!(db_key, None);
    assert!(!app.config_path().exists());
    assert!(!app.state.uploader.has_analyzer().await);
}

#[tokio::test]
async fn test_set_api_key_rejects_malformed_json() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/settings/gemini_api_key")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"key": "wrong-field"}"#))
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
}
