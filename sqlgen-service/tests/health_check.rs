mod common;

use common::TestApp;

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "sqlgen-service");
}

#[tokio::test]
async fn readiness_follows_model_load() {
    let app = TestApp::spawn().await;
    app.mock_models(200).await;

    let response = app
        .client
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 503);

    assert_eq!(app.load_model().await.status().as_u16(), 200);

    let response = app
        .client
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn model_health_reports_not_loaded_without_contacting_backend() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.api_address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(
        body,
        serde_json::json!({"status": "healthy", "model_loaded": false})
    );
    assert_eq!(app.vllm_requests("/v1/models").await, 0);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .header("x-request-id", "req-123")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-123")
    );
}
