mod common;

use common::TestApp;

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let response = reqwest::get(format!("{}/health", app.address))
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Invalid body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "moments-service");

    app.cleanup().await;
}

#[tokio::test]
async fn readiness_check_works() {
    let app = TestApp::spawn().await;

    let response = reqwest::get(format!("{}/ready", app.address))
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);

    app.cleanup().await;
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::spawn().await;

    let response = reqwest::get(format!("{}/me", app.address))
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 401);

    app.cleanup().await;
}
