mod common;

use common::TestApp;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

async fn mock_initialize(app: &TestApp) {
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": true,
            "message": "Authorization URL created",
            "data": {
                "authorization_url": "https://checkout.paystack.com/0peioxfhpn",
                "access_code": "0peioxfhpn",
                "reference": "provider-echo"
            }
        })))
        .mount(&app.paystack_server)
        .await;
}

async fn mock_verify(app: &TestApp, status: &str, amount: i64) {
    Mock::given(method("GET"))
        .and(path_regex("^/transaction/verify/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": true,
            "message": "Verification successful",
            "data": {
                "id": 302961,
                "reference": "provider-echo",
                "status": status,
                "amount": amount,
                "currency": "NGN",
                "channel": "card",
                "paid_at": "2026-08-01T10:00:00.000Z"
            }
        })))
        .mount(&app.paystack_server)
        .await;
}

async fn checkout(app: &TestApp, token: &str, plan_id: &str) -> serde_json::Value {
    let response = reqwest::Client::new()
        .post(format!("{}/payments/checkout", app.address))
        .bearer_auth(token)
        .json(&serde_json::json!({ "plan_id": plan_id }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 201);
    response.json().await.expect("Invalid checkout body")
}

async fn me(app: &TestApp, token: &str) -> serde_json::Value {
    reqwest::Client::new()
        .get(format!("{}/me", app.address))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn checkout_records_a_pending_transaction() {
    let app = TestApp::spawn().await;
    mock_initialize(&app).await;

    let (_user_id, token) = app.create_user("amara@example.com").await;
    let standard = app.plan_by_tier("STANDARD").await;

    let body = checkout(&app, &token, &standard.id).await;
    assert!(body["authorization_url"]
        .as_str()
        .unwrap()
        .starts_with("https://checkout.paystack.com/"));
    assert!(body["reference"].as_str().unwrap().starts_with("ms_"));

    let transactions: serde_json::Value = reqwest::Client::new()
        .get(format!("{}/payments/transactions", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let transactions = transactions.as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["status"], "PENDING");
    assert_eq!(transactions[0]["amount"], standard.amount);

    app.cleanup().await;
}

#[tokio::test]
async fn verified_payment_applies_the_plan_exactly_once() {
    let app = TestApp::spawn().await;
    mock_initialize(&app).await;

    let (_user_id, token) = app.create_user("amara@example.com").await;
    let standard = app.plan_by_tier("STANDARD").await;
    let client = reqwest::Client::new();

    let body = checkout(&app, &token, &standard.id).await;
    let reference = body["reference"].as_str().unwrap().to_string();

    mock_verify(&app, "success", standard.amount).await;

    let response = client
        .post(format!("{}/payments/verify", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "reference": reference }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    let verified: serde_json::Value = response.json().await.expect("Invalid body");
    assert_eq!(verified["status"], "SUCCESS");
    // 1 FREE credit + 3 STANDARD credits.
    assert_eq!(verified["user"]["credits"], 4);
    assert_eq!(verified["user"]["active_plan_id"], standard.id.as_str());
    assert_eq!(verified["user"]["max_events"], 3);

    // Re-verifying the same reference must not grant credits again.
    let response = client
        .post(format!("{}/payments/verify", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "reference": reference }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);
    let again: serde_json::Value = response.json().await.expect("Invalid body");
    assert_eq!(again["status"], "SUCCESS");
    assert_eq!(again["user"]["credits"], 4);

    app.cleanup().await;
}

#[tokio::test]
async fn amount_mismatch_marks_the_transaction_failed() {
    let app = TestApp::spawn().await;
    mock_initialize(&app).await;

    let (_user_id, token) = app.create_user("amara@example.com").await;
    let standard = app.plan_by_tier("STANDARD").await;
    let client = reqwest::Client::new();

    let body = checkout(&app, &token, &standard.id).await;
    let reference = body["reference"].as_str().unwrap().to_string();

    // Provider reports a different amount than we initialized.
    mock_verify(&app, "success", 100).await;

    let response = client
        .post(format!("{}/payments/verify", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "reference": reference }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    let verified: serde_json::Value = response.json().await.expect("Invalid body");
    assert_eq!(verified["status"], "FAILED");
    assert!(verified["message"]
        .as_str()
        .unwrap()
        .contains("amount mismatch"));

    // The user was not touched.
    let profile = me(&app, &token).await;
    assert_eq!(profile["credits"], 1);
    let free = app.plan_by_tier("FREE").await;
    assert_eq!(profile["active_plan_id"], free.id.as_str());

    app.cleanup().await;
}

#[tokio::test]
async fn free_plan_cannot_be_purchased() {
    let app = TestApp::spawn().await;
    let (_user_id, token) = app.create_user("amara@example.com").await;
    let free = app.plan_by_tier("FREE").await;

    let response = reqwest::Client::new()
        .post(format!("{}/payments/checkout", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "plan_id": free.id }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn verifying_an_unknown_reference_returns_not_found() {
    let app = TestApp::spawn().await;
    let (_user_id, token) = app.create_user("amara@example.com").await;

    let response = reqwest::Client::new()
        .post(format!("{}/payments/verify", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "reference": "ms_never_created" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 404);

    app.cleanup().await;
}
