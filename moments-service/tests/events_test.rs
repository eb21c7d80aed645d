mod common;

use common::TestApp;

async fn create_event(app: &TestApp, token: &str, title: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/events", app.address))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "title": title,
            "description": "Bring your dancing shoes",
            "location": "Lagos"
        }))
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn creating_an_event_consumes_a_credit() {
    let app = TestApp::spawn().await;
    let (_user_id, token) = app.create_user("amara@example.com").await;
    let client = reqwest::Client::new();

    let response = create_event(&app, &token, "Amara & Tunde's Wedding").await;
    assert_eq!(response.status(), 201);

    let event: serde_json::Value = response.json().await.expect("Invalid body");
    assert_eq!(event["title"], "Amara & Tunde's Wedding");
    assert!(!event["code"].as_str().unwrap().is_empty());
    assert!(!event["qr_image_base64"].as_str().unwrap().is_empty());
    assert!(event["guest_url"]
        .as_str()
        .unwrap()
        .ends_with(&format!("/e/{}", event["code"].as_str().unwrap())));

    // The FREE plan's single credit is gone.
    let me: serde_json::Value = client
        .get(format!("{}/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["credits"], 0);

    app.cleanup().await;
}

#[tokio::test]
async fn free_tier_is_limited_to_one_active_event() {
    let app = TestApp::spawn().await;
    let (_user_id, token) = app.create_user("amara@example.com").await;

    let first = create_event(&app, &token, "First event").await;
    assert_eq!(first.status(), 201);

    // FREE max_events is 1, so the limit trips before the credit check.
    let second = create_event(&app, &token, "Second event").await;
    assert_eq!(second.status(), 403);

    app.cleanup().await;
}

#[tokio::test]
async fn guest_view_is_public() {
    let app = TestApp::spawn().await;
    let (_user_id, token) = app.create_user("amara@example.com").await;

    let event: serde_json::Value = create_event(&app, &token, "Graduation party")
        .await
        .json()
        .await
        .expect("Invalid body");
    let code = event["code"].as_str().unwrap();

    let response = reqwest::get(format!("{}/guest/events/{}", app.address, code))
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    let guest: serde_json::Value = response.json().await.expect("Invalid body");
    assert_eq!(guest["title"], "Graduation party");
    assert_eq!(guest["uploads_open"], true);
    assert_eq!(guest["media_count"], 0);

    app.cleanup().await;
}

#[tokio::test]
async fn events_are_scoped_to_their_organizer() {
    let app = TestApp::spawn().await;
    let (_amara, amara_token) = app.create_user("amara@example.com").await;
    let (_tunde, tunde_token) = app.create_user("tunde@example.com").await;

    let event: serde_json::Value = create_event(&app, &amara_token, "Amara's event")
        .await
        .json()
        .await
        .expect("Invalid body");
    let event_id = event["id"].as_str().unwrap();

    let response = reqwest::Client::new()
        .get(format!("{}/events/{}", app.address, event_id))
        .bearer_auth(&tunde_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn qr_flyer_is_served_as_png() {
    let app = TestApp::spawn().await;
    let (_user_id, token) = app.create_user("amara@example.com").await;

    let event: serde_json::Value = create_event(&app, &token, "Birthday bash")
        .await
        .json()
        .await
        .expect("Invalid body");
    let event_id = event["id"].as_str().unwrap();

    let response = reqwest::Client::new()
        .get(format!("{}/events/{}/qr.png", app.address, event_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "image/png");

    let bytes = response.bytes().await.expect("Invalid body");
    assert_eq!(&bytes[1..4], b"PNG");

    app.cleanup().await;
}

#[tokio::test]
async fn organizer_can_edit_and_delete_their_event() {
    let app = TestApp::spawn().await;
    let (_user_id, token) = app.create_user("amara@example.com").await;
    let client = reqwest::Client::new();

    let event: serde_json::Value = create_event(&app, &token, "Old title")
        .await
        .json()
        .await
        .expect("Invalid body");
    let event_id = event["id"].as_str().unwrap();

    let response = client
        .patch(format!("{}/events/{}", app.address, event_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "title": "New title" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);
    let updated: serde_json::Value = response.json().await.expect("Invalid body");
    assert_eq!(updated["title"], "New title");

    let response = client
        .delete(format!("{}/events/{}", app.address, event_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/events/{}", app.address, event_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn past_expiry_is_rejected() {
    let app = TestApp::spawn().await;
    let (_user_id, token) = app.create_user("amara@example.com").await;

    let response = reqwest::Client::new()
        .post(format!("{}/events", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "title": "Time traveler's ball",
            "expires_at": "2020-01-01T00:00:00Z"
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}
