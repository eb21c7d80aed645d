mod common;

use common::TestApp;
use mongodb::bson::{doc, DateTime};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn event_code(app: &TestApp, token: &str) -> (String, String) {
    let event: serde_json::Value = reqwest::Client::new()
        .post(format!("{}/events", app.address))
        .bearer_auth(token)
        .json(&serde_json::json!({ "title": "Wedding reception" }))
        .send()
        .await
        .expect("Failed to create event")
        .json()
        .await
        .expect("Invalid event body");
    (
        event["id"].as_str().unwrap().to_string(),
        event["code"].as_str().unwrap().to_string(),
    )
}

fn register_body(bytes: i64) -> serde_json::Value {
    serde_json::json!({
        "public_id": "momentshare-test/ev1/guest-photo",
        "url": "https://res.cloudinary.com/testcloud/image/upload/guest-photo.jpg",
        "bytes": bytes,
        "file_type": "IMAGE",
        "uploader_name": "Cousin Bola"
    })
}

#[tokio::test]
async fn sign_upload_returns_signed_params() {
    let app = TestApp::spawn().await;
    let (_user_id, token) = app.create_user("amara@example.com").await;
    let (event_id, code) = event_code(&app, &token).await;

    let response = reqwest::Client::new()
        .post(format!("{}/guest/events/{}/uploads/sign", app.address, code))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    let signed: serde_json::Value = response.json().await.expect("Invalid body");
    assert_eq!(signed["cloud_name"], "testcloud");
    assert_eq!(
        signed["folder"],
        format!("momentshare-test/{}", event_id).as_str()
    );
    assert_eq!(signed["signature"].as_str().unwrap().len(), 64);

    app.cleanup().await;
}

#[tokio::test]
async fn registering_media_updates_event_counters() {
    let app = TestApp::spawn().await;
    let (_user_id, token) = app.create_user("amara@example.com").await;
    let (_event_id, code) = event_code(&app, &token).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/guest/events/{}/media", app.address, code))
        .json(&register_body(2_000_000))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 201);

    let media: serde_json::Value = response.json().await.expect("Invalid body");
    assert_eq!(media["file_type"], "IMAGE");
    assert_eq!(media["bytes"], 2_000_000);

    let guest: serde_json::Value = client
        .get(format!("{}/guest/events/{}", app.address, code))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(guest["media_count"], 1);

    app.cleanup().await;
}

#[tokio::test]
async fn oversized_upload_is_refused_and_asset_swept() {
    let app = TestApp::spawn().await;

    // The refused registration should best-effort destroy the asset.
    Mock::given(method("POST"))
        .and(path("/testcloud/image/destroy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": "ok"
        })))
        .expect(1)
        .mount(&app.cloudinary_server)
        .await;

    let (_user_id, token) = app.create_user("amara@example.com").await;
    let (_event_id, code) = event_code(&app, &token).await;

    // FREE storage budget is 200 MB; declare 300 MB.
    let response = reqwest::Client::new()
        .post(format!("{}/guest/events/{}/media", app.address, code))
        .json(&register_body(300 * 1024 * 1024))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 403);

    app.cleanup().await;
}

#[tokio::test]
async fn expired_event_refuses_uploads() {
    let app = TestApp::spawn().await;
    let (_user_id, token) = app.create_user("amara@example.com").await;
    let (event_id, code) = event_code(&app, &token).await;

    // Force the event into the past.
    app.db
        .collection::<mongodb::bson::Document>("events")
        .update_one(
            doc! { "_id": &event_id },
            doc! { "$set": { "expires_at": DateTime::from_millis(0) } },
            None,
        )
        .await
        .expect("Failed to expire event");

    let response = reqwest::Client::new()
        .post(format!("{}/guest/events/{}/uploads/sign", app.address, code))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 410);

    app.cleanup().await;
}

#[tokio::test]
async fn deleting_media_reverses_the_counters() {
    let app = TestApp::spawn().await;

    Mock::given(method("POST"))
        .and(path("/testcloud/image/destroy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": "ok"
        })))
        .mount(&app.cloudinary_server)
        .await;

    let (_user_id, token) = app.create_user("amara@example.com").await;
    let (event_id, code) = event_code(&app, &token).await;
    let client = reqwest::Client::new();

    let media: serde_json::Value = client
        .post(format!("{}/guest/events/{}/media", app.address, code))
        .json(&register_body(2_000_000))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let media_id = media["id"].as_str().unwrap();

    let response = client
        .delete(format!(
            "{}/events/{}/media/{}",
            app.address, event_id, media_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 204);

    let guest: serde_json::Value = client
        .get(format!("{}/guest/events/{}", app.address, code))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(guest["media_count"], 0);

    app.cleanup().await;
}

#[tokio::test]
async fn gallery_lists_registered_media() {
    let app = TestApp::spawn().await;
    let (_user_id, token) = app.create_user("amara@example.com").await;
    let (event_id, code) = event_code(&app, &token).await;
    let client = reqwest::Client::new();

    for i in 0..3 {
        let body = serde_json::json!({
            "public_id": format!("momentshare-test/ev1/photo-{}", i),
            "url": format!("https://res.cloudinary.com/testcloud/image/upload/photo-{}.jpg", i),
            "bytes": 1_000_000,
            "file_type": "IMAGE"
        });
        let response = client
            .post(format!("{}/guest/events/{}/media", app.address, code))
            .json(&body)
            .send()
            .await
            .expect("Failed to register media");
        assert_eq!(response.status(), 201);
    }

    // Public guest gallery.
    let gallery: serde_json::Value = client
        .get(format!("{}/guest/events/{}/media", app.address, code))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(gallery["media"].as_array().unwrap().len(), 3);
    assert_eq!(gallery["media_count"], 3);

    // Owner gallery sees the same set.
    let owner: serde_json::Value = client
        .get(format!("{}/events/{}/media", app.address, event_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(owner["media"].as_array().unwrap().len(), 3);

    app.cleanup().await;
}
