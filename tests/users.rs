mod common;

use common::{create_user, login, spawn_app, PASSWORD};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn login_token_embeds_the_username_as_subject() {
    let app = spawn_app().await;
    create_user(&app, "alice", false, 0).await;

    let token = login(&app, "alice").await;

    // Same secret the test app was configured with.
    assert_eq!(
        ridedemand::auth::token_subject(&token, "test-secret-key").as_deref(),
        Some("alice")
    );
}

#[tokio::test]
async fn tampered_token_signature_is_rejected() {
    let app = spawn_app().await;
    create_user(&app, "bob", false, 0).await;
    let token = login(&app, "bob").await;

    // The genuine token works.
    let resp = app
        .http
        .get(app.url("/api/users/view"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["username"], "bob");

    // Corrupt the signature segment.
    let mut parts: Vec<&str> = token.split('.').collect();
    parts[2] = "deadbeef";
    let tampered = parts.join(".");

    let resp = app
        .http
        .get(app.url("/api/users/view"))
        .bearer_auth(&tampered)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = spawn_app().await;
    create_user(&app, "carol", false, 0).await;

    let resp = app
        .http
        .post(app.url("/api/users/login"))
        .json(&json!({"username": "carol", "password": "Wr0ngPassword"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_username_and_email_are_conflicts() {
    let app = spawn_app().await;
    create_user(&app, "dave", false, 0).await;

    // Same username, different email.
    let resp = app
        .http
        .post(app.url("/api/users/create_user"))
        .json(&json!({
            "first_name": "Demo",
            "last_name": "Person",
            "username": "dave",
            "email_address": "other@example.com",
            "driver": false,
            "deposit_cents": 0,
            "password": PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Different username, same email.
    let resp = app
        .http
        .post(app.url("/api/users/create_user"))
        .json(&json!({
            "first_name": "Demo",
            "last_name": "Person",
            "username": "dave2",
            "email_address": "dave@example.com",
            "driver": false,
            "deposit_cents": 0,
            "password": PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn weak_password_is_rejected_at_signup() {
    let app = spawn_app().await;

    let resp = app
        .http
        .post(app.url("/api/users/create_user"))
        .json(&json!({
            "first_name": "Demo",
            "last_name": "Person",
            "username": "eve",
            "email_address": "eve@example.com",
            "driver": false,
            "deposit_cents": 0,
            "password": "password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "INVALID_INPUT");
}

#[tokio::test]
async fn set_driver_status_requires_matching_token_subject() {
    let app = spawn_app().await;
    create_user(&app, "frank", false, 0).await;
    create_user(&app, "grace", false, 0).await;
    let frank = login(&app, "frank").await;

    // Frank cannot change Grace's role.
    let resp = app
        .http
        .post(app.url("/api/users/set_driver_status"))
        .bearer_auth(&frank)
        .json(&json!({"username": "grace", "driver": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // But he can change his own.
    let resp = app
        .http
        .post(app.url("/api/users/set_driver_status"))
        .bearer_auth(&frank)
        .json(&json!({"username": "frank", "driver": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .http
        .get(app.url("/api/users/get_driver_status"))
        .query(&[("username", "frank")])
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["role"], "driver");
}

#[tokio::test]
async fn password_change_rejects_reuse_and_enforces_policy() {
    let app = spawn_app().await;
    create_user(&app, "heidi", false, 0).await;
    let token = login(&app, "heidi").await;

    // Reusing the current password is rejected.
    let resp = app
        .http
        .post(app.url("/api/users/update"))
        .bearer_auth(&token)
        .json(&json!({"password": PASSWORD, "new_password": PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // A fresh conforming password is accepted and usable for login.
    let resp = app
        .http
        .post(app.url("/api/users/update"))
        .bearer_auth(&token)
        .json(&json!({"password": PASSWORD, "new_password": "M0onlitRiver"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .http
        .post(app.url("/api/users/login"))
        .json(&json!({"username": "heidi", "password": "M0onlitRiver"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // The old password no longer works.
    let resp = app
        .http
        .post(app.url("/api/users/login"))
        .json(&json!({"username": "heidi", "password": PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rating_requires_a_shared_reservation() {
    let app = spawn_app().await;
    create_user(&app, "ivan", false, 0).await;
    create_user(&app, "judy", true, 0).await;
    let ivan = login(&app, "ivan").await;

    let resp = app
        .http
        .post(app.url("/api/users/rate"))
        .bearer_auth(&ivan)
        .json(&json!({"username": "judy", "rating": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
