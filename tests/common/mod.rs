use reqwest::StatusCode;
use serde_json::{json, Value};

use ridedemand::config::{
    AppConfig, Config, DatabaseConfig, HttpClientConfig, JwtConfig, ServiceUrls,
};
use ridedemand::{app, AppState};

/// Password that satisfies the policy and contains none of the test names.
pub const PASSWORD: &str = "Sunsh1neBlue";

pub struct TestApp {
    pub base_url: String,
    pub http: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Bind the full router on an ephemeral port with fresh per-service SQLite
/// databases. Service base URLs point back at the same listener, so all
/// cross-service calls go over real HTTP.
pub async fn spawn_app() -> TestApp {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("failed to read local addr");
    let base_url = format!("http://{}", addr);

    let run_id = uuid::Uuid::new_v4().simple().to_string();
    let db_url = |name: &str| {
        format!(
            "sqlite:{}/ridedemand-test-{}-{}.db",
            std::env::temp_dir().display(),
            run_id,
            name
        )
    };

    let config = Config {
        app: AppConfig {
            host: "127.0.0.1".to_string(),
            port: addr.port(),
            rust_log: "info".to_string(),
        },
        databases: DatabaseConfig {
            users_url: db_url("users"),
            payments_url: db_url("payments"),
            availability_url: db_url("availability"),
            reservations_url: db_url("reservations"),
            pool_size: 5,
        },
        jwt: JwtConfig {
            secret: "test-secret-key".to_string(),
            expires_in_hours: 1,
        },
        services: ServiceUrls {
            users_url: base_url.clone(),
            payments_url: base_url.clone(),
            availability_url: base_url.clone(),
            reservations_url: base_url.clone(),
        },
        http: HttpClientConfig { timeout_seconds: 5 },
    };

    let state = AppState::new(config).await.expect("failed to build app state");
    tokio::spawn(async move {
        axum::serve(listener, app(state).into_make_service())
            .await
            .expect("test server crashed");
    });

    TestApp {
        base_url,
        http: reqwest::Client::new(),
    }
}

pub async fn create_user(app: &TestApp, username: &str, driver: bool, deposit_cents: i64) {
    let resp = app
        .http
        .post(app.url("/api/users/create_user"))
        .json(&json!({
            "first_name": "Demo",
            "last_name": "Person",
            "username": username,
            "email_address": format!("{}@example.com", username),
            "driver": driver,
            "deposit_cents": deposit_cents,
            "password": PASSWORD,
        }))
        .send()
        .await
        .expect("create_user request failed");
    assert_eq!(resp.status(), StatusCode::CREATED, "create_user({})", username);
}

pub async fn login(app: &TestApp, username: &str) -> String {
    let resp = app
        .http
        .post(app.url("/api/users/login"))
        .json(&json!({"username": username, "password": PASSWORD}))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(resp.status(), StatusCode::OK, "login({})", username);
    let body: Value = resp.json().await.expect("login body was not JSON");
    body["token"].as_str().expect("login response had no token").to_string()
}

pub async fn create_listing(
    app: &TestApp,
    token: &str,
    listing_id: i64,
    ride_date: &str,
    ride_time: &str,
    price_cents: i64,
) {
    let resp = app
        .http
        .post(app.url("/api/availability/listing"))
        .bearer_auth(token)
        .json(&json!({
            "listing_id": listing_id,
            "ride_date": ride_date,
            "ride_time": ride_time,
            "price_cents": price_cents,
        }))
        .send()
        .await
        .expect("create_listing request failed");
    assert_eq!(resp.status(), StatusCode::CREATED, "create_listing({})", listing_id);
}

pub async fn balance_cents(app: &TestApp, token: &str) -> i64 {
    let resp = app
        .http
        .get(app.url("/api/payments/view"))
        .bearer_auth(token)
        .send()
        .await
        .expect("view balance request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("balance body was not JSON");
    body["balance_cents"].as_i64().expect("balance_cents missing")
}

pub async fn reserve(app: &TestApp, token: &str, listing_id: i64) -> (StatusCode, Value) {
    let resp = app
        .http
        .post(app.url("/api/reservations/reserve"))
        .bearer_auth(token)
        .json(&json!({"listing_id": listing_id}))
        .send()
        .await
        .expect("reserve request failed");
    let status = resp.status();
    let body: Value = resp.json().await.expect("reserve body was not JSON");
    (status, body)
}
