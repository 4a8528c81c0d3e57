// tests/api_tests.rs

use async_trait::async_trait;
use cgpa_portal::ai::{GenerationError, TextGenerator};
use cgpa_portal::config::{Config, DAILY_FREE_LIMIT};
use cgpa_portal::routes;
use cgpa_portal::state::AppState;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;

/// Generator stub for routes that never reach the AI.
struct UnusedGenerator;

#[async_trait]
impl TextGenerator for UnusedGenerator {
    async fn generate_text(&self, _prompt: &str) -> Result<String, GenerationError> {
        panic!("No test in this suite should call the AI");
    }
}

fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        ai_api_url: "http://127.0.0.1:1".to_string(),
        ai_api_key: "unused".to_string(),
        ai_model: "unused".to_string(),
        admin_username: None,
        admin_password: None,
    }
}

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    // Note: For Postgres, you must have a running database.
    // We'll read from DATABASE_URL environment variable.
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let state = AppState {
        pool,
        config: test_config(&database_url),
        generator: Arc::new(UnusedGenerator),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    address
}

/// Registers and logs in a fresh student, returning (username, token).
async fn register_and_login(client: &reqwest::Client, address: &str) -> (String, String) {
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({"username": username, "password": password}))
        .send()
        .await
        .expect("Register failed");

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"username": username, "password": password}))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    let token = login["token"].as_str().expect("Token not found").to_string();
    (username, token)
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let unique_name = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": unique_name,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
}

#[tokio::test]
async fn register_fails_validation() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: Send a username that is too short
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": "yo",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn login_sets_http_only_cookie() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({"username": username, "password": "password123"}))
        .send()
        .await
        .expect("Register failed");

    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"username": username, "password": "password123"}))
        .send()
        .await
        .expect("Login failed");

    assert_eq!(response.status().as_u16(), 200);

    let cookie = response
        .headers()
        .get("set-cookie")
        .expect("Set-Cookie header missing")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    // The cookie alone must authenticate a protected route.
    let me = client
        .get(format!("{}/api/auth/me", address))
        .header("Cookie", cookie.split(';').next().unwrap())
        .send()
        .await
        .expect("Failed to fetch profile");

    assert_eq!(me.status().as_u16(), 200);
    let body: serde_json::Value = me.json().await.unwrap();
    assert_eq!(body["username"], serde_json::json!(username));
}

#[tokio::test]
async fn protected_routes_require_token() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/ai/check-usage", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn usage_flow_enforces_daily_limit() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &address).await;

    // Fresh ledger: full allowance, usable.
    let status: serde_json::Value = client
        .get(format!("{}/api/ai/check-usage", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Check failed")
        .json()
        .await
        .unwrap();

    assert_eq!(status["canUseAI"], serde_json::json!(true));
    assert_eq!(status["plan"], serde_json::json!("free"));
    assert_eq!(status["dailyTokensUsed"], serde_json::json!(0));
    assert_eq!(status["remainingTokens"], serde_json::json!(DAILY_FREE_LIMIT));
    assert_eq!(status["dailyLimit"], serde_json::json!(DAILY_FREE_LIMIT));

    // Checking again consumes nothing.
    let status: serde_json::Value = client
        .get(format!("{}/api/ai/check-usage", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["dailyTokensUsed"], serde_json::json!(0));

    // Burn the whole daily allowance.
    for i in 1..=DAILY_FREE_LIMIT {
        let response: serde_json::Value = client
            .post(format!("{}/api/ai/check-usage", address))
            .header("Authorization", format!("Bearer {}", token))
            .json(&serde_json::json!({"action": "increment"}))
            .send()
            .await
            .expect("Increment failed")
            .json()
            .await
            .unwrap();

        assert_eq!(response["success"], serde_json::json!(true));
        assert_eq!(response["tokensUsed"], serde_json::json!(i));
    }

    // Gate closed.
    let status: serde_json::Value = client
        .get(format!("{}/api/ai/check-usage", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(status["canUseAI"], serde_json::json!(false));
    assert_eq!(status["dailyTokensUsed"], serde_json::json!(DAILY_FREE_LIMIT));
    assert_eq!(status["remainingTokens"], serde_json::json!(0));
}

#[tokio::test]
async fn unknown_usage_action_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &address).await;

    let response = client
        .post(format!("{}/api/ai/check-usage", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({"action": "decrement"}))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn admin_routes_forbidden_for_students() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = register_and_login(&client, &address).await;

    let response = client
        .get(format!("{}/api/admin/students", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(response.status().as_u16(), 403);
}
