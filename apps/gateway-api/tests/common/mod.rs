#![allow(dead_code)]

use std::net::SocketAddr;

use gateway_api::auth::claims::{Claims, Role};
use gateway_api::config::{Config, RunMode};
use gateway_api::AppState;
use jsonwebtoken::{Algorithm, EncodingKey, Header};

pub const TEST_SECRET: &str = "gateway-test-secret";
pub const TEST_SERVICE_KEY: &str = "svc-test-key";

pub fn test_config(mode: RunMode) -> Config {
    Config {
        port: 0,
        jwt_secret: TEST_SECRET.to_string(),
        mode,
        allowed_origins: Vec::new(),
        ping_interval_secs: 25,
        ping_timeout_secs: 60,
        service_key: TEST_SERVICE_KEY.to_string(),
    }
}

pub fn test_state(mode: RunMode) -> AppState {
    AppState::new(test_config(mode))
}

/// Mint a valid access token the way the campus HTTP services would.
pub fn mint_token(user_id: &str, username: &str, role: Role) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        username: Some(username.to_string()),
        full_name: Some(format!("{username} full")),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("mint token")
}

/// Start an actual TCP server for WebSocket testing. Returns the bound
/// address; the server runs in the background.
pub async fn start_server(state: AppState) -> SocketAddr {
    let app = gateway_api::routes::router().with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}
