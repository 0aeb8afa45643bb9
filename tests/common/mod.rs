#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use kotoquiz_backend::config::Config;
use kotoquiz_backend::db::memory::{MemoryHistoryStore, MemoryWordCatalog};
use kotoquiz_backend::routes;
use kotoquiz_backend::state::{AppState, Services};

pub const TEST_SECRET: &str = "test-secret";

pub fn test_config() -> Config {
    Config {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        log_level: "info".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
    }
}

/// App without a database: health reports degraded, data endpoints 503.
pub async fn create_test_app() -> Router {
    std::env::set_var("DATABASE_URL", "");
    kotoquiz_backend::create_app().await
}

/// App over in-memory stores, for end-to-end request tests.
pub fn create_memory_app(catalog: MemoryWordCatalog, histories: MemoryHistoryStore) -> Router {
    let services = Arc::new(Services::new(Arc::new(histories), Arc::new(catalog)));
    routes::router(AppState::with_services(test_config(), services))
}

/// HS256 token with the test secret, the shape the identity provider
/// would issue.
pub fn sign_token(user_id: &str) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = serde_json::json!({ "sub": user_id });
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
    let signing_input = format!("{header_b64}.{payload_b64}");

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(TEST_SECRET.as_bytes()).unwrap();
    mac.update(signing_input.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    format!("{signing_input}.{sig_b64}")
}
