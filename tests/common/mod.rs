//! Shared test scaffolding. Requires a Redis instance reachable at
//! `STORE_URL` (defaults to `redis://127.0.0.1:6379/`), matching how the
//! kernel crate's own cache tests assume a local Redis.

use mcp_gateway_auth::config::{AppState, Config};

pub fn test_config(tmp_dir: &std::path::Path) -> Config {
    Config {
        issuer_url: "https://auth.example.test".to_string(),
        base_domain: "auth.example.test".to_string(),
        idp_client_id: "test-idp-client".to_string(),
        idp_client_secret: "test-idp-secret".to_string(),
        idp_authorize_url: "https://idp.example.test/authorize".to_string(),
        idp_token_url: "https://idp.example.test/token".to_string(),
        idp_userinfo_url: "https://idp.example.test/user".to_string(),
        allowed_users: "*".to_string(),
        jwt_signing_key_path: tmp_dir.join("signing.pem").to_string_lossy().into_owned(),
        hmac_secret: "test-hmac-secret-value".to_string(),
        store_url: std::env::var("STORE_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/".to_string()),
        client_lifetime_secs: 7_776_000,
        access_token_lifetime_secs: 3600,
        refresh_token_lifetime_secs: 31_536_000,
        authz_code_lifetime_secs: 60,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
    }
}

pub async fn test_state() -> AppState {
    let mut suffix = [0u8; 8];
    rand::Rng::fill(&mut rand::thread_rng(), &mut suffix);
    let dir = std::env::temp_dir().join(format!("mcp-gateway-auth-test-{}", hex::encode(suffix)));
    std::fs::create_dir_all(&dir).unwrap();

    AppState::new(test_config(&dir))
        .await
        .expect("AppState::new requires a reachable Redis at STORE_URL")
}
