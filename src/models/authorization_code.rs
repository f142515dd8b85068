use serde::{Deserialize, Serialize};

/// A one-time authorization code, stored at `oauth:code:{code}`. Default TTL
/// is 60 seconds (`AUTHZ_CODE_LIFETIME_SECONDS`) — redeemed atomically via
/// `StateStore::take` at `/token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    pub client_id: String,
    pub redirect_uri: String,
    pub code_challenge: String,
    pub scope: Option<String>,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub created_at: i64,
}

impl AuthorizationCode {
    pub fn key(code: &str) -> String {
        format!("oauth:code:{code}")
    }
}
