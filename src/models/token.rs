use serde::{Deserialize, Serialize};

/// JWT claims carried by every access token this server issues, signed
/// RS256. `aud` is always the literal `"mcp-gateway"` — every downstream
/// service shares one audience.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub client_id: String,
    pub username: String,
    pub email: String,
    pub scope: String,
}

pub const AUDIENCE: &str = "mcp-gateway";

/// Access-token record, stored at `oauth:token:{jti}` with a TTL matching
/// the token's own lifetime. Presence means the token is valid; absence
/// means revoked or expired (a negative cache by construction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub client_id: String,
    pub user_id: String,
    pub user_name: String,
    pub scope: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl TokenRecord {
    pub fn key(jti: &str) -> String {
        format!("oauth:token:{jti}")
    }

    pub fn user_tokens_key(user_id: &str) -> String {
        format!("oauth:user_tokens:{user_id}")
    }
}
