use serde::{Deserialize, Serialize};

/// Refresh-token record, stored at `oauth:refresh:{token_hash}` keyed by the
/// HMAC hash of the opaque refresh token. Single-use: redemption rotates it
/// atomically (the old record is consumed by `StateStore::take`, the new one
/// written in its place).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub client_id: String,
    pub user_id: String,
    pub user_name: String,
    pub scope: String,
    pub issued_at: i64,
    /// The access token's `jti` this refresh token was last issued alongside,
    /// invalidated when the refresh token itself is redeemed.
    pub parent_jti: String,
}

impl RefreshTokenRecord {
    pub fn key(token_hash: &str) -> String {
        format!("oauth:refresh:{token_hash}")
    }
}
