//! `/verify` — the ForwardAuth target the reverse proxy calls on every
//! gated request. Performance-sensitive: one State Store lookup, no
//! outbound network calls, p99 budget 10ms.

use crate::error::VerifyError;
use crate::keys::KeyManager;
use crate::models::{TokenRecord, AUDIENCE};
use crate::state_store::StateStore;

pub struct VerifiedIdentity {
    pub user_id: String,
    pub user_name: String,
    pub bearer_token: String,
}

/// `authorization_header` is the raw `Authorization` header value from the
/// original downstream request.
pub async fn verify_request(
    store: &StateStore,
    keys: &KeyManager,
    authorization_header: Option<&str>,
) -> Result<VerifiedIdentity, VerifyError> {
    let header = authorization_header.ok_or(VerifyError::MissingToken)?;
    let token = header.strip_prefix("Bearer ").ok_or(VerifyError::MissingToken)?;

    let claims = keys.verify(token).map_err(|_| VerifyError::InvalidToken)?;

    if claims.aud != AUDIENCE {
        return Err(VerifyError::InvalidToken);
    }

    let record: Option<TokenRecord> = store
        .get(&TokenRecord::key(&claims.jti))
        .await
        .map_err(VerifyError::from)?;

    if record.is_none() {
        return Err(VerifyError::Expired);
    }

    Ok(VerifiedIdentity {
        user_id: claims.sub,
        user_name: claims.username,
        bearer_token: token.to_string(),
    })
}
