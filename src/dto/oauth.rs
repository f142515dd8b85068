//! OAuth2 request/response shapes for `/authorize`, `/token`, `/revoke`,
//! `/introspect`. Follows RFC 6749 and RFC 7636 (PKCE).

use serde::{Deserialize, Serialize};

/// Query parameters for `GET /authorize`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationRequest {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scope: Option<String>,
    pub code_challenge: String,
    pub code_challenge_method: String,
    pub state: String,
}

/// `POST /token` body, `application/x-www-form-urlencoded`. Only
/// `authorization_code` and `refresh_token` grants are dispatched; any other
/// `grant_type` yields `unsupported_grant_type`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub code_verifier: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub scope: String,
}

/// `POST /revoke` body (RFC 7009).
#[derive(Debug, Clone, Deserialize)]
pub struct RevokeRequest {
    pub token: String,
    #[serde(default)]
    pub token_type_hint: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// `POST /introspect` body (RFC 7662).
#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectRequest {
    pub token: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntrospectResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl IntrospectResponse {
    pub fn inactive() -> Self {
        Self {
            active: false,
            sub: None,
            aud: None,
            client_id: None,
            scope: None,
            exp: None,
            iat: None,
        }
    }
}
