use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Grant types a client may be registered for. Only these two are ever
/// dispatched by the OAuth engine; `client_credentials` has no counterpart
/// here since the gateway only federates human identity.
pub const SUPPORTED_GRANT_TYPES: &[&str] = &["authorization_code", "refresh_token"];

/// Recognized `token_endpoint_auth_method` values (RFC 7591 §2).
pub const SUPPORTED_AUTH_METHODS: &[&str] =
    &["client_secret_post", "client_secret_basic", "none"];

/// A dynamically registered OAuth client, stored at `oauth:client:{client_id}`.
///
/// Fields not named by RFC 7591's core metadata (e.g. a vendor's custom
/// `foo_bar` field) are preserved verbatim in `extra` and echoed back on
/// every read, per RFC 7591 §3.2.1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub client_id: String,
    pub client_secret_hash: Option<String>,
    pub registration_access_token_hash: String,
    pub redirect_uris: Vec<String>,
    pub client_name: Option<String>,
    pub client_uri: Option<String>,
    pub logo_uri: Option<String>,
    pub contacts: Option<Vec<String>>,
    pub tos_uri: Option<String>,
    pub policy_uri: Option<String>,
    pub software_id: Option<String>,
    pub software_version: Option<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
    pub created_at: i64,
    pub client_secret_expires_at: i64,
    /// Unknown metadata fields supplied at registration, preserved verbatim.
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Client {
    pub fn is_expired(&self, now: i64) -> bool {
        self.client_secret_expires_at != 0 && now >= self.client_secret_expires_at
    }

    pub fn has_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|u| u == uri)
    }

    pub fn is_public(&self) -> bool {
        self.token_endpoint_auth_method == "none"
    }

    pub fn key(client_id: &str) -> String {
        format!("oauth:client:{client_id}")
    }
}
