//! RFC 7591 (dynamic registration) / RFC 7592 (management protocol) wire
//! shapes. Unknown metadata fields round-trip through `extra` per RFC 7591
//! §3.2.1 rather than being silently dropped.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::Client;

/// Client metadata as submitted at `POST /register` and `PUT /register/{id}`.
/// `client_id` is only meaningful on PUT, where it must equal the path
/// parameter if present.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientMetadata {
    #[serde(default)]
    pub client_id: Option<String>,
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_uri: Option<String>,
    #[serde(default)]
    pub logo_uri: Option<String>,
    #[serde(default)]
    pub contacts: Option<Vec<String>>,
    #[serde(default)]
    pub tos_uri: Option<String>,
    #[serde(default)]
    pub policy_uri: Option<String>,
    #[serde(default)]
    pub software_id: Option<String>,
    #[serde(default)]
    pub software_version: Option<String>,
    #[serde(default)]
    pub grant_types: Option<Vec<String>>,
    #[serde(default)]
    pub response_types: Option<Vec<String>>,
    #[serde(default)]
    pub token_endpoint_auth_method: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Response body for `POST /register`, `GET /register/{id}`, `PUT
/// /register/{id}`. `client_secret` and `registration_access_token` are
/// populated only on the create response — the one opportunity to see them
/// in plaintext.
#[derive(Debug, Clone, Serialize)]
pub struct ClientRegistrationResponse {
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_client_uri: Option<String>,
    pub client_id_issued_at: i64,
    pub client_secret_expires_at: i64,
    pub redirect_uris: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contacts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tos_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ClientRegistrationResponse {
    /// Build a response from a stored `Client`. `client_secret` and
    /// `registration_access_token` are `None` on every read except the
    /// create/registration response.
    pub fn from_client(
        client: &Client,
        client_secret: Option<String>,
        registration_access_token: Option<String>,
        registration_client_uri: Option<String>,
    ) -> Self {
        Self {
            client_id: client.client_id.clone(),
            client_secret,
            registration_access_token,
            registration_client_uri,
            client_id_issued_at: client.created_at,
            client_secret_expires_at: client.client_secret_expires_at,
            redirect_uris: client.redirect_uris.clone(),
            client_name: client.client_name.clone(),
            client_uri: client.client_uri.clone(),
            logo_uri: client.logo_uri.clone(),
            contacts: client.contacts.clone(),
            tos_uri: client.tos_uri.clone(),
            policy_uri: client.policy_uri.clone(),
            software_id: client.software_id.clone(),
            software_version: client.software_version.clone(),
            grant_types: client.grant_types.clone(),
            response_types: client.response_types.clone(),
            token_endpoint_auth_method: client.token_endpoint_auth_method.clone(),
            extra: client.extra.clone(),
        }
    }
}
