use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// RFC 6749 §5.2 error response body, shared by `/token`, `/revoke`, `/introspect`.
#[derive(Debug, Clone, Serialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl OAuthErrorResponse {
    fn new(error: &str, description: impl Into<Option<String>>) -> Self {
        Self {
            error: error.to_string(),
            error_description: description.into(),
        }
    }
}

/// Errors raised by the OAuth engine (`/authorize`, `/callback`, `/token`,
/// `/revoke`, `/introspect`). Variant names follow RFC 6749's error codes.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    #[error("invalid_client")]
    InvalidClient,

    #[error("invalid_grant: {0}")]
    InvalidGrant(String),

    #[error("unauthorized_client")]
    UnauthorizedClient,

    #[error("unsupported_grant_type")]
    UnsupportedGrantType,

    #[error("invalid_scope: {0}")]
    InvalidScope(String),

    #[error("access_denied")]
    AccessDenied,

    #[error("server_error: {0}")]
    ServerError(String),

    /// The state store could not be reached within its deadline.
    #[error("temporarily unavailable")]
    Unavailable,
}

impl OAuthError {
    fn code_and_status(&self) -> (&'static str, StatusCode) {
        match self {
            OAuthError::InvalidRequest(_) => ("invalid_request", StatusCode::BAD_REQUEST),
            OAuthError::InvalidClient => ("invalid_client", StatusCode::UNAUTHORIZED),
            OAuthError::InvalidGrant(_) => ("invalid_grant", StatusCode::BAD_REQUEST),
            OAuthError::UnauthorizedClient => ("unauthorized_client", StatusCode::BAD_REQUEST),
            OAuthError::UnsupportedGrantType => {
                ("unsupported_grant_type", StatusCode::BAD_REQUEST)
            }
            OAuthError::InvalidScope(_) => ("invalid_scope", StatusCode::BAD_REQUEST),
            OAuthError::AccessDenied => ("access_denied", StatusCode::FORBIDDEN),
            OAuthError::ServerError(_) => ("server_error", StatusCode::INTERNAL_SERVER_ERROR),
            OAuthError::Unavailable => ("temporarily_unavailable", StatusCode::SERVICE_UNAVAILABLE),
        }
    }

    fn description(&self) -> Option<String> {
        match self {
            OAuthError::InvalidRequest(d)
            | OAuthError::InvalidGrant(d)
            | OAuthError::InvalidScope(d)
            | OAuthError::ServerError(d) => Some(d.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let (code, status) = self.code_and_status();
        let body = Json(OAuthErrorResponse::new(code, self.description()));
        let mut response = (status, body).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert("retry-after", HeaderValue::from_static("2"));
        }
        response
    }
}

/// Errors raised by the client registry (RFC 7591 / RFC 7592).
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("invalid_client_metadata: {0}")]
    InvalidClientMetadata(String),

    #[error("invalid_redirect_uri: {0}")]
    InvalidRedirectUri(String),

    #[error("invalid registration access token")]
    Unauthorized,

    #[error("client not found")]
    NotFound,

    #[error("temporarily unavailable")]
    Unavailable,

    #[error("server_error: {0}")]
    ServerError(String),
}

impl IntoResponse for RegistrationError {
    fn into_response(self) -> Response {
        let (status, code, description): (StatusCode, &str, Option<String>) = match &self {
            RegistrationError::InvalidClientMetadata(d) => (
                StatusCode::BAD_REQUEST,
                "invalid_client_metadata",
                Some(d.clone()),
            ),
            RegistrationError::InvalidRedirectUri(d) => (
                StatusCode::BAD_REQUEST,
                "invalid_redirect_uri",
                Some(d.clone()),
            ),
            RegistrationError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "invalid_token", None)
            }
            RegistrationError::NotFound => (StatusCode::NOT_FOUND, "not_found", None),
            RegistrationError::Unavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "temporarily_unavailable", None)
            }
            RegistrationError::ServerError(d) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "server_error", Some(d.clone()))
            }
        };

        let body = Json(OAuthErrorResponse::new(code, description));
        let mut response = (status, body).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert("retry-after", HeaderValue::from_static("2"));
        }
        response
    }
}

/// Errors from the state store backing. Never crosses the HTTP boundary
/// directly — callers fold it into `OAuthError::Unavailable` /
/// `RegistrationError::Unavailable` or `ServerError` at the component edge.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state store unavailable")]
    Unavailable,

    #[error("state store value could not be (de)serialized: {0}")]
    Serialization(String),
}

impl From<StoreError> for OAuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable => OAuthError::Unavailable,
            StoreError::Serialization(msg) => OAuthError::ServerError(msg),
        }
    }
}

impl From<StoreError> for RegistrationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable => RegistrationError::Unavailable,
            StoreError::Serialization(msg) => RegistrationError::ServerError(msg),
        }
    }
}

/// Errors from the `/verify` endpoint. Distinct from `OAuthError` because
/// `/verify` never redirects — but it does talk to the store (one lookup,
/// to check the access token hasn't been revoked), so a store outage must
/// still surface as `Unavailable`, not as an invalid token.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("missing or malformed bearer token")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    Expired,

    #[error("state store unavailable")]
    Unavailable,
}

impl From<StoreError> for VerifyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable => VerifyError::Unavailable,
            StoreError::Serialization(_) => VerifyError::InvalidToken,
        }
    }
}

impl IntoResponse for VerifyError {
    fn into_response(self) -> Response {
        if matches!(self, VerifyError::Unavailable) {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            response
                .headers_mut()
                .insert("retry-after", HeaderValue::from_static("2"));
            return response;
        }

        let reason = match self {
            VerifyError::MissingToken => "invalid_request",
            VerifyError::InvalidToken => "invalid_token",
            VerifyError::Expired => "invalid_token",
            VerifyError::Unavailable => unreachable!(),
        };
        let mut response = StatusCode::UNAUTHORIZED.into_response();
        response.headers_mut().insert(
            "www-authenticate",
            HeaderValue::from_str(&format!("Bearer realm=\"mcp\", error=\"{reason}\""))
                .unwrap_or_else(|_| HeaderValue::from_static("Bearer realm=\"mcp\"")),
        );
        response
    }
}
