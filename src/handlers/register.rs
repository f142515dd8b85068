//! `POST /register`, `GET|PUT|DELETE /register/{client_id}` (RFC 7591/7592).

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::config::AppState;
use crate::dto::register::{ClientMetadata, ClientRegistrationResponse};
use crate::error::RegistrationError;

fn bearer_token(headers: &HeaderMap) -> Result<&str, RegistrationError> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(RegistrationError::Unauthorized)
}

fn unauthorized_response(err: RegistrationError) -> Response {
    let mut response = err.into_response();
    response
        .headers_mut()
        .insert("www-authenticate", HeaderValue::from_static("Bearer"));
    response
}

pub async fn register_handler(
    State(state): State<AppState>,
    Json(metadata): Json<ClientMetadata>,
) -> Result<(StatusCode, Json<ClientRegistrationResponse>), RegistrationError> {
    let registry = state.registry();
    let created = registry.register(metadata).await?;

    let registration_client_uri = format!(
        "https://{}/register/{}",
        state.config.base_domain, created.client.client_id
    );

    let body = ClientRegistrationResponse::from_client(
        &created.client,
        created.client_secret,
        Some(created.registration_access_token),
        Some(registration_client_uri),
    );

    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn get_client_handler(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let token = match bearer_token(&headers) {
        Ok(t) => t,
        Err(e) => return unauthorized_response(e),
    };

    match state.registry().authorize(&client_id, token).await {
        Ok(client) => (
            StatusCode::OK,
            Json(ClientRegistrationResponse::from_client(&client, None, None, None)),
        )
            .into_response(),
        Err(RegistrationError::Unauthorized) => unauthorized_response(RegistrationError::Unauthorized),
        Err(e) => e.into_response(),
    }
}

pub async fn put_client_handler(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    headers: HeaderMap,
    Json(metadata): Json<ClientMetadata>,
) -> Response {
    let token = match bearer_token(&headers) {
        Ok(t) => t,
        Err(e) => return unauthorized_response(e),
    };

    match state.registry().put(&client_id, token, metadata).await {
        Ok(client) => (
            StatusCode::OK,
            Json(ClientRegistrationResponse::from_client(&client, None, None, None)),
        )
            .into_response(),
        Err(RegistrationError::Unauthorized) => unauthorized_response(RegistrationError::Unauthorized),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_client_handler(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let token = match bearer_token(&headers) {
        Ok(t) => t,
        Err(e) => return unauthorized_response(e),
    };

    match state.registry().delete(&client_id, token).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(RegistrationError::Unauthorized) => unauthorized_response(RegistrationError::Unauthorized),
        Err(e) => e.into_response(),
    }
}
