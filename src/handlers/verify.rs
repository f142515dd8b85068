//! `GET|POST /verify` — the ForwardAuth target. Traefik (or any compatible
//! reverse proxy) forwards the original request's headers here before
//! letting it through to a gated backend.

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::config::AppState;
use crate::services::verify_request;

pub async fn verify_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match verify_request(&state.store, &state.keys, auth_header).await {
        Ok(identity) => {
            let mut response = axum::http::StatusCode::OK.into_response();
            let headers = response.headers_mut();
            if let Ok(v) = HeaderValue::from_str(&identity.user_id) {
                headers.insert("x-user-id", v);
            }
            if let Ok(v) = HeaderValue::from_str(&identity.user_name) {
                headers.insert("x-user-name", v);
            }
            if let Ok(v) = HeaderValue::from_str(&identity.bearer_token) {
                headers.insert("x-auth-token", v);
            }
            response
        }
        Err(e) => e.into_response(),
    }
}
