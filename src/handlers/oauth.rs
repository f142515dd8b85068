//! `GET /authorize`, `GET /callback`, `POST /token`, `POST /revoke`,
//! `POST /introspect`.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

use crate::config::AppState;
use crate::dto::oauth::{
    AuthorizationRequest, IntrospectRequest, IntrospectResponse, RevokeRequest, TokenRequest,
    TokenResponse,
};
use crate::error::OAuthError;
use crate::services::{AuthorizeOutcome, CallbackOutcome, ClientAuth};

pub async fn authorize_handler(
    State(state): State<AppState>,
    Query(req): Query<AuthorizationRequest>,
) -> Response {
    match state.engine().authorize(&req).await {
        AuthorizeOutcome::RedirectToIdp(url) => Redirect::to(&url).into_response(),
        AuthorizeOutcome::UntrustedRequest(reason) => {
            (StatusCode::BAD_REQUEST, Html(untrusted_request_page(&reason))).into_response()
        }
        AuthorizeOutcome::RedirectError {
            redirect_uri,
            error,
            description,
            state,
        } => Redirect::to(&error_redirect_url(&redirect_uri, error, &description, Some(&state))).into_response(),
    }
}

fn untrusted_request_page(reason: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>Authorization error</title></head>\
         <body><h1>Cannot authorize this request</h1><p>{}</p>\
         <p>Reconnect the application and try again.</p></body></html>",
        html_escape(reason)
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn error_redirect_url(redirect_uri: &str, error: &str, description: &str, state: Option<&str>) -> String {
    let mut url = redirect_uri.to_string();
    url.push_str(if url.contains('?') { "&" } else { "?" });
    url.push_str(&format!(
        "error={}&error_description={}",
        urlencoding::encode(error),
        urlencoding::encode(description)
    ));
    if let Some(s) = state {
        url.push_str(&format!("&state={}", urlencoding::encode(s)));
    }
    url
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

pub async fn callback_handler(State(state): State<AppState>, Query(params): Query<CallbackParams>) -> Response {
    match state.engine().callback(&params.code, &params.state).await {
        CallbackOutcome::Redirect(url) => Redirect::to(&url).into_response(),
        CallbackOutcome::RedirectError {
            redirect_uri,
            error,
            description,
            state,
        } => Redirect::to(&error_redirect_url(&redirect_uri, error, &description, state.as_deref())).into_response(),
        CallbackOutcome::BadRequest(description) => {
            OAuthError::InvalidRequest(description).into_response()
        }
    }
}

/// Resolve client credentials from HTTP Basic auth or the form body, per the
/// client's registered `token_endpoint_auth_method`.
fn basic_auth(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}

fn resolve_client_auth(
    headers: &HeaderMap,
    body_client_id: Option<&str>,
    body_client_secret: Option<&str>,
) -> Result<ClientAuth, OAuthError> {
    if let Some((client_id, client_secret)) = basic_auth(headers) {
        return Ok(ClientAuth {
            client_id,
            client_secret: Some(client_secret),
        });
    }

    let client_id = body_client_id
        .ok_or(OAuthError::InvalidClient)?
        .to_string();
    Ok(ClientAuth {
        client_id,
        client_secret: body_client_secret.map(str::to_string),
    })
}

fn invalid_client_response() -> Response {
    let mut response = OAuthError::InvalidClient.into_response();
    response.headers_mut().insert(
        "www-authenticate",
        HeaderValue::from_static("Basic realm=\"oauth\", error=\"invalid_client\""),
    );
    response
}

pub async fn token_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(req): Form<TokenRequest>,
) -> Response {
    let auth = match resolve_client_auth(&headers, req.client_id.as_deref(), req.client_secret.as_deref()) {
        Ok(auth) => auth,
        Err(_) => return invalid_client_response(),
    };

    let engine = state.engine();
    let client = match engine.authenticate_client(&auth).await {
        Ok(client) => client,
        Err(_) => return invalid_client_response(),
    };

    let result: Result<TokenResponse, OAuthError> = match req.grant_type.as_str() {
        "authorization_code" => {
            let code = req.code.ok_or_else(|| OAuthError::InvalidRequest("code is required".into()));
            let redirect_uri = req
                .redirect_uri
                .ok_or_else(|| OAuthError::InvalidRequest("redirect_uri is required".into()));
            let code_verifier = req
                .code_verifier
                .ok_or_else(|| OAuthError::InvalidRequest("code_verifier is required".into()));

            match (code, redirect_uri, code_verifier) {
                (Ok(code), Ok(redirect_uri), Ok(code_verifier)) => {
                    engine
                        .exchange_authorization_code(&client, &code, &redirect_uri, &code_verifier)
                        .await
                }
                (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => Err(e),
            }
        }
        "refresh_token" => match req.refresh_token {
            Some(refresh_token) => engine.refresh(&client, &refresh_token).await,
            None => Err(OAuthError::InvalidRequest("refresh_token is required".into())),
        },
        _ => Err(OAuthError::UnsupportedGrantType),
    };

    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn revoke_handler(State(state): State<AppState>, headers: HeaderMap, Form(req): Form<RevokeRequest>) -> Response {
    let auth = match resolve_client_auth(&headers, req.client_id.as_deref(), req.client_secret.as_deref()) {
        Ok(auth) => auth,
        Err(_) => return invalid_client_response(),
    };

    let engine = state.engine();
    let client = match engine.authenticate_client(&auth).await {
        Ok(client) => client,
        // Per RFC 7009, always return 200 regardless of client validity.
        Err(_) => return StatusCode::OK.into_response(),
    };

    let _ = engine.revoke(&client, &req.token).await;
    StatusCode::OK.into_response()
}

pub async fn introspect_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(req): Form<IntrospectRequest>,
) -> Response {
    let auth = match resolve_client_auth(&headers, req.client_id.as_deref(), req.client_secret.as_deref()) {
        Ok(auth) => auth,
        Err(_) => return invalid_client_response(),
    };

    let engine = state.engine();
    let client = match engine.authenticate_client(&auth).await {
        Ok(client) => client,
        Err(_) => return invalid_client_response(),
    };

    let response: IntrospectResponse = engine.introspect(&client, &req.token).await;
    Json(response).into_response()
}
