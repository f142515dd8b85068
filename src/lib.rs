pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod keys;
pub mod models;
pub mod services;
pub mod state_store;
pub mod utils;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::time::Duration;
use tower_http::{cors::{Any, CorsLayer}, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppState;
use crate::handlers::{
    discovery::{discovery_handler, jwks_handler},
    oauth::{authorize_handler, callback_handler, introspect_handler, revoke_handler, token_handler},
    register::{delete_client_handler, get_client_handler, put_client_handler, register_handler},
    verify::verify_handler,
};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness check — verifies the state store is reachable.
async fn ready_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>, StatusCode> {
    state
        .store
        .ping()
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    Ok(Json(HealthResponse {
        status: "ready",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// Create the application router with all routes configured.
///
/// ## Public routes (no authentication required)
/// - `POST /register` — dynamic client registration (RFC 7591)
/// - `GET /authorize` — authorization endpoint
/// - `GET /callback` — upstream IdP callback
/// - `POST /token` — token endpoint
/// - `POST /revoke` — token revocation (RFC 7009)
/// - `POST /introspect` — token introspection (RFC 7662)
/// - `GET /jwks` — signing key publication (RFC 7517)
/// - `GET /.well-known/oauth-authorization-server` — discovery (RFC 8414)
///
/// ## Registration-token-authenticated routes (RFC 7592)
/// - `GET|PUT|DELETE /register/{client_id}`
///
/// ## ForwardAuth route
/// - `GET|POST /verify` — called by the reverse proxy on every gated request
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/register", axum::routing::post(register_handler))
        .route(
            "/register/:client_id",
            get(get_client_handler)
                .put(put_client_handler)
                .delete(delete_client_handler),
        )
        .route("/authorize", get(authorize_handler))
        .route("/callback", get(callback_handler))
        .route("/token", axum::routing::post(token_handler))
        .route("/revoke", axum::routing::post(revoke_handler))
        .route("/introspect", axum::routing::post(introspect_handler))
        .route("/verify", get(verify_handler).post(verify_handler))
        .route("/jwks", get(jwks_handler))
        .route(
            "/.well-known/oauth-authorization-server",
            get(discovery_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .max_age(Duration::from_secs(3600)),
        )
        .with_state(state)
}
