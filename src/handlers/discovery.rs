//! `GET /jwks`, `GET /.well-known/oauth-authorization-server`.

use axum::{extract::State, Json};

use crate::config::AppState;
use crate::dto::discovery::DiscoveryDocument;
use crate::keys::JwksDocument;

pub async fn jwks_handler(State(state): State<AppState>) -> Json<JwksDocument> {
    Json(state.keys.jwks())
}

pub async fn discovery_handler(State(state): State<AppState>) -> Json<DiscoveryDocument> {
    Json(DiscoveryDocument::new(&state.config.issuer_url))
}
