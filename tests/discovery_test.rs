//! `/.well-known/oauth-authorization-server`, `/jwks`, `/health`, `/ready`.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

#[tokio::test]
async fn health_is_always_ok() {
    let state = common::test_state().await;
    let app = mcp_gateway_auth::create_router(state);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn ready_reports_ok_when_store_reachable() {
    let state = common::test_state().await;
    let app = mcp_gateway_auth::create_router(state);

    let response = app
        .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn discovery_document_has_expected_shape() {
    let state = common::test_state().await;
    let app = mcp_gateway_auth::create_router(state);

    let response = app
        .oneshot(
            Request::get("/.well-known/oauth-authorization-server")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["issuer"], "https://auth.example.test");
    assert_eq!(json["authorization_endpoint"], "https://auth.example.test/authorize");
    assert_eq!(json["token_endpoint"], "https://auth.example.test/token");
    assert_eq!(json["registration_endpoint"], "https://auth.example.test/register");
    assert!(json["code_challenge_methods_supported"]
        .as_array()
        .unwrap()
        .contains(&Value::String("S256".to_string())));
    assert!(!json["code_challenge_methods_supported"]
        .as_array()
        .unwrap()
        .contains(&Value::String("plain".to_string())));
}

#[tokio::test]
async fn jwks_exposes_current_signing_key() {
    let state = common::test_state().await;
    let app = mcp_gateway_auth::create_router(state);

    let response = app
        .oneshot(Request::get("/jwks").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();

    let keys = json["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0]["kty"], "RSA");
    assert_eq!(keys[0]["alg"], "RS256");
}
