//! Dynamic client registration (RFC 7591) and management (RFC 7592).

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn register_then_fetch_then_delete() {
    let state = common::test_state().await;
    let app = mcp_gateway_auth::create_router(state);

    let register_response = app
        .clone()
        .oneshot(
            Request::post("/register")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "client_name": "Demo MCP Client",
                        "redirect_uris": ["https://client.example/callback"],
                        "foo_vendor_field": "kept-verbatim"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(register_response.status(), StatusCode::CREATED);
    let created = body_json(register_response).await;

    let client_id = created["client_id"].as_str().unwrap().to_string();
    let registration_access_token = created["registration_access_token"].as_str().unwrap().to_string();

    assert!(created["client_secret"].as_str().is_some());
    assert_eq!(created["foo_vendor_field"], "kept-verbatim");
    assert_eq!(created["token_endpoint_auth_method"], "client_secret_post");

    // Fetching without the registration token is rejected.
    let unauthorized = app
        .clone()
        .oneshot(
            Request::get(format!("/register/{client_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);
    assert!(unauthorized.headers().get("www-authenticate").is_some());

    // Fetching with it succeeds and never re-exposes the secret.
    let fetched = app
        .clone()
        .oneshot(
            Request::get(format!("/register/{client_id}"))
                .header("authorization", format!("Bearer {registration_access_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(fetched.status(), StatusCode::OK);
    let fetched_body = body_json(fetched).await;
    assert!(fetched_body["client_secret"].is_null());
    assert_eq!(fetched_body["foo_vendor_field"], "kept-verbatim");

    // Deleting with the registration token succeeds; the client is then gone.
    let deleted = app
        .clone()
        .oneshot(
            Request::delete(format!("/register/{client_id}"))
                .header("authorization", format!("Bearer {registration_access_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = app
        .oneshot(
            Request::get(format!("/register/{client_id}"))
                .header("authorization", format!("Bearer {registration_access_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn register_rejects_empty_redirect_uris() {
    let state = common::test_state().await;
    let app = mcp_gateway_auth::create_router(state);

    let response = app
        .oneshot(
            Request::post("/register")
                .header("content-type", "application/json")
                .body(Body::from(json!({"redirect_uris": []}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_rejects_non_local_http_redirect_uri() {
    let state = common::test_state().await;
    let app = mcp_gateway_auth::create_router(state);

    let response = app
        .oneshot(
            Request::post("/register")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"redirect_uris": ["http://not-localhost.example/callback"]}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn public_client_registration_has_no_secret() {
    let state = common::test_state().await;
    let app = mcp_gateway_auth::create_router(state);

    let response = app
        .oneshot(
            Request::post("/register")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "redirect_uris": ["http://localhost:8080/callback"],
                        "token_endpoint_auth_method": "none"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert!(body["client_secret"].is_null());
}
