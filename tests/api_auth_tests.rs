// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Protected routes accept requests with valid tokens
//! 3. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use gymdesk_api::config::Config;
use gymdesk_api::models::User;
use gymdesk_api::services::TokenIssuer;
use tower::ServiceExt;

mod common;

/// Issue a real session token for a synthetic user.
fn create_test_token(config: &Config) -> String {
    let user = User {
        id: "11111111-0000-0000-0000-000000000001".to_string(),
        username: "testuser".to_string(),
        email: "testuser@example.com".to_string(),
        password_hash: None,
        first_name: String::new(),
        last_name: String::new(),
        phone: None,
        date_of_birth: None,
        email_confirmed: true,
        roles: vec!["Client".to_string()],
        created_at: "2026-01-01T00:00:00Z".to_string(),
    };

    TokenIssuer::new(config).issue(&user).unwrap()
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/profiles")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Should return 401 Unauthorized without token
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/profiles")
                .header(header::AUTHORIZATION, "Bearer invalid.token.here")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Should return 401 Unauthorized with invalid token
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_valid_token() {
    let (app, state) = common::create_test_app();
    let token = create_test_token(&state.config);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/profiles")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // With valid token: 200 if Firestore available, 500 with the offline
    // mock. The key check is that we DON'T get 401 (authentication
    // succeeded).
    let status = response.status();
    assert!(
        status == StatusCode::OK || status == StatusCode::INTERNAL_SERVER_ERROR,
        "Expected 200 or 500, got {}. Auth should pass, Firestore may fail offline.",
        status
    );
}

#[tokio::test]
async fn test_protected_route_with_cookie_token() {
    let (app, state) = common::create_test_app();
    let token = create_test_token(&state.config);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/profiles")
                .header(header::COOKIE, format!("gymdesk_token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    assert!(
        status == StatusCode::OK || status == StatusCode::INTERNAL_SERVER_ERROR,
        "Expected 200 or 500, got {}. Cookie auth should pass.",
        status
    );
}

#[tokio::test]
async fn test_expired_token_rejected() {
    use gymdesk_api::services::{SessionClaims, TOKEN_LIFETIME_SECS};
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let (app, state) = common::create_test_app();

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let iat = now - 2 * TOKEN_LIFETIME_SECS;

    let claims = SessionClaims {
        sub: "u1".to_string(),
        username: "testuser".to_string(),
        email: "testuser@example.com".to_string(),
        first_name: String::new(),
        last_name: String::new(),
        jti: "expired-token".to_string(),
        roles: vec![],
        iat,
        exp: iat + TOKEN_LIFETIME_SECS,
        iss: state.config.jwt_issuer.clone(),
        aud: state.config.jwt_audience.clone(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&state.config.jwt_signing_key),
    )
    .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/profiles")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/profiles")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // OPTIONS should return 200 (CORS preflight success)
    assert_eq!(response.status(), StatusCode::OK);

    // Should have CORS headers
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_public_route_no_auth_required() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Health should be accessible without auth
    assert_eq!(response.status(), StatusCode::OK);
}
