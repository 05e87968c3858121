// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Federated ID-token verification tests.
//!
//! Uses the static-key verifier mode so no network JWKS fetch happens;
//! tokens are minted with a test RSA key whose public half the verifier
//! trusts under a fixed kid.

mod common;

use gymdesk_api::config::Config;
use gymdesk_api::error::AppError;
use gymdesk_api::services::GoogleIdTokenVerifier;
use jsonwebtoken::{encode, Algorithm, Header};
use std::time::{SystemTime, UNIX_EPOCH};

fn now_secs() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

fn mint_id_token(claims: &serde_json::Value, kid: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &common::test_encoding_key()).unwrap()
}

fn google_claims(config: &Config, email: Option<&str>) -> serde_json::Value {
    let mut claims = serde_json::json!({
        "iss": "https://accounts.google.com",
        "aud": config.google_client_id,
        "sub": "109876543210",
        "exp": now_secs() + 600,
        "iat": now_secs(),
        "email_verified": true,
        "name": "Bob Jones",
        "given_name": "Bob",
        "family_name": "Jones",
    });
    if let Some(email) = email {
        claims["email"] = serde_json::json!(email);
    }
    claims
}

#[tokio::test]
async fn test_valid_token_verifies() {
    let config = Config::default();
    let verifier = common::test_verifier(&config);

    let token = mint_id_token(&google_claims(&config, Some("bob@example.com")), common::TEST_KID);
    let payload = verifier.verify(&token).await.expect("token should verify");

    assert_eq!(payload.email, "bob@example.com");
    assert!(payload.email_verified);
    assert_eq!(payload.given_name.as_deref(), Some("Bob"));
    assert_eq!(payload.family_name.as_deref(), Some("Jones"));
    assert_eq!(payload.subject, "109876543210");
}

#[tokio::test]
async fn test_wrong_audience_rejected() {
    let config = Config::default();
    let verifier = common::test_verifier(&config);

    let mut claims = google_claims(&config, Some("bob@example.com"));
    claims["aud"] = serde_json::json!("some-other-client-id");

    let token = mint_id_token(&claims, common::TEST_KID);
    let err = verifier.verify(&token).await.unwrap_err();

    assert!(matches!(err, AppError::TokenValidation(_)));
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let config = Config::default();
    let verifier = common::test_verifier(&config);

    let mut claims = google_claims(&config, Some("bob@example.com"));
    // Well past the 60 s clock-skew leeway
    claims["exp"] = serde_json::json!(now_secs() - 600);

    let token = mint_id_token(&claims, common::TEST_KID);
    let err = verifier.verify(&token).await.unwrap_err();

    assert!(matches!(err, AppError::TokenValidation(_)));
}

#[tokio::test]
async fn test_unknown_kid_rejected() {
    let config = Config::default();
    let verifier = common::test_verifier(&config);

    let token = mint_id_token(&google_claims(&config, Some("bob@example.com")), "other-kid");
    let err = verifier.verify(&token).await.unwrap_err();

    assert!(matches!(err, AppError::TokenValidation(_)));
}

#[tokio::test]
async fn test_missing_email_is_format_error() {
    let config = Config::default();
    let verifier = common::test_verifier(&config);

    let token = mint_id_token(&google_claims(&config, None), common::TEST_KID);
    let err = verifier.verify(&token).await.unwrap_err();

    assert!(matches!(err, AppError::TokenFormat(_)));
}

#[tokio::test]
async fn test_unverified_decode_extracts_claims() {
    let config = Config::default();

    // Firebase-style token: different issuer and audience, signed under a
    // kid the verifier does not know. Strict verification must fail; the
    // unverified decode still surfaces the claims.
    let claims = serde_json::json!({
        "iss": "https://securetoken.google.com/some-project",
        "aud": "some-project",
        "sub": "firebase-uid-1",
        "exp": now_secs() + 600,
        "email": "carol@example.com",
        "email_verified": false,
        "name": "Carol de Winter",
    });
    let token = mint_id_token(&claims, "firebase-kid");

    let verifier = common::test_verifier(&config);
    assert!(verifier.verify(&token).await.is_err());

    let payload = GoogleIdTokenVerifier::decode_unverified(&token).unwrap();
    assert_eq!(payload.email, "carol@example.com");
    assert!(!payload.email_verified);
    assert_eq!(payload.name.as_deref(), Some("Carol de Winter"));
}

#[test]
fn test_unverified_decode_rejects_garbage() {
    let err = GoogleIdTokenVerifier::decode_unverified("not-a-jwt").unwrap_err();
    assert!(matches!(err, AppError::TokenFormat(_)));
}

#[test]
fn test_unverified_decode_requires_email() {
    let claims = serde_json::json!({
        "iss": "https://securetoken.google.com/some-project",
        "aud": "some-project",
        "sub": "firebase-uid-2",
        "exp": now_secs() + 600,
        "name": "No Email",
    });
    let token = mint_id_token(&claims, "firebase-kid");

    let err = GoogleIdTokenVerifier::decode_unverified(&token).unwrap_err();
    assert!(matches!(err, AppError::TokenFormat(_)));
}
