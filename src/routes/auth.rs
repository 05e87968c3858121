// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication routes: registration, local login, Google login.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::services::RegisterInput;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/google-login", post(google_login))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    /// Role to assign; defaults to "Client" when omitted
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: String,
}

/// Register a new account.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    let user_id = state
        .auth_service
        .register(RegisterInput {
            username: req.username,
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            date_of_birth: req.date_of_birth,
            role: req.role,
        })
        .await?;

    Ok(Json(RegisterResponse {
        message: "User registered successfully".to_string(),
        user_id,
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username, or email when the value contains `@`
    pub username_or_email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Local login with username-or-email + password.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let token = state
        .auth_service
        .login(&req.username_or_email, &req.password)
        .await?;

    Ok(Json(TokenResponse { token }))
}

#[derive(Deserialize)]
pub struct GoogleLoginRequest {
    pub id_token: String,
}

/// Federated login with a Google-issued ID token.
async fn google_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GoogleLoginRequest>,
) -> Result<Json<TokenResponse>> {
    let token = state.auth_service.google_login(&req.id_token).await?;

    Ok(Json(TokenResponse { token }))
}
