// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::MemberProfile;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/profiles", get(list_profiles).post(create_profile))
        .route("/api/profiles/me", get(get_my_profile))
}

// ─── Member Profiles ─────────────────────────────────────────

/// Member profile response.
#[derive(Serialize)]
pub struct MemberProfileResponse {
    pub id: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub medical_info: Option<String>,
    pub join_date: String,
}

impl From<MemberProfile> for MemberProfileResponse {
    fn from(profile: MemberProfile) -> Self {
        Self {
            id: profile.id,
            username: profile.username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            emergency_contact_name: profile.emergency_contact_name,
            emergency_contact_phone: profile.emergency_contact_phone,
            medical_info: profile.medical_info,
            join_date: profile.join_date,
        }
    }
}

/// List all member profiles.
async fn list_profiles(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Vec<MemberProfileResponse>>> {
    let profiles = state.db.list_profiles().await?;

    Ok(Json(profiles.into_iter().map(Into::into).collect()))
}

/// Get the caller's own member profile.
async fn get_my_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MemberProfileResponse>> {
    let profile = state
        .db
        .get_profile_for_user(&user.user_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("Member profile not found for current user".to_string())
        })?;

    Ok(Json(profile.into()))
}

#[derive(Deserialize)]
pub struct CreateProfileRequest {
    /// Target username; honored only for callers with the "Admin" role
    /// claim, everyone else creates their own profile
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_phone: Option<String>,
    #[serde(default)]
    pub medical_info: Option<String>,
}

/// Create a member profile.
async fn create_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateProfileRequest>,
) -> Result<Json<MemberProfileResponse>> {
    let (target_user_id, target_username) = match req.username {
        Some(ref username) if user.is_admin() && !username.is_empty() => {
            let target = state
                .db
                .find_user_by_username(username)
                .await?
                .ok_or_else(|| AppError::BadRequest("User not found".to_string()))?;
            (target.id, target.username)
        }
        _ => (user.user_id.clone(), user.username.clone()),
    };

    if state
        .db
        .get_profile_for_user(&target_user_id)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest(
            "Member profile already exists for this user".to_string(),
        ));
    }

    let profile = MemberProfile {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: target_user_id,
        username: target_username,
        first_name: req.first_name,
        last_name: req.last_name,
        emergency_contact_name: req.emergency_contact_name,
        emergency_contact_phone: req.emergency_contact_phone,
        medical_info: req.medical_info,
        join_date: chrono::Utc::now().to_rfc3339(),
    };

    state.db.insert_profile(&profile).await?;

    tracing::info!(
        profile_id = %profile.id,
        username = %profile.username,
        created_by = %user.username,
        "Created member profile"
    );

    Ok(Json(profile.into()))
}
