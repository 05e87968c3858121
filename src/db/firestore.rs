// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed identity-store operations.
//!
//! Provides high-level operations for:
//! - Users (accounts, credentials, role memberships)
//! - Roles (created lazily before first assignment)
//! - Member profiles (the protected resource surface)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{MemberProfile, Role, User};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by their generated ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by their unique username.
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let username = username.to_string();
        let mut users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("username").eq(username.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.pop())
    }

    /// Find a user by their unique email address.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let mut users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.pop())
    }

    /// Create a new user, enforcing username and email uniqueness.
    ///
    /// Fails with a single validation error naming every violated
    /// constraint, joined with ", ".
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let mut reasons = Vec::new();

        if self.find_user_by_username(&user.username).await?.is_some() {
            reasons.push(format!("username '{}' is already taken", user.username));
        }

        if self.find_user_by_email(&user.email).await?.is_some() {
            reasons.push(format!("email '{}' is already registered", user.email));
        }

        if !reasons.is_empty() {
            return Err(AppError::Validation(reasons.join(", ")));
        }

        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Update an existing user document.
    pub async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Role Operations ─────────────────────────────────────────

    /// Ensure a role document exists, creating it if absent.
    ///
    /// Idempotent: re-running with the same name never errors.
    pub async fn ensure_role(&self, name: &str) -> Result<(), AppError> {
        let existing: Option<Role> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ROLES)
            .obj()
            .one(name)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if existing.is_some() {
            return Ok(());
        }

        let role = Role {
            name: name.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        // Two concurrent ensures for the same new role write identical
        // documents, so the upsert stays idempotent.
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ROLES)
            .document_id(&role.name)
            .object(&role)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(role = name, "Created role");
        Ok(())
    }

    /// Link a user to a role. The role must already exist (see
    /// [`FirestoreDb::ensure_role`]).
    pub async fn add_role(&self, user_id: &str, role: &str) -> Result<(), AppError> {
        let mut user = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        if user.roles.iter().any(|r| r == role) {
            return Ok(());
        }

        user.roles.push(role.to_string());
        self.update_user(&user).await
    }

    /// Get the current role names for a user.
    pub async fn get_roles(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let user = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        Ok(user.roles)
    }

    // ─── Member Profile Operations ───────────────────────────────

    /// Get the member profile belonging to a user, if any.
    pub async fn get_profile_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<MemberProfile>, AppError> {
        let user_id = user_id.to_string();
        let mut profiles: Vec<MemberProfile> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::MEMBER_PROFILES)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(profiles.pop())
    }

    /// List all member profiles.
    pub async fn list_profiles(&self) -> Result<Vec<MemberProfile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::MEMBER_PROFILES)
            .order_by([(
                "join_date",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a new member profile.
    pub async fn insert_profile(&self, profile: &MemberProfile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::MEMBER_PROFILES)
            .document_id(&profile.id)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
