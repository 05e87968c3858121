// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication flows: registration, local login, federated login.
//!
//! Handles:
//! - Registration with lazy role creation ("Client" by default)
//! - Local login via username-or-email + password
//! - Google federated login with user creation/reconciliation
//! - Token issuance shared by both login paths

use std::sync::Arc;

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{User, DEFAULT_ROLE};
use crate::services::google_oidc::{GoogleIdTokenVerifier, IdTokenPayload};
use crate::services::password;
use crate::services::token::TokenIssuer;

/// Registration input.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub role: Option<String>,
}

/// Orchestrates the three auth entry points over the identity store.
#[derive(Clone)]
pub struct AuthService {
    db: FirestoreDb,
    token_issuer: TokenIssuer,
    google_verifier: Arc<GoogleIdTokenVerifier>,
    allow_unverified_id_tokens: bool,
}

impl AuthService {
    pub fn new(
        db: FirestoreDb,
        token_issuer: TokenIssuer,
        google_verifier: Arc<GoogleIdTokenVerifier>,
        allow_unverified_id_tokens: bool,
    ) -> Self {
        Self {
            db,
            token_issuer,
            google_verifier,
            allow_unverified_id_tokens,
        }
    }

    // ─── Registration ────────────────────────────────────────────

    /// Register a new user and link it to a role.
    ///
    /// The role defaults to "Client" and is created on demand, so
    /// re-registering with the same new role name never fails on role
    /// creation. If role linkage fails after the user was created, the
    /// error is surfaced and the user is NOT rolled back.
    ///
    /// Returns the new user's ID.
    pub async fn register(&self, input: RegisterInput) -> Result<String, AppError> {
        let mut reasons = Vec::new();

        if input.username.trim().is_empty() {
            reasons.push("username must not be empty".to_string());
        }
        if input.email.trim().is_empty() {
            reasons.push("email must not be empty".to_string());
        }
        if let Some(msg) = password::policy_violation(&input.password) {
            reasons.push(msg);
        }

        if !reasons.is_empty() {
            return Err(AppError::Validation(reasons.join(", ")));
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: input.username,
            email: input.email,
            password_hash: Some(password::hash_password(&input.password)?),
            first_name: input.first_name.unwrap_or_default(),
            last_name: input.last_name.unwrap_or_default(),
            phone: input.phone,
            date_of_birth: input.date_of_birth,
            email_confirmed: false,
            roles: Vec::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        // The store rejects duplicate usernames/emails with the joined
        // reasons; nothing is persisted in that case.
        self.db.create_user(&user).await?;

        let role = input
            .role
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string());

        self.db.ensure_role(&role).await?;
        self.db.add_role(&user.id, &role).await?;

        tracing::info!(user_id = %user.id, username = %user.username, role = %role, "Registered user");

        Ok(user.id)
    }

    // ─── Local Login ─────────────────────────────────────────────

    /// Authenticate with username-or-email + password; returns a token.
    ///
    /// An identifier containing `@` is looked up by email, anything else
    /// by username. This is a routing heuristic, not email validation: a
    /// malformed address simply fails to match.
    pub async fn login(&self, identifier: &str, plain_password: &str) -> Result<String, AppError> {
        let user = if identifier.contains('@') {
            self.db.find_user_by_email(identifier).await?
        } else {
            self.db.find_user_by_username(identifier).await?
        };

        let Some(user) = user else {
            return Err(AppError::invalid_credentials());
        };

        let verified = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| password::verify_password(plain_password, hash));

        if !verified {
            return Err(AppError::invalid_credentials());
        }

        self.token_issuer.issue(&user)
    }

    // ─── Federated Login ─────────────────────────────────────────

    /// Authenticate with an externally-issued ID token; returns a token.
    ///
    /// Every failure in this flow, whatever its cause, surfaces as a
    /// single TokenValidation error carrying the original message.
    pub async fn google_login(&self, id_token: &str) -> Result<String, AppError> {
        self.google_login_inner(id_token).await.map_err(|e| {
            tracing::warn!(error = %e, "Federated login failed");
            match e {
                AppError::TokenValidation(msg) => AppError::TokenValidation(msg),
                other => AppError::TokenValidation(other.to_string()),
            }
        })
    }

    async fn google_login_inner(&self, id_token: &str) -> Result<String, AppError> {
        let payload = match self.google_verifier.verify(id_token).await {
            Ok(payload) => payload,
            Err(err) if self.allow_unverified_id_tokens => {
                let payload = GoogleIdTokenVerifier::decode_unverified(id_token)?;
                tracing::warn!(
                    email = %payload.email,
                    strict_error = %err,
                    "Accepting federated ID token WITHOUT signature verification \
                     (ALLOW_UNVERIFIED_ID_TOKENS is enabled)"
                );
                payload
            }
            Err(err) => return Err(err),
        };

        let user = match self.db.find_user_by_email(&payload.email).await? {
            None => self.create_federated_user(&payload).await?,
            Some(user) => self.backfill_names(user, &payload).await?,
        };

        self.token_issuer.issue(&user)
    }

    /// First federated login for this email: create the account.
    ///
    /// Username is the email address; there is no password credential.
    async fn create_federated_user(&self, payload: &IdTokenPayload) -> Result<User, AppError> {
        let (first_name, last_name) = names_from_payload(payload);

        let mut user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: payload.email.clone(),
            email: payload.email.clone(),
            password_hash: None,
            first_name,
            last_name,
            phone: None,
            date_of_birth: None,
            email_confirmed: payload.email_verified,
            roles: Vec::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        self.db.create_user(&user).await?;
        self.db.ensure_role(DEFAULT_ROLE).await?;
        self.db.add_role(&user.id, DEFAULT_ROLE).await?;
        user.roles = self.db.get_roles(&user.id).await?;

        tracing::info!(
            user_id = %user.id,
            email = %user.email,
            "Created user from federated login"
        );

        Ok(user)
    }

    /// Returning federated login: backfill name fields only when empty,
    /// and write back only if something actually changed.
    async fn backfill_names(
        &self,
        mut user: User,
        payload: &IdTokenPayload,
    ) -> Result<User, AppError> {
        let (first_name, last_name) = names_from_payload(payload);
        let mut needs_update = false;

        if user.first_name.is_empty() && !first_name.is_empty() {
            user.first_name = first_name;
            needs_update = true;
        }
        if user.last_name.is_empty() && !last_name.is_empty() {
            user.last_name = last_name;
            needs_update = true;
        }

        if needs_update {
            self.db.update_user(&user).await?;
        }

        Ok(user)
    }
}

/// Resolve given/family names from the payload, falling back to splitting
/// the display name: first token is the given name, the remainder the
/// family name.
fn names_from_payload(payload: &IdTokenPayload) -> (String, String) {
    let (split_given, split_family) = payload
        .name
        .as_deref()
        .map(split_display_name)
        .unwrap_or_default();

    let given = payload.given_name.clone().unwrap_or(split_given);
    let family = payload.family_name.clone().unwrap_or(split_family);

    (given, family)
}

fn split_display_name(name: &str) -> (String, String) {
    let mut parts = name.split_whitespace();
    let given = parts.next().unwrap_or("").to_string();
    let family = parts.collect::<Vec<_>>().join(" ");
    (given, family)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(
        name: Option<&str>,
        given_name: Option<&str>,
        family_name: Option<&str>,
    ) -> IdTokenPayload {
        IdTokenPayload {
            email: "bob@example.com".to_string(),
            email_verified: true,
            name: name.map(str::to_string),
            given_name: given_name.map(str::to_string),
            family_name: family_name.map(str::to_string),
            subject: "sub-1".to_string(),
        }
    }

    #[test]
    fn test_split_display_name() {
        assert_eq!(
            split_display_name("Bob Jones"),
            ("Bob".to_string(), "Jones".to_string())
        );
        assert_eq!(
            split_display_name("Bob van der Berg"),
            ("Bob".to_string(), "van der Berg".to_string())
        );
        assert_eq!(split_display_name("Bob"), ("Bob".to_string(), String::new()));
        assert_eq!(split_display_name(""), (String::new(), String::new()));
    }

    #[test]
    fn test_names_prefer_explicit_claims() {
        let (given, family) = names_from_payload(&payload(
            Some("Display Name"),
            Some("Robert"),
            Some("Jones"),
        ));
        assert_eq!(given, "Robert");
        assert_eq!(family, "Jones");
    }

    #[test]
    fn test_names_fall_back_to_display_name() {
        let (given, family) = names_from_payload(&payload(Some("Bob Jones"), None, None));
        assert_eq!(given, "Bob");
        assert_eq!(family, "Jones");
    }

    #[test]
    fn test_names_empty_when_nothing_supplied() {
        let (given, family) = names_from_payload(&payload(None, None, None));
        assert_eq!(given, "");
        assert_eq!(family, "");
    }
}
