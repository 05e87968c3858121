// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer-token issuance for authenticated sessions.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::User;

/// Fixed token validity window, not configurable per call.
pub const TOKEN_LIFETIME_SECS: usize = 60 * 60;

/// Claims carried by session tokens.
///
/// This is the canonical format shared between issuance and the auth
/// middleware; both sides decode/encode exactly this struct.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Per-issuance unique ID; two tokens for the same user never collide
    pub jti: String,
    /// Role names embedded for authorization checks downstream
    #[serde(default)]
    pub roles: Vec<String>,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

/// Issues signed session tokens from a symmetric key.
#[derive(Clone)]
pub struct TokenIssuer {
    signing_key: Vec<u8>,
    issuer: String,
    audience: String,
}

impl TokenIssuer {
    pub fn new(config: &Config) -> Self {
        Self {
            signing_key: config.jwt_signing_key.clone(),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
        }
    }

    /// Issue a signed token for a resolved identity and its current roles.
    ///
    /// Tokens are never cached or deduplicated; every call produces a
    /// fresh `jti`, so issuances at different instants always differ.
    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
            .as_secs() as usize;

        let claims = SessionClaims {
            sub: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            jti: Uuid::new_v4().to_string(),
            roles: user.roles.clone(),
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.signing_key),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Token signing failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn test_user() -> User {
        User {
            id: "user-1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: None,
            first_name: "Alice".to_string(),
            last_name: "Smith".to_string(),
            phone: None,
            date_of_birth: None,
            email_confirmed: true,
            roles: vec!["Client".to_string()],
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn test_issuer() -> TokenIssuer {
        TokenIssuer::new(&Config::default())
    }

    #[test]
    fn test_issue_and_decode() {
        let config = Config::default();
        let token = test_issuer().issue(&test_user()).unwrap();

        let key = DecodingKey::from_secret(&config.jwt_signing_key);
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.jwt_issuer]);
        validation.set_audience(&[&config.jwt_audience]);

        let decoded = decode::<SessionClaims>(&token, &key, &validation).unwrap();

        assert_eq!(decoded.claims.sub, "user-1");
        assert_eq!(decoded.claims.username, "alice");
        assert_eq!(decoded.claims.email, "alice@example.com");
        assert_eq!(decoded.claims.roles, vec!["Client".to_string()]);
        assert_eq!(decoded.claims.exp, decoded.claims.iat + TOKEN_LIFETIME_SECS);
    }

    #[test]
    fn test_sequential_issuances_differ() {
        let issuer = test_issuer();
        let user = test_user();

        let first = issuer.issue(&user).unwrap();
        let second = issuer.issue(&user).unwrap();

        // Same identity, same roles: the jti claim still forces distinct tokens
        assert_ne!(first, second);
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let config = Config::default();
        let token = test_issuer().issue(&test_user()).unwrap();

        let key = DecodingKey::from_secret(&config.jwt_signing_key);
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.jwt_issuer]);
        validation.set_audience(&["some-other-service"]);

        assert!(decode::<SessionClaims>(&token, &key, &validation).is_err());
    }
}
