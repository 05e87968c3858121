// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod google_oidc;
pub mod password;
pub mod token;

pub use auth::{AuthService, RegisterInput};
pub use google_oidc::{GoogleIdTokenVerifier, IdTokenPayload};
pub use token::{SessionClaims, TokenIssuer, TOKEN_LIFETIME_SECS};
