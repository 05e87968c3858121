//! User and role models for storage and API.

use serde::{Deserialize, Serialize};

/// Role automatically assigned when registration supplies none, and on
/// federated first-login.
pub const DEFAULT_ROLE: &str = "Client";

/// Role whose claim permits acting on behalf of other users.
pub const ADMIN_ROLE: &str = "Admin";

/// User account stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Generated UUID (also used as document ID)
    pub id: String,
    /// Login name, unique across the store
    pub username: String,
    /// Email address, unique across the store
    pub email: String,
    /// Argon2 password hash (None for federated-only accounts)
    pub password_hash: Option<String>,
    /// First name (empty if never provided)
    #[serde(default)]
    pub first_name: String,
    /// Last name (empty if never provided)
    #[serde(default)]
    pub last_name: String,
    /// Phone number
    pub phone: Option<String>,
    /// Date of birth (ISO 8601 date)
    pub date_of_birth: Option<String>,
    /// Whether the email address has been confirmed
    #[serde(default)]
    pub email_confirmed: bool,
    /// Assigned role names
    #[serde(default)]
    pub roles: Vec<String>,
    /// When the account was created (RFC 3339, server-set)
    pub created_at: String,
}

/// Role document. Roles are created lazily the first time they are
/// assigned, so existence must be ensured before any linkage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Role name (also used as document ID)
    pub name: String,
    /// When the role was first created (RFC 3339)
    pub created_at: String,
}
