//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const ROLES: &str = "roles";
    pub const MEMBER_PROFILES: &str = "member_profiles";
}
