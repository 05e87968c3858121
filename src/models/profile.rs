// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Member profile model.

use serde::{Deserialize, Serialize};

/// Gym member profile stored in Firestore.
///
/// One profile per user account. Created by the member themselves, or by
/// an admin on behalf of a named user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberProfile {
    /// Generated UUID (also used as document ID)
    pub id: String,
    /// Owning user's ID
    pub user_id: String,
    /// Owning user's username (denormalized for display)
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub medical_info: Option<String>,
    /// When the member joined (RFC 3339)
    pub join_date: String,
}
