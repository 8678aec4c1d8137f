use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user_management::domain::value_objects::{Email, UserRole, Username};

/// A user account as kept in the user store.
///
/// The password hash is never serialized to prevent accidental exposure.
///
/// # Fields
///
/// * `id` - System-assigned identifier, never changes
/// * `username` - Unique, letters only
/// * `email` - Optional, normalized
/// * `password_hash` - Argon2id PHC string, or an unusable marker
/// * `role` - Admin, Manager or Employee
/// * `is_staff` / `is_superuser` - Set only by the superuser creation path
/// * `is_active` - Inactive accounts cannot authenticate
/// * `date_joined` - Creation timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: Username,
    pub email: Option<Email>,
    #[serde(skip)]
    pub password_hash: String,
    pub role: UserRole,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.username, self.role)
    }
}
