//! User model - tenant-scoped accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::Role;

/// User entity.
///
/// Accounts are deactivated (`is_active = false`) rather than deleted so the
/// audit trail keeps resolving actor ids. A user row belongs to exactly one
/// organization; membership in a second organization is a second row.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role_code: String,
    pub display_name: Option<String>,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
}

impl User {
    /// Create a new active user.
    pub fn new(
        org_id: Uuid,
        email: String,
        password_hash: String,
        role: Role,
        display_name: Option<String>,
    ) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            org_id,
            email: email.to_lowercase(),
            password_hash,
            role_code: role.as_str().to_string(),
            display_name,
            is_active: true,
            created_utc: Utc::now(),
        }
    }

    /// Parse the stored role code. `None` means the row is corrupt.
    pub fn role(&self) -> Option<Role> {
        self.role_code.parse().ok()
    }

    /// Convert to sanitized response (no credential hash).
    pub fn sanitized(&self) -> UserResponse {
        UserResponse::from(self.clone())
    }
}

/// User response for API (without sensitive fields).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub email: String,
    pub role: String,
    pub display_name: Option<String>,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            org_id: u.org_id,
            email: u.email,
            role: u.role_code,
            display_name: u.display_name,
            is_active: u.is_active,
            created_utc: u.created_utc,
        }
    }
}
