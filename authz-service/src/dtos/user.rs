//! User management DTOs.

use serde::Deserialize;
use validator::Validate;

use crate::models::Role;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: Role,
    pub display_name: Option<String>,
}

/// Profile update.
///
/// `org_id` and `role` are listed so a tamper attempt gets an explicit
/// field-level rejection instead of being silently dropped; any other
/// unknown field fails deserialization outright.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 120, message = "Display name too long"))]
    pub display_name: Option<String>,
    pub org_id: Option<serde_json::Value>,
    pub role: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}
