//! Organization model - the tenant isolation unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Organization state codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationState {
    Active,
    Deleted,
}

impl OrganizationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationState::Active => "active",
            OrganizationState::Deleted => "deleted",
        }
    }
}

/// Organization entity.
///
/// Deletion is a soft state change; rows are kept while sessions or audit
/// records still reference them.
#[derive(Debug, Clone, FromRow)]
pub struct Organization {
    pub org_id: Uuid,
    pub org_name: String,
    pub org_state_code: String,
    pub created_utc: DateTime<Utc>,
}

impl Organization {
    /// Create a new active organization.
    pub fn new(org_name: String) -> Self {
        Self {
            org_id: Uuid::new_v4(),
            org_name,
            org_state_code: OrganizationState::Active.as_str().to_string(),
            created_utc: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.org_state_code == OrganizationState::Active.as_str()
    }
}

/// Organization response for API.
#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    pub org_id: Uuid,
    pub org_name: String,
    pub org_state_code: String,
    pub created_utc: DateTime<Utc>,
}

impl From<Organization> for OrganizationResponse {
    fn from(o: Organization) -> Self {
        Self {
            org_id: o.org_id,
            org_name: o.org_name,
            org_state_code: o.org_state_code,
            created_utc: o.created_utc,
        }
    }
}
