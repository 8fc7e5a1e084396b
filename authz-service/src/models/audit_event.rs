//! Audit event model - append-only security and compliance trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::Permission;

/// Audit event types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    AuthzDecision,
    LoginFailed,
    LoginLocked,
    LoginHardLocked,
    LockoutCleared,
    SessionRevoked,
    SessionsRevokedAll,
    PasswordChanged,
    UserCreated,
    UserDeactivated,
    RoleChanged,
    OrganizationCreated,
    OrganizationDeleted,
    OrganizationTransferred,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::AuthzDecision => "authz_decision",
            AuditEventType::LoginFailed => "login_failed",
            AuditEventType::LoginLocked => "login_locked",
            AuditEventType::LoginHardLocked => "login_hard_locked",
            AuditEventType::LockoutCleared => "lockout_cleared",
            AuditEventType::SessionRevoked => "session_revoked",
            AuditEventType::SessionsRevokedAll => "sessions_revoked_all",
            AuditEventType::PasswordChanged => "password_changed",
            AuditEventType::UserCreated => "user_created",
            AuditEventType::UserDeactivated => "user_deactivated",
            AuditEventType::RoleChanged => "role_changed",
            AuditEventType::OrganizationCreated => "organization_created",
            AuditEventType::OrganizationDeleted => "organization_deleted",
            AuditEventType::OrganizationTransferred => "organization_transferred",
        }
    }
}

/// Decision outcome recorded on authorization events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Allow,
    Deny,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Allow => "allow",
            AuditOutcome::Deny => "deny",
        }
    }
}

/// Audit event entity. Append-only; application code never mutates or
/// deletes rows.
#[derive(Debug, Clone, FromRow)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub org_id: Option<Uuid>,
    pub actor_user_id: Option<Uuid>,
    pub event_type_code: String,
    pub action: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<Uuid>,
    pub outcome: Option<String>,
    pub reason_code: Option<String>,
    pub ip_address: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl AuditEvent {
    /// Record an authorization decision.
    pub fn authz_decision(
        actor_user_id: Uuid,
        org_id: Uuid,
        permission: Permission,
        target_type: Option<&str>,
        target_id: Option<Uuid>,
        outcome: AuditOutcome,
        reason_code: Option<&str>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            org_id: Some(org_id),
            actor_user_id: Some(actor_user_id),
            event_type_code: AuditEventType::AuthzDecision.as_str().to_string(),
            action: Some(permission.as_str().to_string()),
            target_type: target_type.map(|s| s.to_string()),
            target_id,
            outcome: Some(outcome.as_str().to_string()),
            reason_code: reason_code.map(|s| s.to_string()),
            created_utc: Utc::now(),
            ip_address: None,
        }
    }

    /// Record a login-path event (no authenticated actor yet).
    pub fn login_event(
        event_type: AuditEventType,
        identifier: &str,
        ip_address: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            org_id: None,
            actor_user_id: None,
            event_type_code: event_type.as_str().to_string(),
            action: Some(identifier.to_string()),
            target_type: None,
            target_id: None,
            outcome: Some(AuditOutcome::Deny.as_str().to_string()),
            reason_code: None,
            ip_address,
            created_utc: Utc::now(),
        }
    }

    /// Record a security-relevant action performed by an authenticated actor.
    pub fn actor_event(
        event_type: AuditEventType,
        actor_user_id: Uuid,
        org_id: Uuid,
        target_type: Option<&str>,
        target_id: Option<Uuid>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            org_id: Some(org_id),
            actor_user_id: Some(actor_user_id),
            event_type_code: event_type.as_str().to_string(),
            action: None,
            target_type: target_type.map(|s| s.to_string()),
            target_id,
            outcome: Some(AuditOutcome::Allow.as_str().to_string()),
            reason_code: None,
            ip_address: None,
            created_utc: Utc::now(),
        }
    }
}

/// Audit event response for API.
#[derive(Debug, Serialize)]
pub struct AuditEventResponse {
    pub event_id: Uuid,
    pub org_id: Option<Uuid>,
    pub actor_user_id: Option<Uuid>,
    pub event_type_code: String,
    pub action: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<Uuid>,
    pub outcome: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<AuditEvent> for AuditEventResponse {
    fn from(e: AuditEvent) -> Self {
        Self {
            event_id: e.event_id,
            org_id: e.org_id,
            actor_user_id: e.actor_user_id,
            event_type_code: e.event_type_code,
            action: e.action,
            target_type: e.target_type,
            target_id: e.target_id,
            outcome: e.outcome,
            created_utc: e.created_utc,
        }
    }
}
