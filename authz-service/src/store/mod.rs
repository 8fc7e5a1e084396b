//! Storage layer - injected store interfaces.
//!
//! Handlers and services hold `Arc<dyn AuthStore>` / `Arc<dyn AttemptStore>`
//! so tests can swap in the in-memory implementation per run. Uniqueness of
//! one active account per email is the store's guarantee, not an
//! application-level check-then-insert.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AuditEvent, LockoutPolicy, LoginAttempt, Organization, Session, User};

pub use memory::{MemoryAttemptStore, MemoryStore};
pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistent store for organizations, users, sessions, and audit events.
#[async_trait]
pub trait AuthStore: Send + Sync {
    // Organizations
    async fn insert_organization(&self, org: &Organization) -> Result<(), StoreError>;
    async fn find_organization(&self, org_id: Uuid) -> Result<Option<Organization>, StoreError>;
    async fn update_organization_name(&self, org_id: Uuid, name: &str) -> Result<(), StoreError>;
    async fn update_organization_state(&self, org_id: Uuid, state: &str) -> Result<(), StoreError>;

    // Users
    /// Insert a user; duplicate active email yields `StoreError::Conflict`.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_active_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn list_users_in_org(&self, org_id: Uuid) -> Result<Vec<User>, StoreError>;
    async fn update_user_profile(
        &self,
        user_id: Uuid,
        display_name: Option<String>,
    ) -> Result<(), StoreError>;
    async fn update_user_role(&self, user_id: Uuid, role_code: &str) -> Result<(), StoreError>;
    async fn update_user_password(&self, user_id: Uuid, password_hash: &str)
        -> Result<(), StoreError>;
    async fn deactivate_user(&self, user_id: Uuid) -> Result<(), StoreError>;

    // Sessions
    async fn insert_session(&self, session: &Session) -> Result<(), StoreError>;
    async fn find_session(&self, session_id: Uuid) -> Result<Option<Session>, StoreError>;
    async fn revoke_session(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;
    /// Revoke every session for a user, optionally sparing one. Returns the
    /// number of sessions revoked.
    async fn revoke_sessions_for_user(
        &self,
        user_id: Uuid,
        except: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
    async fn list_active_sessions(&self, user_id: Uuid) -> Result<Vec<Session>, StoreError>;

    // Audit events (append-only)
    async fn insert_audit_event(&self, event: &AuditEvent) -> Result<(), StoreError>;
    async fn list_audit_events(
        &self,
        org_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AuditEvent>, StoreError>;
}

/// Store for login-attempt counters.
///
/// `record_failure` must be atomic: two concurrent failures for the same
/// identifier must both be counted.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn record_failure(
        &self,
        identifier: &str,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<LoginAttempt, StoreError>;

    async fn find_attempt(&self, identifier: &str) -> Result<Option<LoginAttempt>, StoreError>;

    /// Reset the counter (successful login or explicit unlock).
    async fn clear_attempts(&self, identifier: &str) -> Result<(), StoreError>;
}
