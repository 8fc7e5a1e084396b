//! In-memory store implementation.
//!
//! Backs unit and integration tests; mirrors the Postgres semantics,
//! including the active-email uniqueness guarantee (enforced under the map
//! write lock, so concurrent inserts cannot both pass the check).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    AuditEvent, LockoutPolicy, LoginAttempt, Organization, Session, User,
};
use crate::store::{AttemptStore, AuthStore, StoreError};

/// In-memory auth store.
#[derive(Default)]
pub struct MemoryStore {
    organizations: RwLock<HashMap<Uuid, Organization>>,
    users: RwLock<HashMap<Uuid, User>>,
    sessions: RwLock<HashMap<Uuid, Session>>,
    audit_events: RwLock<Vec<AuditEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn insert_organization(&self, org: &Organization) -> Result<(), StoreError> {
        let mut orgs = self.organizations.write().unwrap();
        if orgs.contains_key(&org.org_id) {
            return Err(StoreError::Conflict("organization already exists".into()));
        }
        orgs.insert(org.org_id, org.clone());
        Ok(())
    }

    async fn find_organization(&self, org_id: Uuid) -> Result<Option<Organization>, StoreError> {
        Ok(self.organizations.read().unwrap().get(&org_id).cloned())
    }

    async fn update_organization_name(&self, org_id: Uuid, name: &str) -> Result<(), StoreError> {
        if let Some(org) = self.organizations.write().unwrap().get_mut(&org_id) {
            org.org_name = name.to_string();
        }
        Ok(())
    }

    async fn update_organization_state(&self, org_id: Uuid, state: &str) -> Result<(), StoreError> {
        if let Some(org) = self.organizations.write().unwrap().get_mut(&org_id) {
            org.org_state_code = state.to_string();
        }
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().unwrap();
        let email = user.email.to_lowercase();
        if users
            .values()
            .any(|u| u.is_active && u.email.to_lowercase() == email)
        {
            return Err(StoreError::Conflict("user already exists".into()));
        }
        users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().unwrap().get(&user_id).cloned())
    }

    async fn find_active_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .find(|u| u.is_active && u.email.to_lowercase() == email)
            .cloned())
    }

    async fn list_users_in_org(&self, org_id: Uuid) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self
            .users
            .read()
            .unwrap()
            .values()
            .filter(|u| u.org_id == org_id)
            .cloned()
            .collect();
        users.sort_by_key(|u| u.created_utc);
        Ok(users)
    }

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        display_name: Option<String>,
    ) -> Result<(), StoreError> {
        if let Some(user) = self.users.write().unwrap().get_mut(&user_id) {
            user.display_name = display_name;
        }
        Ok(())
    }

    async fn update_user_role(&self, user_id: Uuid, role_code: &str) -> Result<(), StoreError> {
        if let Some(user) = self.users.write().unwrap().get_mut(&user_id) {
            user.role_code = role_code.to_string();
        }
        Ok(())
    }

    async fn update_user_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        if let Some(user) = self.users.write().unwrap().get_mut(&user_id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn deactivate_user(&self, user_id: Uuid) -> Result<(), StoreError> {
        if let Some(user) = self.users.write().unwrap().get_mut(&user_id) {
            user.is_active = false;
        }
        Ok(())
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions
            .write()
            .unwrap()
            .insert(session.session_id, session.clone());
        Ok(())
    }

    async fn find_session(&self, session_id: Uuid) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().unwrap().get(&session_id).cloned())
    }

    async fn revoke_session(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(session) = self.sessions.write().unwrap().get_mut(&session_id) {
            if session.revoked_utc.is_none() {
                session.revoked_utc = Some(at);
            }
        }
        Ok(())
    }

    async fn revoke_sessions_for_user(
        &self,
        user_id: Uuid,
        except: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut revoked = 0;
        for session in self.sessions.write().unwrap().values_mut() {
            if session.user_id == user_id
                && session.revoked_utc.is_none()
                && Some(session.session_id) != except
            {
                session.revoked_utc = Some(at);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn list_active_sessions(&self, user_id: Uuid) -> Result<Vec<Session>, StoreError> {
        let mut sessions: Vec<Session> = self
            .sessions
            .read()
            .unwrap()
            .values()
            .filter(|s| s.user_id == user_id && s.is_valid())
            .cloned()
            .collect();
        sessions.sort_by_key(|s| std::cmp::Reverse(s.issued_utc));
        Ok(sessions)
    }

    async fn insert_audit_event(&self, event: &AuditEvent) -> Result<(), StoreError> {
        self.audit_events.write().unwrap().push(event.clone());
        Ok(())
    }

    async fn list_audit_events(
        &self,
        org_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AuditEvent>, StoreError> {
        let events = self.audit_events.read().unwrap();
        let mut matching: Vec<AuditEvent> = events
            .iter()
            .filter(|e| e.org_id == Some(org_id))
            .cloned()
            .collect();
        matching.sort_by_key(|e| std::cmp::Reverse(e.created_utc));
        matching.truncate(limit.max(0) as usize);
        Ok(matching)
    }
}

/// In-memory attempt counter store.
#[derive(Default)]
pub struct MemoryAttemptStore {
    attempts: DashMap<String, LoginAttempt>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn record_failure(
        &self,
        identifier: &str,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<LoginAttempt, StoreError> {
        // Entry holds the shard lock for the whole read-modify-write.
        let mut entry = self
            .attempts
            .entry(identifier.to_string())
            .or_insert_with(|| LoginAttempt::new(identifier.to_string(), now));
        entry.register_failure(policy, now);
        Ok(entry.clone())
    }

    async fn find_attempt(&self, identifier: &str) -> Result<Option<LoginAttempt>, StoreError> {
        Ok(self.attempts.get(identifier).map(|a| a.clone()))
    }

    async fn clear_attempts(&self, identifier: &str) -> Result<(), StoreError> {
        self.attempts.remove(identifier);
        Ok(())
    }
}
