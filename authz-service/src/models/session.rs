//! Session model - server-side session rows backing issued tokens.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Session entity.
///
/// The row is authoritative: token signature validity alone never grants
/// access. Bound to one (user, organization) pair for its whole lifetime.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub token_hash: String,
    pub issued_utc: DateTime<Utc>,
    pub expiry_utc: DateTime<Utc>,
    pub revoked_utc: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a new session with the given TTL.
    pub fn new(user_id: Uuid, org_id: Uuid, token_hash: String, ttl_minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            org_id,
            token_hash,
            issued_utc: now,
            expiry_utc: now + Duration::minutes(ttl_minutes),
            revoked_utc: None,
        }
    }

    /// Check if session is valid (not expired, not revoked).
    pub fn is_valid(&self) -> bool {
        self.revoked_utc.is_none() && self.expiry_utc > Utc::now()
    }

    pub fn is_expired(&self) -> bool {
        self.expiry_utc <= Utc::now()
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_utc.is_some()
    }
}

/// Session info for API responses.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub issued_utc: DateTime<Utc>,
    pub expiry_utc: DateTime<Utc>,
    pub is_current: bool,
}

impl From<Session> for SessionInfo {
    fn from(s: Session) -> Self {
        Self {
            session_id: s.session_id,
            issued_utc: s.issued_utc,
            expiry_utc: s.expiry_utc,
            is_current: false, // Set by caller
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_session_is_valid() {
        let session = Session::new(Uuid::new_v4(), Uuid::new_v4(), "hash".into(), 60);
        assert!(session.is_valid());
        assert!(!session.is_expired());
        assert!(!session.is_revoked());
    }

    #[test]
    fn test_revoked_session_is_invalid() {
        let mut session = Session::new(Uuid::new_v4(), Uuid::new_v4(), "hash".into(), 60);
        session.revoked_utc = Some(Utc::now());
        assert!(!session.is_valid());
        assert!(session.is_revoked());
    }

    #[test]
    fn test_expired_session_is_invalid() {
        let mut session = Session::new(Uuid::new_v4(), Uuid::new_v4(), "hash".into(), 60);
        session.expiry_utc = Utc::now() - Duration::minutes(1);
        assert!(!session.is_valid());
        assert!(session.is_expired());
    }
}
