//! Session manager - issuance, validation, and revocation.

use chrono::Utc;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::models::{Role, Session, User};
use crate::services::error::ServiceError;
use crate::services::token::{hash_token, TokenError, TokenService};
use crate::store::AuthStore;

/// The authenticated actor a request runs as.
///
/// Resolved from a validated session; fixed to the (user, organization)
/// pair the session was minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorContext {
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub role: Role,
    pub session_id: Uuid,
}

/// Session manager over the injected store.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn AuthStore>,
    tokens: TokenService,
}

impl SessionService {
    pub fn new(store: Arc<dyn AuthStore>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    pub fn token_ttl_seconds(&self) -> i64 {
        self.tokens.ttl_seconds()
    }

    /// Issue a new session for a user. Multiple concurrent sessions per
    /// user are permitted.
    pub async fn issue(&self, user: &User) -> Result<(String, Session), ServiceError> {
        let session_id = Uuid::new_v4();
        let token = self
            .tokens
            .mint(user.user_id, user.org_id, session_id)
            .map_err(ServiceError::Internal)?;

        let mut session = Session::new(
            user.user_id,
            user.org_id,
            hash_token(&token),
            self.tokens.ttl_minutes(),
        );
        session.session_id = session_id;

        self.store.insert_session(&session).await?;

        tracing::info!(user_id = %user.user_id, session_id = %session.session_id, "Session issued");

        Ok((token, session))
    }

    /// Validate a presented token.
    ///
    /// The signature gates entry, but the session row is authoritative:
    /// revocation and expiry are re-read from the store, and the user must
    /// still be active.
    pub async fn validate(&self, token: &str) -> Result<ActorContext, ServiceError> {
        let claims = self.tokens.verify(token).map_err(|e| match e {
            TokenError::InvalidSignature => ServiceError::InvalidSignature,
            TokenError::Expired => ServiceError::ExpiredOrRevoked,
        })?;

        let session = self
            .store
            .find_session(claims.sid)
            .await?
            .ok_or(ServiceError::ExpiredOrRevoked)?;

        if !session.is_valid() {
            return Err(ServiceError::ExpiredOrRevoked);
        }

        // The row must match the token it was minted with, and the claims
        // must agree with the row. Any mismatch is treated as tampering.
        let presented = hash_token(token);
        let bound: bool = presented
            .as_bytes()
            .ct_eq(session.token_hash.as_bytes())
            .into();
        if !bound || session.user_id != claims.sub || session.org_id != claims.org {
            return Err(ServiceError::InvalidSignature);
        }

        let user = self
            .store
            .find_user(session.user_id)
            .await?
            .ok_or(ServiceError::ExpiredOrRevoked)?;

        if !user.is_active {
            return Err(ServiceError::InactiveUser);
        }

        let role = user
            .role()
            .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("corrupt role code")))?;

        Ok(ActorContext {
            user_id: user.user_id,
            org_id: session.org_id,
            role,
            session_id: session.session_id,
        })
    }

    /// Revoke one session (logout).
    pub async fn revoke(&self, session_id: Uuid) -> Result<(), ServiceError> {
        self.store.revoke_session(session_id, Utc::now()).await?;
        tracing::info!(session_id = %session_id, "Session revoked");
        Ok(())
    }

    /// Revoke all of a user's sessions except the current one
    /// ("log out other devices"). Returns the number revoked.
    pub async fn revoke_all_except(
        &self,
        user_id: Uuid,
        current: Uuid,
    ) -> Result<u64, ServiceError> {
        let revoked = self
            .store
            .revoke_sessions_for_user(user_id, Some(current), Utc::now())
            .await?;
        Ok(revoked)
    }

    /// Revoke every session for a user, the current one included. Used by
    /// password changes, which force re-authentication everywhere.
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let revoked = self
            .store
            .revoke_sessions_for_user(user_id, None, Utc::now())
            .await?;
        Ok(revoked)
    }

    /// List the user's currently valid sessions.
    pub async fn list_active(&self, user_id: Uuid) -> Result<Vec<Session>, ServiceError> {
        Ok(self.store.list_active_sessions(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::models::Organization;
    use crate::store::MemoryStore;

    fn tokens() -> TokenService {
        TokenService::new(&JwtConfig {
            secret: "0123456789abcdef0123456789abcdef".to_string(),
            session_ttl_minutes: 60,
        })
        .unwrap()
    }

    async fn seeded_service() -> (SessionService, Arc<MemoryStore>, User) {
        let store = Arc::new(MemoryStore::new());
        let org = Organization::new("acme".into());
        store.insert_organization(&org).await.unwrap();

        let user = User::new(org.org_id, "a@acme.test".into(), "hash".into(), Role::Owner, None);
        store.insert_user(&user).await.unwrap();

        let service = SessionService::new(store.clone() as Arc<dyn AuthStore>, tokens());
        (service, store, user)
    }

    #[tokio::test]
    async fn test_issue_then_validate() {
        let (service, _store, user) = seeded_service().await;

        let (token, session) = service.issue(&user).await.unwrap();
        let actor = service.validate(&token).await.unwrap();

        assert_eq!(actor.user_id, user.user_id);
        assert_eq!(actor.org_id, user.org_id);
        assert_eq!(actor.role, Role::Owner);
        assert_eq!(actor.session_id, session.session_id);
    }

    #[tokio::test]
    async fn test_revoked_session_rejected_while_sibling_survives() {
        let (service, _store, user) = seeded_service().await;

        let (token_a, session_a) = service.issue(&user).await.unwrap();
        let (token_b, _) = service.issue(&user).await.unwrap();

        service.revoke(session_a.session_id).await.unwrap();

        assert!(matches!(
            service.validate(&token_a).await.unwrap_err(),
            ServiceError::ExpiredOrRevoked
        ));
        assert!(service.validate(&token_b).await.is_ok());
    }

    #[tokio::test]
    async fn test_inactive_user_rejected() {
        let (service, store, user) = seeded_service().await;

        let (token, _) = service.issue(&user).await.unwrap();
        store.deactivate_user(user.user_id).await.unwrap();

        assert!(matches!(
            service.validate(&token).await.unwrap_err(),
            ServiceError::InactiveUser
        ));
    }

    #[tokio::test]
    async fn test_tampered_token_rejected() {
        let (service, _store, user) = seeded_service().await;
        let (token, _) = service.issue(&user).await.unwrap();

        let mut bytes = token.into_bytes();
        let mid = bytes.len() / 2;
        bytes[mid] = if bytes[mid] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(matches!(
            service.validate(&tampered).await.unwrap_err(),
            ServiceError::InvalidSignature
        ));
    }

    #[tokio::test]
    async fn test_revoke_all_hits_current_session_too() {
        let (service, _store, user) = seeded_service().await;

        let (token_a, _) = service.issue(&user).await.unwrap();
        let (token_b, _) = service.issue(&user).await.unwrap();

        let revoked = service.revoke_all(user.user_id).await.unwrap();
        assert_eq!(revoked, 2);

        assert!(service.validate(&token_a).await.is_err());
        assert!(service.validate(&token_b).await.is_err());
    }
}
