//! Lockout service - drives the failed-login state machine.
//!
//! Sits in front of the login entry point only. While an identifier is
//! locked, every attempt gets the same rate-limit answer regardless of
//! credential correctness, so "wrong password" and "right password but
//! locked" are indistinguishable to a caller.

use chrono::Utc;
use std::sync::Arc;

use crate::models::{AuditEvent, AuditEventType, LockState, LockoutPolicy};
use crate::services::audit::AuditService;
use crate::services::error::ServiceError;
use crate::store::AttemptStore;

#[derive(Clone)]
pub struct LockoutService {
    attempts: Arc<dyn AttemptStore>,
    policy: LockoutPolicy,
    audit: AuditService,
}

impl LockoutService {
    pub fn new(attempts: Arc<dyn AttemptStore>, policy: LockoutPolicy, audit: AuditService) -> Self {
        Self {
            attempts,
            policy,
            audit,
        }
    }

    /// Reject the attempt if the identifier is currently locked.
    pub async fn check(&self, identifier: &str) -> Result<(), ServiceError> {
        let now = Utc::now();
        let Some(attempt) = self.attempts.find_attempt(identifier).await? else {
            return Ok(());
        };

        match attempt.state(&self.policy, now) {
            LockState::Locked { until } => {
                let retry_after = (until - now).num_seconds().max(0) as u64;
                Err(ServiceError::RateLimited {
                    retry_after: Some(retry_after),
                })
            }
            LockState::HardLocked => Err(ServiceError::RateLimited { retry_after: None }),
            LockState::Normal | LockState::Warning(_) => Ok(()),
        }
    }

    /// Record a failed attempt and audit any lock transition.
    pub async fn record_failure(
        &self,
        identifier: &str,
        ip_address: Option<String>,
    ) -> Result<LockState, ServiceError> {
        let attempt = self
            .attempts
            .record_failure(identifier, &self.policy, Utc::now())
            .await?;
        let state = attempt.state(&self.policy, Utc::now());

        self.audit.log_async(AuditEvent::login_event(
            AuditEventType::LoginFailed,
            identifier,
            ip_address.clone(),
        ));

        match state {
            LockState::Locked { .. } if attempt.fail_count as u32 == self.policy.soft_threshold => {
                tracing::warn!(identifier = %identifier, "Login identifier soft-locked");
                self.audit.log_async(AuditEvent::login_event(
                    AuditEventType::LoginLocked,
                    identifier,
                    ip_address,
                ));
            }
            LockState::HardLocked if attempt.fail_count as u32 == self.policy.hard_threshold => {
                tracing::warn!(identifier = %identifier, "Login identifier hard-locked");
                self.audit.log_async(AuditEvent::login_event(
                    AuditEventType::LoginHardLocked,
                    identifier,
                    ip_address,
                ));
            }
            _ => {}
        }

        Ok(state)
    }

    /// Reset the counter after a successful login.
    pub async fn record_success(&self, identifier: &str) -> Result<(), ServiceError> {
        self.attempts.clear_attempts(identifier).await?;
        Ok(())
    }

    /// Out-of-band unlock: clears any lock, including a hard lock.
    pub async fn unlock(&self, identifier: &str, ip_address: Option<String>) -> Result<(), ServiceError> {
        self.attempts.clear_attempts(identifier).await?;
        tracing::info!(identifier = %identifier, "Lockout cleared");
        self.audit.log_async(AuditEvent::login_event(
            AuditEventType::LockoutCleared,
            identifier,
            ip_address,
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AuthStore, MemoryAttemptStore, MemoryStore};

    fn service() -> LockoutService {
        let store = Arc::new(MemoryStore::new()) as Arc<dyn AuthStore>;
        LockoutService::new(
            Arc::new(MemoryAttemptStore::new()),
            LockoutPolicy::default(),
            AuditService::new(store),
        )
    }

    #[tokio::test]
    async fn test_five_failures_lock_the_identifier() {
        let lockout = service();

        for _ in 0..4 {
            lockout.record_failure("a@x.test", None).await.unwrap();
            assert!(lockout.check("a@x.test").await.is_ok());
        }

        let state = lockout.record_failure("a@x.test", None).await.unwrap();
        assert!(state.is_locked());

        let err = lockout.check("a@x.test").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::RateLimited {
                retry_after: Some(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_success_resets_the_counter() {
        let lockout = service();

        for _ in 0..4 {
            lockout.record_failure("a@x.test", None).await.unwrap();
        }
        lockout.record_success("a@x.test").await.unwrap();

        // A fresh run of failures is required to lock again.
        for _ in 0..4 {
            lockout.record_failure("a@x.test", None).await.unwrap();
        }
        assert!(lockout.check("a@x.test").await.is_ok());

        let state = lockout.record_failure("a@x.test", None).await.unwrap();
        assert!(state.is_locked());
    }

    #[tokio::test]
    async fn test_unlock_clears_a_hard_lock() {
        let lockout = service();

        for _ in 0..10 {
            lockout.record_failure("a@x.test", None).await.unwrap();
        }
        assert!(matches!(
            lockout.check("a@x.test").await.unwrap_err(),
            ServiceError::RateLimited { retry_after: None }
        ));

        lockout.unlock("a@x.test", None).await.unwrap();
        assert!(lockout.check("a@x.test").await.is_ok());
    }

    #[tokio::test]
    async fn test_identifiers_do_not_interfere() {
        let lockout = service();

        for _ in 0..5 {
            lockout.record_failure("a@x.test", None).await.unwrap();
        }
        assert!(lockout.check("a@x.test").await.is_err());
        assert!(lockout.check("b@x.test").await.is_ok());
    }
}
