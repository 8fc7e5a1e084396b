//! PostgreSQL store implementation.
//!
//! Plain sqlx queries; the partial unique index on active user emails backs
//! the signup race (see migrations), and attempt counters are advanced under
//! a row lock so concurrent failures cannot under-count.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{
    AuditEvent, LockoutPolicy, LoginAttempt, Organization, Session, User,
};
use crate::store::{AttemptStore, AuthStore, StoreError};

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_insert_err(e: sqlx::Error, what: &str) -> StoreError {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(format!("{} already exists", what))
            }
            _ => StoreError::Database(e),
        }
    }
}

#[async_trait]
impl AuthStore for PostgresStore {
    async fn insert_organization(&self, org: &Organization) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO organizations (org_id, org_name, org_state_code, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(org.org_id)
        .bind(&org.org_name)
        .bind(&org.org_state_code)
        .bind(org.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_insert_err(e, "organization"))?;
        Ok(())
    }

    async fn find_organization(&self, org_id: Uuid) -> Result<Option<Organization>, StoreError> {
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE org_id = $1")
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Database)
    }

    async fn update_organization_name(&self, org_id: Uuid, name: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE organizations SET org_name = $1 WHERE org_id = $2")
            .bind(name)
            .bind(org_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database)?;
        Ok(())
    }

    async fn update_organization_state(&self, org_id: Uuid, state: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE organizations SET org_state_code = $1 WHERE org_id = $2")
            .bind(state)
            .bind(org_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database)?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users
                (user_id, org_id, email, password_hash, role_code, display_name, is_active, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.user_id)
        .bind(user.org_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.role_code)
        .bind(&user.display_name)
        .bind(user.is_active)
        .bind(user.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_insert_err(e, "user"))?;
        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Database)
    }

    async fn find_active_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(email) = LOWER($1) AND is_active = TRUE",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::Database)
    }

    async fn list_users_in_org(&self, org_id: Uuid) -> Result<Vec<User>, StoreError> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE org_id = $1 ORDER BY created_utc ASC",
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Database)
    }

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        display_name: Option<String>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET display_name = $1 WHERE user_id = $2")
            .bind(display_name)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database)?;
        Ok(())
    }

    async fn update_user_role(&self, user_id: Uuid, role_code: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET role_code = $1 WHERE user_id = $2")
            .bind(role_code)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database)?;
        Ok(())
    }

    async fn update_user_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE user_id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database)?;
        Ok(())
    }

    async fn deactivate_user(&self, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET is_active = FALSE WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database)?;
        Ok(())
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions
                (session_id, user_id, org_id, token_hash, issued_utc, expiry_utc, revoked_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session.session_id)
        .bind(session.user_id)
        .bind(session.org_id)
        .bind(&session.token_hash)
        .bind(session.issued_utc)
        .bind(session.expiry_utc)
        .bind(session.revoked_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_insert_err(e, "session"))?;
        Ok(())
    }

    async fn find_session(&self, session_id: Uuid) -> Result<Option<Session>, StoreError> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Database)
    }

    async fn revoke_session(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE sessions SET revoked_utc = $1 WHERE session_id = $2 AND revoked_utc IS NULL",
        )
        .bind(at)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Database)?;
        Ok(())
    }

    async fn revoke_sessions_for_user(
        &self,
        user_id: Uuid,
        except: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET revoked_utc = $1
            WHERE user_id = $2
              AND revoked_utc IS NULL
              AND ($3::uuid IS NULL OR session_id <> $3)
            "#,
        )
        .bind(at)
        .bind(user_id)
        .bind(except)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Database)?;
        Ok(result.rows_affected())
    }

    async fn list_active_sessions(&self, user_id: Uuid) -> Result<Vec<Session>, StoreError> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE user_id = $1 AND revoked_utc IS NULL AND expiry_utc > NOW()
            ORDER BY issued_utc DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Database)
    }

    async fn insert_audit_event(&self, event: &AuditEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO audit_events
                (event_id, org_id, actor_user_id, event_type_code, action,
                 target_type, target_id, outcome, reason_code, ip_address, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(event.event_id)
        .bind(event.org_id)
        .bind(event.actor_user_id)
        .bind(&event.event_type_code)
        .bind(&event.action)
        .bind(&event.target_type)
        .bind(event.target_id)
        .bind(&event.outcome)
        .bind(&event.reason_code)
        .bind(&event.ip_address)
        .bind(event.created_utc)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Database)?;
        Ok(())
    }

    async fn list_audit_events(
        &self,
        org_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AuditEvent>, StoreError> {
        sqlx::query_as::<_, AuditEvent>(
            r#"
            SELECT * FROM audit_events
            WHERE org_id = $1
            ORDER BY created_utc DESC
            LIMIT $2
            "#,
        )
        .bind(org_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Database)
    }
}

#[async_trait]
impl AttemptStore for PostgresStore {
    async fn record_failure(
        &self,
        identifier: &str,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<LoginAttempt, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::Database)?;

        // Make sure the row exists, then take its lock. Going through the
        // row lock for every failure means two concurrent attempts always
        // see each other's increments.
        sqlx::query(
            r#"
            INSERT INTO login_attempts (identifier, fail_count, window_start_utc, updated_utc)
            VALUES ($1, 0, $2, $2)
            ON CONFLICT (identifier) DO NOTHING
            "#,
        )
        .bind(identifier)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::Database)?;

        let mut attempt = sqlx::query_as::<_, LoginAttempt>(
            "SELECT * FROM login_attempts WHERE identifier = $1 FOR UPDATE",
        )
        .bind(identifier)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::Database)?;

        attempt.register_failure(policy, now);

        sqlx::query(
            r#"
            UPDATE login_attempts SET
                fail_count = $2,
                window_start_utc = $3,
                locked_until_utc = $4,
                hard_locked = $5,
                updated_utc = $6
            WHERE identifier = $1
            "#,
        )
        .bind(&attempt.identifier)
        .bind(attempt.fail_count)
        .bind(attempt.window_start_utc)
        .bind(attempt.locked_until_utc)
        .bind(attempt.hard_locked)
        .bind(attempt.updated_utc)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::Database)?;

        tx.commit().await.map_err(StoreError::Database)?;
        Ok(attempt)
    }

    async fn find_attempt(&self, identifier: &str) -> Result<Option<LoginAttempt>, StoreError> {
        sqlx::query_as::<_, LoginAttempt>("SELECT * FROM login_attempts WHERE identifier = $1")
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Database)
    }

    async fn clear_attempts(&self, identifier: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM login_attempts WHERE identifier = $1")
            .bind(identifier)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database)?;
        Ok(())
    }
}
