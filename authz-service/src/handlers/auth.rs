//! Auth handlers: signup, login, logout, session management, lockout reset.

use authz_core::error::AppError;
use authz_core::middleware::ClientIp;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::dtos::auth::{
    ChangePasswordRequest, LoginRequest, LoginResponse, LogoutOthersResponse, MessageResponse,
    SessionsResponse, SignupRequest, SignupResponse, TokenResponse, UnlockRequest,
};
use crate::middleware::CurrentActor;
use crate::models::{
    AuditEvent, AuditEventType, Organization, OrganizationState, Permission, Role, SessionInfo,
    User,
};
use crate::services::{ServiceError, TenantVisibility};
use crate::utils::{hash_password, verify_password, Password, PasswordHashString, ValidatedJson};
use crate::AppState;

/// Organization signup. The first user becomes the owner.
///
/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let org = Organization::new(req.organization_name);

    let password_hash = hash_password(&Password::new(req.password))
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Password hashing error: {}", e)))?;

    let user = User::new(
        org.org_id,
        req.email,
        password_hash.into_string(),
        Role::Owner,
        req.display_name,
    );

    state
        .store
        .insert_organization(&org)
        .await
        .map_err(ServiceError::from)?;

    // The store's uniqueness guarantee decides the email race; on loss,
    // retire the freshly created organization so it cannot dangle.
    if let Err(e) = state.store.insert_user(&user).await {
        let _ = state
            .store
            .update_organization_state(org.org_id, OrganizationState::Deleted.as_str())
            .await;
        return Err(AppError::from(ServiceError::from(e)));
    }

    tracing::info!(org_id = %org.org_id, user_id = %user.user_id, "Organization signed up");

    let mut event = AuditEvent::actor_event(
        AuditEventType::OrganizationCreated,
        user.user_id,
        org.org_id,
        Some("organization"),
        Some(org.org_id),
    );
    event.ip_address = Some(ip);
    state.audit.log_async(event);

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            organization: org.into(),
            user: user.sanitized(),
        }),
    ))
}

/// Login with email and password.
///
/// The lockout check runs before credential verification, so a locked
/// identifier sees the same 429 whether or not the password is right.
///
/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let identifier = req.email.trim().to_lowercase();

    state.lockout.check(&identifier).await?;

    let user = match state
        .store
        .find_active_user_by_email(&identifier)
        .await
        .map_err(ServiceError::from)?
    {
        Some(user) => user,
        None => {
            state
                .lockout
                .record_failure(&identifier, Some(ip))
                .await?;
            return Err(ServiceError::InvalidCredentials.into());
        }
    };

    let org = state
        .store
        .find_organization(user.org_id)
        .await
        .map_err(ServiceError::from)?;
    if !org.map_or(false, |o| o.is_active()) {
        state
            .lockout
            .record_failure(&identifier, Some(ip))
            .await?;
        return Err(ServiceError::InvalidCredentials.into());
    }

    if verify_password(
        &Password::new(req.password),
        &PasswordHashString::new(user.password_hash.clone()),
    )
    .is_err()
    {
        state
            .lockout
            .record_failure(&identifier, Some(ip))
            .await?;
        return Err(ServiceError::InvalidCredentials.into());
    }

    state.lockout.record_success(&identifier).await?;

    let (token, _session) = state.sessions.issue(&user).await?;

    tracing::info!(user_id = %user.user_id, "User logged in");

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            user: user.sanitized(),
            tokens: TokenResponse::new(token, state.sessions.token_ttl_seconds()),
        }),
    ))
}

/// Revoke the current session.
///
/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.revoke(actor.session_id).await?;

    state.audit.log_async(AuditEvent::actor_event(
        AuditEventType::SessionRevoked,
        actor.user_id,
        actor.org_id,
        Some("session"),
        Some(actor.session_id),
    ));

    Ok(Json(MessageResponse::new("Logged out successfully")))
}

/// Revoke every other session for the actor ("log out other devices").
///
/// POST /auth/logout-others
pub async fn logout_others(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<impl IntoResponse, AppError> {
    let revoked = state
        .sessions
        .revoke_all_except(actor.user_id, actor.session_id)
        .await?;

    state.audit.log_async(AuditEvent::actor_event(
        AuditEventType::SessionsRevokedAll,
        actor.user_id,
        actor.org_id,
        Some("user"),
        Some(actor.user_id),
    ));

    Ok(Json(LogoutOthersResponse {
        revoked_sessions: revoked,
    }))
}

/// List the actor's active sessions.
///
/// GET /auth/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<impl IntoResponse, AppError> {
    let sessions = state.sessions.list_active(actor.user_id).await?;

    let sessions = sessions
        .into_iter()
        .map(|s| {
            let is_current = s.session_id == actor.session_id;
            let mut info = SessionInfo::from(s);
            info.is_current = is_current;
            info
        })
        .collect();

    Ok(Json(SessionsResponse { sessions }))
}

/// Change the actor's password. Revokes every session, the current one
/// included; all devices must re-authenticate.
///
/// POST /auth/password
pub async fn change_password(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .store
        .find_user(actor.user_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound)?;

    verify_password(
        &Password::new(req.current_password),
        &PasswordHashString::new(user.password_hash.clone()),
    )
    .map_err(|_| ServiceError::InvalidCredentials)?;

    let new_hash = hash_password(&Password::new(req.new_password))
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Password hashing error: {}", e)))?;

    state
        .store
        .update_user_password(actor.user_id, new_hash.as_str())
        .await
        .map_err(ServiceError::from)?;

    state.sessions.revoke_all(actor.user_id).await?;

    tracing::info!(user_id = %actor.user_id, "Password changed, all sessions revoked");

    state.audit.log_async(AuditEvent::actor_event(
        AuditEventType::PasswordChanged,
        actor.user_id,
        actor.org_id,
        Some("user"),
        Some(actor.user_id),
    ));

    Ok(Json(MessageResponse::new(
        "Password changed. Please sign in again.",
    )))
}

/// Reset the lockout counter for an identifier.
///
/// Requires a tenant-wide `users.edit` grant (admin and above); stands in
/// for the out-of-band unlock confirmation.
///
/// POST /auth/unlock
pub async fn unlock(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<UnlockRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .authorizer
        .authorize(&actor, Permission::UsersEdit, None)
        .require(TenantVisibility::Visible)?;

    let identifier = req.identifier.trim().to_lowercase();
    state.lockout.unlock(&identifier, Some(ip)).await?;

    Ok(Json(MessageResponse::new("Lockout cleared")))
}
