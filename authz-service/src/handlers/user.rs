//! User management handlers, gated by the decision engine.
//!
//! By-id endpoints mask cross-tenant denials as 404 so a guessable user id
//! never confirms an account exists in another tenant.

use authz_core::error::AppError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::dtos::auth::MessageResponse;
use crate::dtos::user::{ChangeRoleRequest, CreateUserRequest, UpdateProfileRequest};
use crate::middleware::CurrentActor;
use crate::models::{AuditEvent, AuditEventType, Permission, User};
use crate::services::{ResourceRef, ServiceError, TenantVisibility};
use crate::utils::{hash_password, Password, ValidatedJson};
use crate::AppState;

/// Build the engine's view of a user row.
fn user_resource(user: &User) -> Result<ResourceRef, ServiceError> {
    let role = user
        .role()
        .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("corrupt role code")))?;
    Ok(ResourceRef::scoped(user.user_id, user.org_id).with_target_role(role))
}

/// Reject writes to fields the caller may never set on this endpoint.
fn reject_protected_fields(req: &UpdateProfileRequest) -> Result<(), ServiceError> {
    if req.org_id.is_some() {
        return Err(ServiceError::Validation(
            "org_id: field is immutable".to_string(),
        ));
    }
    if req.role.is_some() {
        return Err(ServiceError::Validation(
            "role: field cannot be changed through this endpoint".to_string(),
        ));
    }
    Ok(())
}

/// Current actor's profile.
///
/// GET /users/me
pub async fn me(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .store
        .find_user(actor.user_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound)?;

    Ok(Json(user.sanitized()))
}

/// Update the actor's own profile.
///
/// PATCH /users/me
pub async fn update_me(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    reject_protected_fields(&req)?;

    let user = state
        .store
        .find_user(actor.user_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound)?;

    state
        .authorizer
        .authorize(&actor, Permission::UsersEdit, Some(&user_resource(&user)?))
        .require(TenantVisibility::Hidden)?;

    if let Some(display_name) = req.display_name {
        state
            .store
            .update_user_profile(actor.user_id, Some(display_name))
            .await
            .map_err(ServiceError::from)?;
    }

    let user = state
        .store
        .find_user(actor.user_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound)?;

    Ok(Json(user.sanitized()))
}

/// Create a user in the actor's organization.
///
/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let password_hash = hash_password(&Password::new(req.password))
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Password hashing error: {}", e)))?;

    let user = User::new(
        actor.org_id,
        req.email,
        password_hash.into_string(),
        req.role,
        req.display_name,
    );

    let resource = ResourceRef::scoped(user.user_id, actor.org_id).with_new_role(req.role);
    state
        .authorizer
        .authorize(&actor, Permission::UsersCreate, Some(&resource))
        .require(TenantVisibility::Visible)?;

    state
        .store
        .insert_user(&user)
        .await
        .map_err(ServiceError::from)?;

    tracing::info!(user_id = %user.user_id, org_id = %actor.org_id, "User created");

    state.audit.log_async(AuditEvent::actor_event(
        AuditEventType::UserCreated,
        actor.user_id,
        actor.org_id,
        Some("user"),
        Some(user.user_id),
    ));

    Ok((StatusCode::CREATED, Json(user.sanitized())))
}

/// Fetch a user by id.
///
/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .store
        .find_user(user_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound)?;

    state
        .authorizer
        .authorize(&actor, Permission::UsersView, Some(&user_resource(&user)?))
        .require(TenantVisibility::Hidden)?;

    Ok(Json(user.sanitized()))
}

/// Update a user's profile fields.
///
/// PATCH /users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(user_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    reject_protected_fields(&req)?;

    let user = state
        .store
        .find_user(user_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound)?;

    state
        .authorizer
        .authorize(&actor, Permission::UsersEdit, Some(&user_resource(&user)?))
        .require(TenantVisibility::Hidden)?;

    if let Some(display_name) = req.display_name {
        state
            .store
            .update_user_profile(user_id, Some(display_name))
            .await
            .map_err(ServiceError::from)?;
    }

    let user = state
        .store
        .find_user(user_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound)?;

    Ok(Json(user.sanitized()))
}

/// Deactivate a user and revoke their sessions.
///
/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .store
        .find_user(user_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound)?;

    state
        .authorizer
        .authorize(&actor, Permission::UsersDelete, Some(&user_resource(&user)?))
        .require(TenantVisibility::Hidden)?;

    state
        .store
        .deactivate_user(user_id)
        .await
        .map_err(ServiceError::from)?;
    state.sessions.revoke_all(user_id).await?;

    tracing::info!(user_id = %user_id, actor = %actor.user_id, "User deactivated");

    state.audit.log_async(AuditEvent::actor_event(
        AuditEventType::UserDeactivated,
        actor.user_id,
        actor.org_id,
        Some("user"),
        Some(user_id),
    ));

    Ok(Json(MessageResponse::new("User deactivated")))
}

/// Reassign a user's role, subject to the privilege-rank rules.
///
/// PATCH /users/{id}/role
pub async fn change_role(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(user_id): Path<Uuid>,
    Json(req): Json<ChangeRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .store
        .find_user(user_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound)?;

    let resource = user_resource(&user)?.with_new_role(req.role);
    state
        .authorizer
        .authorize(&actor, Permission::UsersEdit, Some(&resource))
        .require(TenantVisibility::Hidden)?;

    state
        .store
        .update_user_role(user_id, req.role.as_str())
        .await
        .map_err(ServiceError::from)?;

    tracing::info!(
        user_id = %user_id,
        new_role = %req.role,
        actor = %actor.user_id,
        "Role changed"
    );

    state.audit.log_async(AuditEvent::actor_event(
        AuditEventType::RoleChanged,
        actor.user_id,
        actor.org_id,
        Some("user"),
        Some(user_id),
    ));

    let user = state
        .store
        .find_user(user_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound)?;

    Ok(Json(user.sanitized()))
}
