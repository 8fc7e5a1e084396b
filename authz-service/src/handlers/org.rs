//! Organization-scoped handlers.
//!
//! These URLs already name the organization, so cross-tenant denials render
//! as plain 403s; existence of an organization id is not treated as secret.

use authz_core::error::AppError;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::dtos::auth::MessageResponse;
use crate::middleware::CurrentActor;
use crate::models::{
    audit_event::AuditEventResponse, AuditEvent, AuditEventType, OrganizationState, Permission,
    Role, UserResponse,
};
use crate::services::{ResourceRef, ServiceError, TenantVisibility};
use crate::utils::ValidatedJson;
use crate::AppState;

const AUDIT_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrganizationRequest {
    #[validate(length(min = 1, max = 120, message = "Organization name is required"))]
    pub org_name: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub new_owner_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct OrgUsersResponse {
    pub users: Vec<UserResponse>,
}

#[derive(Debug, Serialize)]
pub struct OrgAuditResponse {
    pub events: Vec<AuditEventResponse>,
}

/// List an organization's users.
///
/// GET /organizations/{id}/users
pub async fn list_users(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // Authorize on the path's organization before touching the store, so a
    // foreign org id learns nothing from timing or row counts.
    state
        .authorizer
        .authorize(
            &actor,
            Permission::UsersView,
            Some(&ResourceRef::scoped(org_id, org_id)),
        )
        .require(TenantVisibility::Visible)?;

    let users = state
        .store
        .list_users_in_org(org_id)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(OrgUsersResponse {
        users: users.into_iter().map(|u| u.sanitized()).collect(),
    }))
}

/// Read an organization's audit trail.
///
/// GET /organizations/{id}/audit
pub async fn list_audit(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .authorizer
        .authorize(
            &actor,
            Permission::AuditView,
            Some(&ResourceRef::scoped(org_id, org_id)),
        )
        .require(TenantVisibility::Visible)?;

    let events = state
        .store
        .list_audit_events(org_id, AUDIT_PAGE_LIMIT)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(OrgAuditResponse {
        events: events.into_iter().map(AuditEventResponse::from).collect(),
    }))
}

/// Rename an organization.
///
/// PATCH /organizations/{id}
pub async fn update_organization(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(org_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateOrganizationRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .authorizer
        .authorize(
            &actor,
            Permission::OrganizationEdit,
            Some(&ResourceRef::scoped(org_id, org_id)),
        )
        .require(TenantVisibility::Visible)?;

    let org = state
        .store
        .find_organization(org_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound)?;

    state
        .store
        .update_organization_name(org_id, &req.org_name)
        .await
        .map_err(ServiceError::from)?;

    let mut org = org;
    org.org_name = req.org_name;
    Ok(Json(crate::models::OrganizationResponse::from(org)))
}

/// Soft-delete an organization. Owner only.
///
/// DELETE /organizations/{id}
pub async fn delete_organization(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .authorizer
        .authorize(
            &actor,
            Permission::OrganizationDelete,
            Some(&ResourceRef::scoped(org_id, org_id)),
        )
        .require(TenantVisibility::Visible)?;

    state
        .store
        .update_organization_state(org_id, OrganizationState::Deleted.as_str())
        .await
        .map_err(ServiceError::from)?;

    tracing::warn!(org_id = %org_id, actor = %actor.user_id, "Organization soft-deleted");

    state.audit.log_async(AuditEvent::actor_event(
        AuditEventType::OrganizationDeleted,
        actor.user_id,
        actor.org_id,
        Some("organization"),
        Some(org_id),
    ));

    Ok(Json(MessageResponse::new("Organization deleted")))
}

/// Transfer ownership: the named user becomes owner, previous owners drop
/// to admin. Owner only.
///
/// POST /organizations/{id}/transfer
pub async fn transfer_organization(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(org_id): Path<Uuid>,
    Json(req): Json<TransferRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .authorizer
        .authorize(
            &actor,
            Permission::OrganizationTransfer,
            Some(&ResourceRef::scoped(org_id, org_id)),
        )
        .require(TenantVisibility::Visible)?;

    let new_owner = state
        .store
        .find_user(req.new_owner_id)
        .await
        .map_err(ServiceError::from)?
        .filter(|u| u.org_id == org_id && u.is_active)
        .ok_or_else(|| {
            ServiceError::Validation(
                "new_owner_id: user must be an active member of the organization".to_string(),
            )
        })?;

    let users = state
        .store
        .list_users_in_org(org_id)
        .await
        .map_err(ServiceError::from)?;
    for user in users {
        if user.role() == Some(Role::Owner) && user.user_id != new_owner.user_id {
            state
                .store
                .update_user_role(user.user_id, Role::Admin.as_str())
                .await
                .map_err(ServiceError::from)?;
        }
    }

    state
        .store
        .update_user_role(new_owner.user_id, Role::Owner.as_str())
        .await
        .map_err(ServiceError::from)?;

    tracing::info!(
        org_id = %org_id,
        new_owner = %new_owner.user_id,
        actor = %actor.user_id,
        "Organization ownership transferred"
    );

    state.audit.log_async(AuditEvent::actor_event(
        AuditEventType::OrganizationTransferred,
        actor.user_id,
        actor.org_id,
        Some("user"),
        Some(new_owner.user_id),
    ));

    Ok(Json(MessageResponse::new("Ownership transferred")))
}
