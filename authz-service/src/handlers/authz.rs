//! Authorization evaluation endpoint.
//!
//! Lets collaborating services ask the engine for decisions without
//! duplicating the registry. Denials recorded here land in the audit trail
//! like any other.

use authz_core::error::AppError;
use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::CurrentActor;
use crate::models::{Permission, Role};
use crate::services::{Decision, ResourceRef};
use crate::AppState;

/// Authorization evaluation request.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    /// Capabilities to evaluate.
    pub permissions: Vec<Permission>,
    /// Optional target resource for scope/tenant/rank checks.
    pub resource: Option<EvaluateResource>,
}

/// The resource under evaluation. A missing `org_id` marks a system-wide
/// resource.
#[derive(Debug, Deserialize)]
pub struct EvaluateResource {
    pub id: Uuid,
    pub org_id: Option<Uuid>,
    pub target_role: Option<Role>,
    pub new_role: Option<Role>,
}

/// Single capability decision.
#[derive(Debug, Serialize)]
pub struct PermissionDecision {
    pub permission: Permission,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Authorization evaluation response.
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub all_allowed: bool,
    pub decisions: Vec<PermissionDecision>,
}

/// Evaluate the actor's capabilities against an optional resource.
///
/// POST /authz/evaluate
pub async fn evaluate(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(req): Json<EvaluateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let resource = req.resource.map(|r| ResourceRef {
        id: r.id,
        organization_id: r.org_id,
        target_role: r.target_role,
        new_role: r.new_role,
    });

    let decisions: Vec<PermissionDecision> = req
        .permissions
        .into_iter()
        .map(|permission| {
            let decision = state
                .authorizer
                .authorize(&actor, permission, resource.as_ref());
            match decision {
                Decision::Allow => PermissionDecision {
                    permission,
                    allowed: true,
                    reason: None,
                },
                Decision::Deny(reason) => PermissionDecision {
                    permission,
                    allowed: false,
                    reason: Some(reason.code().to_string()),
                },
            }
        })
        .collect();

    let all_allowed = decisions.iter().all(|d| d.allowed);

    Ok(Json(EvaluateResponse {
        user_id: actor.user_id,
        org_id: actor.org_id,
        all_allowed,
        decisions,
    }))
}
