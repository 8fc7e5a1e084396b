//! Authorization decision engine.
//!
//! `authorize` is pure: same actor, permission, and resource always produce
//! the same decision, with no hidden state. The `Authorizer` wrapper adds
//! the one permitted side effect, handing every Deny (and security-relevant
//! Allows) to the audit logger before the decision is surfaced.

use serde::Serialize;
use uuid::Uuid;

use crate::models::{grants_for, AuditEvent, AuditOutcome, Permission, PermissionScope, Role};
use crate::services::audit::AuditService;
use crate::services::error::ServiceError;
use crate::services::session::ActorContext;

/// The resource an operation targets.
///
/// `organization_id = None` marks a system-wide resource: visible to every
/// tenant, writable only by a super admin. `target_role`/`new_role` are set
/// for user-targeted mutations so the privilege-rank rules can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRef {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub target_role: Option<Role>,
    pub new_role: Option<Role>,
}

impl ResourceRef {
    /// A plain tenant-scoped resource.
    pub fn scoped(id: Uuid, organization_id: Uuid) -> Self {
        Self {
            id,
            organization_id: Some(organization_id),
            target_role: None,
            new_role: None,
        }
    }

    /// A system-wide resource (no owning tenant).
    pub fn system_wide(id: Uuid) -> Self {
        Self {
            id,
            organization_id: None,
            target_role: None,
            new_role: None,
        }
    }

    pub fn with_target_role(mut self, role: Role) -> Self {
        self.target_role = Some(role);
        self
    }

    pub fn with_new_role(mut self, role: Role) -> Self {
        self.new_role = Some(role);
        self
    }
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    NotGranted,
    SelfScopeViolation,
    CrossTenantViolation,
    SystemResourceReadOnly,
    PrivilegeRankViolation,
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::NotGranted => "NOT_GRANTED",
            DenyReason::SelfScopeViolation => "SELF_SCOPE_VIOLATION",
            DenyReason::CrossTenantViolation => "CROSS_TENANT_VIOLATION",
            DenyReason::SystemResourceReadOnly => "SYSTEM_RESOURCE_READ_ONLY",
            DenyReason::PrivilegeRankViolation => "PRIVILEGE_RANK_VIOLATION",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

/// How a cross-tenant denial renders at the HTTP boundary.
///
/// `Hidden` masks the denial as 404 so a guessable id does not confirm the
/// resource exists in another tenant; `Visible` returns a plain 403 for
/// endpoints whose URL already names the organization. Each endpoint class
/// picks exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantVisibility {
    Hidden,
    Visible,
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Convert a decision into a result, applying the masking policy to
    /// cross-tenant denials.
    pub fn require(self, visibility: TenantVisibility) -> Result<(), ServiceError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => match (reason, visibility) {
                (DenyReason::CrossTenantViolation, TenantVisibility::Hidden) => {
                    Err(ServiceError::NotFound)
                }
                _ => Err(ServiceError::Forbidden { reason }),
            },
        }
    }
}

/// Decide whether `actor` may exercise `permission` against `resource`.
pub fn authorize(
    actor: &ActorContext,
    permission: Permission,
    resource: Option<&ResourceRef>,
) -> Decision {
    // 1. Role must hold the capability at all.
    let scope = match grants_for(actor.role)
        .iter()
        .find(|g| g.permission == permission)
    {
        Some(grant) => grant.scope,
        None => return Decision::Deny(DenyReason::NotGranted),
    };

    // 2. Self-only grants are usable solely against the actor's own record.
    if scope == PermissionScope::SelfOnly {
        match resource {
            Some(r) if r.id == actor.user_id => {}
            _ => return Decision::Deny(DenyReason::SelfScopeViolation),
        }
    }

    if let Some(resource) = resource {
        // 3. Tenant isolation.
        if let Decision::Deny(reason) = check_tenant(actor, permission, resource.organization_id) {
            return Decision::Deny(reason);
        }

        // 4. Privilege-rank rules for role/privilege mutations.
        if let Decision::Deny(reason) = check_rank(actor, permission, resource) {
            return Decision::Deny(reason);
        }
    }

    Decision::Allow
}

/// Tenant equality, with the super-admin and system-wide exceptions.
pub fn check_tenant(
    actor: &ActorContext,
    permission: Permission,
    resource_org_id: Option<Uuid>,
) -> Decision {
    if actor.role == Role::SuperAdmin {
        return Decision::Allow;
    }

    match resource_org_id {
        Some(org_id) if org_id == actor.org_id => Decision::Allow,
        Some(_) => Decision::Deny(DenyReason::CrossTenantViolation),
        // System-wide resources are readable by everyone, writable only by
        // a super admin.
        None if permission.is_read() => Decision::Allow,
        None => Decision::Deny(DenyReason::SystemResourceReadOnly),
    }
}

/// Privilege-rank rules: who may delete whom, and who may assign which role.
fn check_rank(actor: &ActorContext, permission: Permission, resource: &ResourceRef) -> Decision {
    let changes_privilege = permission == Permission::UsersDelete || resource.new_role.is_some();
    if !changes_privilege {
        return Decision::Allow;
    }

    if let Some(target_role) = resource.target_role {
        if !actor.role.outranks(target_role) {
            return Decision::Deny(DenyReason::PrivilegeRankViolation);
        }
    }

    if let Some(new_role) = resource.new_role {
        // The system role is never assignable.
        if new_role == Role::SuperAdmin {
            return Decision::Deny(DenyReason::PrivilegeRankViolation);
        }
        // Owners may assign any tenant role up to and including owner;
        // everyone else only ranks strictly below their own.
        if actor.role != Role::Owner
            && actor.role != Role::SuperAdmin
            && !actor.role.outranks(new_role)
        {
            return Decision::Deny(DenyReason::PrivilegeRankViolation);
        }
    }

    Decision::Allow
}

/// Decision engine with the audit side effect attached.
#[derive(Clone)]
pub struct Authorizer {
    audit: AuditService,
}

impl Authorizer {
    pub fn new(audit: AuditService) -> Self {
        Self { audit }
    }

    /// Authorize and record. Denials are always audited; Allows are audited
    /// when the operation changes a target's role or privilege.
    pub fn authorize(
        &self,
        actor: &ActorContext,
        permission: Permission,
        resource: Option<&ResourceRef>,
    ) -> Decision {
        let decision = authorize(actor, permission, resource);

        match decision {
            Decision::Deny(reason) => {
                self.audit.log_async(AuditEvent::authz_decision(
                    actor.user_id,
                    actor.org_id,
                    permission,
                    resource.map(|_| "resource"),
                    resource.map(|r| r.id),
                    AuditOutcome::Deny,
                    Some(reason.code()),
                ));
            }
            Decision::Allow => {
                let security_relevant = permission == Permission::UsersDelete
                    || resource.map_or(false, |r| r.new_role.is_some());
                if security_relevant {
                    self.audit.log_async(AuditEvent::authz_decision(
                        actor.user_id,
                        actor.org_id,
                        permission,
                        resource.map(|_| "resource"),
                        resource.map(|r| r.id),
                        AuditOutcome::Allow,
                        None,
                    ));
                }
            }
        }

        decision
    }
}
