//! Permission registry - the closed capability set and per-role grant tables.
//!
//! The tables below are the single source of truth for what each role may
//! do. The decision engine and the database-side row filter seed are both
//! derived from them; neither is hand-maintained separately.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::Role;

/// A capability, namespaced `resource.action`.
///
/// Closed enumeration: unknown capability strings fail at parse time, never
/// inside the decision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "users.view")]
    UsersView,
    #[serde(rename = "users.create")]
    UsersCreate,
    #[serde(rename = "users.edit")]
    UsersEdit,
    #[serde(rename = "users.delete")]
    UsersDelete,
    #[serde(rename = "clients.view")]
    ClientsView,
    #[serde(rename = "clients.create")]
    ClientsCreate,
    #[serde(rename = "clients.edit")]
    ClientsEdit,
    #[serde(rename = "clients.delete")]
    ClientsDelete,
    #[serde(rename = "organization.edit")]
    OrganizationEdit,
    #[serde(rename = "organization.delete")]
    OrganizationDelete,
    #[serde(rename = "organization.transfer")]
    OrganizationTransfer,
    #[serde(rename = "audit.view")]
    AuditView,
}

impl Permission {
    /// Every capability, in declaration order.
    pub const ALL: [Permission; 12] = [
        Permission::UsersView,
        Permission::UsersCreate,
        Permission::UsersEdit,
        Permission::UsersDelete,
        Permission::ClientsView,
        Permission::ClientsCreate,
        Permission::ClientsEdit,
        Permission::ClientsDelete,
        Permission::OrganizationEdit,
        Permission::OrganizationDelete,
        Permission::OrganizationTransfer,
        Permission::AuditView,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::UsersView => "users.view",
            Permission::UsersCreate => "users.create",
            Permission::UsersEdit => "users.edit",
            Permission::UsersDelete => "users.delete",
            Permission::ClientsView => "clients.view",
            Permission::ClientsCreate => "clients.create",
            Permission::ClientsEdit => "clients.edit",
            Permission::ClientsDelete => "clients.delete",
            Permission::OrganizationEdit => "organization.edit",
            Permission::OrganizationDelete => "organization.delete",
            Permission::OrganizationTransfer => "organization.transfer",
            Permission::AuditView => "audit.view",
        }
    }

    /// The `resource` half of the `resource.action` key.
    pub fn resource(&self) -> &'static str {
        self.as_str().split('.').next().unwrap_or_default()
    }

    /// Whether this capability only observes state.
    ///
    /// System-wide resources (no owning organization) are readable by every
    /// tenant but writable only by a super admin; this is the read test the
    /// tenant guard uses.
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Permission::UsersView | Permission::ClientsView | Permission::AuditView
        )
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .find(|p| p.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown permission: {}", s))
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope of a grant: usable anywhere in the tenant, or only against the
/// actor's own record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    Global,
    SelfOnly,
}

/// A single (permission, scope) grant within a role's allow-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub permission: Permission,
    pub scope: PermissionScope,
}

const fn global(permission: Permission) -> Grant {
    Grant {
        permission,
        scope: PermissionScope::Global,
    }
}

const fn self_only(permission: Permission) -> Grant {
    Grant {
        permission,
        scope: PermissionScope::SelfOnly,
    }
}

/// Full allow-set: super admin and owner hold every capability.
const FULL_GRANTS: [Grant; 12] = [
    global(Permission::UsersView),
    global(Permission::UsersCreate),
    global(Permission::UsersEdit),
    global(Permission::UsersDelete),
    global(Permission::ClientsView),
    global(Permission::ClientsCreate),
    global(Permission::ClientsEdit),
    global(Permission::ClientsDelete),
    global(Permission::OrganizationEdit),
    global(Permission::OrganizationDelete),
    global(Permission::OrganizationTransfer),
    global(Permission::AuditView),
];

/// Admin holds everything except organization deletion and transfer.
const ADMIN_GRANTS: [Grant; 10] = [
    global(Permission::UsersView),
    global(Permission::UsersCreate),
    global(Permission::UsersEdit),
    global(Permission::UsersDelete),
    global(Permission::ClientsView),
    global(Permission::ClientsCreate),
    global(Permission::ClientsEdit),
    global(Permission::ClientsDelete),
    global(Permission::OrganizationEdit),
    global(Permission::AuditView),
];

/// Manager may run day-to-day client work; user edits only on themselves.
const MANAGER_GRANTS: [Grant; 5] = [
    global(Permission::UsersView),
    self_only(Permission::UsersEdit),
    global(Permission::ClientsView),
    global(Permission::ClientsCreate),
    global(Permission::ClientsEdit),
];

/// Staff: own profile and read-only client access.
const STAFF_GRANTS: [Grant; 2] = [
    self_only(Permission::UsersEdit),
    global(Permission::ClientsView),
];

/// The allow-set for a role. Pure lookup, no I/O.
pub fn grants_for(role: Role) -> &'static [Grant] {
    match role {
        Role::SuperAdmin | Role::Owner => &FULL_GRANTS,
        Role::Admin => &ADMIN_GRANTS,
        Role::Manager => &MANAGER_GRANTS,
        Role::Staff => &STAFF_GRANTS,
    }
}

/// Look up the scope a role holds a permission at, if granted at all.
pub fn scope_of(role: Role, permission: Permission) -> Option<PermissionScope> {
    grants_for(role)
        .iter()
        .find(|g| g.permission == permission)
        .map(|g| g.scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_permission_parse_round_trip() {
        for permission in Permission::ALL {
            let parsed: Permission = permission.as_str().parse().unwrap();
            assert_eq!(parsed, permission);
        }
        assert!("users.fly".parse::<Permission>().is_err());
    }

    #[test]
    fn test_every_role_partitions_the_permission_set() {
        for role in Role::ALL {
            let allowed: HashSet<Permission> = grants_for(role)
                .iter()
                .map(|g| g.permission)
                .collect();
            let denied: HashSet<Permission> = Permission::ALL
                .iter()
                .copied()
                .filter(|p| !allowed.contains(p))
                .collect();

            assert_eq!(allowed.len() + denied.len(), Permission::ALL.len());
            assert!(allowed.is_disjoint(&denied));
            // No duplicate grants either.
            assert_eq!(allowed.len(), grants_for(role).len());
        }
    }

    #[test]
    fn test_grant_counts_per_role() {
        assert_eq!(grants_for(Role::SuperAdmin).len(), 12);
        assert_eq!(grants_for(Role::Owner).len(), 12);
        assert_eq!(grants_for(Role::Admin).len(), 10);
        assert_eq!(grants_for(Role::Manager).len(), 5);
        assert_eq!(grants_for(Role::Staff).len(), 2);
    }

    #[test]
    fn test_admin_denied_org_delete_and_transfer() {
        assert!(scope_of(Role::Admin, Permission::OrganizationDelete).is_none());
        assert!(scope_of(Role::Admin, Permission::OrganizationTransfer).is_none());
        assert_eq!(
            scope_of(Role::Admin, Permission::OrganizationEdit),
            Some(PermissionScope::Global)
        );
    }

    #[test]
    fn test_user_edit_scope_varies_by_role() {
        assert_eq!(
            scope_of(Role::Owner, Permission::UsersEdit),
            Some(PermissionScope::Global)
        );
        assert_eq!(
            scope_of(Role::Admin, Permission::UsersEdit),
            Some(PermissionScope::Global)
        );
        assert_eq!(
            scope_of(Role::Manager, Permission::UsersEdit),
            Some(PermissionScope::SelfOnly)
        );
        assert_eq!(
            scope_of(Role::Staff, Permission::UsersEdit),
            Some(PermissionScope::SelfOnly)
        );
    }

    #[test]
    fn test_registry_seed_matches_grant_tables() {
        // The SQL mirror feeding database-side row filtering must restate
        // exactly the grants defined here.
        let seed = include_str!("../../migrations/0002_registry_seed.sql");

        let mut expected_rows = 0;
        for role in Role::ALL {
            for grant in grants_for(role) {
                let scope = match grant.scope {
                    PermissionScope::Global => "global",
                    PermissionScope::SelfOnly => "self",
                };
                let row = format!(
                    "('{}', '{}', '{}')",
                    role.as_str(),
                    grant.permission.as_str(),
                    scope
                );
                assert!(seed.contains(&row), "seed missing grant row: {}", row);
                expected_rows += 1;
            }
        }

        let actual_rows = seed.matches("', 'global')").count() + seed.matches("', 'self')").count();
        assert_eq!(actual_rows, expected_rows, "seed has extra grant rows");

        for permission in Permission::ALL {
            let row = format!(
                "('{}', {})",
                permission.as_str(),
                if permission.is_read() { "TRUE" } else { "FALSE" }
            );
            assert!(seed.contains(&row), "seed missing permission row: {}", row);
        }
    }

    #[test]
    fn test_read_classification() {
        assert!(Permission::UsersView.is_read());
        assert!(Permission::ClientsView.is_read());
        assert!(Permission::AuditView.is_read());
        assert!(!Permission::UsersEdit.is_read());
        assert!(!Permission::OrganizationTransfer.is_read());
    }
}
