//! Role model - the fixed role set with its privilege order.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The role a user holds within their organization.
///
/// `SuperAdmin` is a system role: it is never assignable through the API and
/// is exempt from tenant isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Owner,
    Admin,
    Manager,
    Staff,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::Owner,
        Role::Admin,
        Role::Manager,
        Role::Staff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Staff => "staff",
        }
    }

    /// Total order over roles; higher rank may act on lower rank.
    pub fn privilege_rank(&self) -> u8 {
        match self {
            Role::SuperAdmin => 50,
            Role::Owner => 40,
            Role::Admin => 30,
            Role::Manager => 20,
            Role::Staff => 10,
        }
    }

    pub fn outranks(&self, other: Role) -> bool {
        self.privilege_rank() > other.privilege_rank()
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .find(|r| r.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown role: {}", s))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_privilege_order_is_total() {
        assert!(Role::SuperAdmin.outranks(Role::Owner));
        assert!(Role::Owner.outranks(Role::Admin));
        assert!(Role::Admin.outranks(Role::Manager));
        assert!(Role::Manager.outranks(Role::Staff));
        assert!(!Role::Admin.outranks(Role::Admin));
        assert!(!Role::Staff.outranks(Role::Owner));
    }
}
