use serde::{Deserialize, Serialize};

/// User role enumeration for role-based access control
///
/// Every account carries exactly one role. The role decides which part of
/// the user list an account can see and whether it may change it; see
/// [`crate::rbac`] for the decision tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UserRole {
    /// Full access
    /// - Sees every account
    /// - Can create, update and delete accounts, including role changes
    Admin,

    /// Read-only supervisor
    /// - Sees every account except Admins
    /// - Cannot change anything
    Manager,

    /// Regular staff member
    /// - Sees only their own account
    #[default]
    Employee,
}

impl UserRole {
    /// Only Admins may create, update or delete accounts.
    pub fn can_manage_users(&self) -> bool {
        match self {
            UserRole::Admin => true,
            UserRole::Manager | UserRole::Employee => false,
        }
    }

    /// Get all available roles
    pub fn all() -> &'static [UserRole] {
        &[UserRole::Admin, UserRole::Manager, UserRole::Employee]
    }

    /// Get the role name as stored and serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::Manager => "Manager",
            UserRole::Employee => "Employee",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(UserRole::Admin),
            "Manager" => Ok(UserRole::Manager),
            "Employee" => Ok(UserRole::Employee),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a valid choice.")]
pub struct UnknownRole(pub String);
