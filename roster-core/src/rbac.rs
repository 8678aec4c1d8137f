//! Role-Based Access Control (RBAC) decisions
//!
//! Pure functions keyed by the authenticated actor's role and the requested
//! operation. Nothing here touches the user store; callers resolve a
//! [`UserScope`] and hand it to the repository so filtering happens in the
//! query itself, and they call [`authorize`] before any mutation.
//!
//! | Actor role | List/Read scope           | Create | Update | Delete |
//! |------------|---------------------------|--------|--------|--------|
//! | Admin      | all users                 | yes    | yes    | yes    |
//! | Manager    | all users except Admins   | no     | no     | no     |
//! | Employee   | self only                 | no     | no     | no     |
//!
//! ## Example
//!
//! ```
//! use roster_core::rbac::{Operation, UserScope, authorize};
//! use roster_core::user_management::UserRole;
//! use uuid::Uuid;
//!
//! let me = Uuid::now_v7();
//! assert_eq!(UserScope::for_role(UserRole::Employee, me), UserScope::OnlySelf(me));
//! assert!(authorize(UserRole::Manager, Operation::Delete).is_err());
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user_management::domain::{User, UserRole};

/// Subset of the user store an actor may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserScope {
    /// Every record.
    All,
    /// Every record whose role is not Admin.
    ExcludeAdmins,
    /// Only the record with this id.
    OnlySelf(Uuid),
}

impl UserScope {
    /// Admins see all, Managers all but Admins, Employees only `actor_id`.
    pub fn for_role(role: UserRole, actor_id: Uuid) -> Self {
        match role {
            UserRole::Admin => UserScope::All,
            UserRole::Manager => UserScope::ExcludeAdmins,
            UserRole::Employee => UserScope::OnlySelf(actor_id),
        }
    }

    /// Scope for an authenticated actor.
    pub fn for_actor(actor: &User) -> Self {
        Self::for_role(actor.role, actor.id)
    }

    /// Whether `user` falls inside this scope.
    pub fn admits(&self, user: &User) -> bool {
        match self {
            UserScope::All => true,
            UserScope::ExcludeAdmins => user.role != UserRole::Admin,
            UserScope::OnlySelf(id) => user.id == *id,
        }
    }
}

/// Operations exposed by the user API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Enumerate users in scope.
    List,
    /// Fetch one user in scope.
    Retrieve,
    /// Add a user.
    Create,
    /// Change a user (full or partial).
    Update,
    /// Remove a user.
    Delete,
    /// Read the caller's own record.
    Profile,
}

impl Operation {
    /// Role an actor must hold to perform this operation at all.
    ///
    /// Reads return `None`: every authenticated actor may read, the scope
    /// decides what they get back.
    pub fn required_role(&self) -> Option<UserRole> {
        match self {
            Operation::List | Operation::Retrieve | Operation::Profile => None,
            Operation::Create | Operation::Update | Operation::Delete => Some(UserRole::Admin),
        }
    }

    /// Lowercase name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Retrieve => "retrieve",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Profile => "profile",
        }
    }
}

/// The actor's role is insufficient for the requested operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.message())]
pub struct PermissionDenied {
    /// What was attempted.
    pub operation: Operation,
    /// Role the operation needs.
    pub required: UserRole,
    /// Role the actor holds.
    pub actual: UserRole,
}

impl PermissionDenied {
    /// Client-facing text, e.g. "Only Admins can delete users."
    pub fn message(&self) -> String {
        let verb = match self.operation {
            Operation::Create => "add",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::List | Operation::Retrieve | Operation::Profile => "view",
        };
        format!("Only {}s can {verb} users.", self.required)
    }
}

/// Gate an operation on the actor's role.
///
/// Mutations require `role == Admin` exactly; there is no partial grant for
/// Managers.
pub fn authorize(role: UserRole, operation: Operation) -> Result<(), PermissionDenied> {
    match operation.required_role() {
        None => Ok(()),
        Some(required) if role == required => Ok(()),
        Some(required) => Err(PermissionDenied {
            operation,
            required,
            actual: role,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user_management::domain::Username;
    use chrono::Utc;

    fn user(name: &str, role: UserRole) -> User {
        User {
            id: Uuid::now_v7(),
            username: Username::new(name).unwrap(),
            email: None,
            password_hash: String::new(),
            role,
            is_staff: false,
            is_superuser: false,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn scope_follows_role() {
        let admin = user("ada", UserRole::Admin);
        let manager = user("max", UserRole::Manager);
        let employee = user("eve", UserRole::Employee);

        assert_eq!(UserScope::for_actor(&admin), UserScope::All);
        assert_eq!(UserScope::for_actor(&manager), UserScope::ExcludeAdmins);
        assert_eq!(
            UserScope::for_actor(&employee),
            UserScope::OnlySelf(employee.id)
        );
    }

    #[test]
    fn manager_scope_never_admits_admins() {
        let scope = UserScope::ExcludeAdmins;
        assert!(!scope.admits(&user("ada", UserRole::Admin)));
        assert!(scope.admits(&user("max", UserRole::Manager)));
        assert!(scope.admits(&user("eve", UserRole::Employee)));
    }

    #[test]
    fn self_scope_admits_only_the_actor() {
        let eve = user("eve", UserRole::Employee);
        let other = user("fred", UserRole::Employee);
        let scope = UserScope::for_actor(&eve);
        assert!(scope.admits(&eve));
        assert!(!scope.admits(&other));
    }

    #[test]
    fn mutations_require_admin() {
        for op in [Operation::Create, Operation::Update, Operation::Delete] {
            assert!(authorize(UserRole::Admin, op).is_ok());
            assert!(authorize(UserRole::Manager, op).is_err());
            assert!(authorize(UserRole::Employee, op).is_err());
        }
    }

    #[test]
    fn reads_are_open_to_every_role() {
        for role in UserRole::all() {
            for op in [Operation::List, Operation::Retrieve, Operation::Profile] {
                assert!(authorize(*role, op).is_ok());
            }
        }
    }

    #[test]
    fn denial_names_the_required_role() {
        let denied = authorize(UserRole::Manager, Operation::Delete).unwrap_err();
        assert_eq!(denied.required, UserRole::Admin);
        assert_eq!(denied.to_string(), "Only Admins can delete users.");
        assert_eq!(
            authorize(UserRole::Employee, Operation::Create)
                .unwrap_err()
                .to_string(),
            "Only Admins can add users."
        );
        assert_eq!(
            authorize(UserRole::Employee, Operation::Update)
                .unwrap_err()
                .to_string(),
            "Only Admins can update users."
        );
    }
}
