use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthCrypto;
use crate::rbac::{self, Operation, PermissionDenied, UserScope};
use crate::user_management::domain::{
    Email, User, UserRepository, UserRepositoryError, UserRole, Username, ValidationError,
};

use super::account_manager::{AccountManager, NewAccount};

/// Role-scoped CRUD over the user store.
///
/// Every method takes the authenticated actor. Mutations are gated with
/// [`rbac::authorize`] before the store is consulted; reads pass the actor's
/// [`UserScope`] down to the repository.
#[derive(Clone)]
pub struct UserAdministrationService {
    users: Arc<dyn UserRepository>,
    accounts: AccountManager,
}

impl std::fmt::Debug for UserAdministrationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAdministrationService")
            .field("users_repo", &Arc::strong_count(&self.users))
            .field("accounts", &self.accounts)
            .finish()
    }
}

impl UserAdministrationService {
    /// Build over a user store; account creation shares the same store.
    pub fn new(users: Arc<dyn UserRepository>, crypto: Arc<AuthCrypto>) -> Self {
        let accounts = AccountManager::new(Arc::clone(&users), crypto);
        Self { users, accounts }
    }

    /// The account creation rules behind [`Self::create_user`].
    pub fn accounts(&self) -> &AccountManager {
        &self.accounts
    }

    /// Every user inside the actor's scope.
    pub async fn list_users(&self, actor: &User) -> Result<Vec<User>, UserAdminError> {
        rbac::authorize(actor.role, Operation::List)?;
        let users = self.users.list(UserScope::for_actor(actor)).await?;
        Ok(users)
    }

    /// Out-of-scope and absent ids are indistinguishable to the caller.
    pub async fn get_user(&self, actor: &User, user_id: Uuid) -> Result<User, UserAdminError> {
        rbac::authorize(actor.role, Operation::Retrieve)?;
        self.users
            .find_in_scope(user_id, UserScope::for_actor(actor))
            .await?
            .ok_or(UserAdminError::UserNotFound)
    }

    /// Admin only. New accounts get the regular-account defaults.
    pub async fn create_user(
        &self,
        actor: &User,
        command: CreateUserCommand,
    ) -> Result<User, UserAdminError> {
        rbac::authorize(actor.role, Operation::Create)?;

        self.accounts
            .create_user(NewAccount {
                username: command.username,
                email: command.email,
                password: command.password,
                role: command.role,
                extra: Default::default(),
            })
            .await
    }

    /// Admin only. Applies the fields set in `command`.
    pub async fn update_user(
        &self,
        actor: &User,
        user_id: Uuid,
        command: UpdateUserCommand,
    ) -> Result<User, UserAdminError> {
        rbac::authorize(actor.role, Operation::Update)?;

        let mut user = self
            .users
            .find_in_scope(user_id, UserScope::for_actor(actor))
            .await?
            .ok_or(UserAdminError::UserNotFound)?;

        if let Some(username) = command.username {
            let username = Username::new(username).map_err(ValidationError::from)?;
            if username != user.username && self.users.username_exists(&username).await? {
                return Err(ValidationError::UsernameTaken.into());
            }
            user.username = username;
        }
        if let Some(email) = command.email {
            user.email = Email::parse_optional(Some(&email)).map_err(ValidationError::from)?;
        }
        if let Some(role) = command.role {
            user.role = role;
        }
        if let Some(password) = command.password {
            user.password_hash = self
                .accounts
                .crypto()
                .hash_password(&password)
                .map_err(|err| UserAdminError::Internal(err.to_string()))?;
        }

        let user = self.users.update(user).await?;

        info!(
            target: "user.admin",
            user_id = %user.id,
            username = %user.username,
            role = %user.role,
            actor = %actor.id,
            action = "update"
        );

        Ok(user)
    }

    /// Admin only. Absent ids answer [`UserAdminError::UserNotFound`].
    pub async fn delete_user(&self, actor: &User, user_id: Uuid) -> Result<(), UserAdminError> {
        rbac::authorize(actor.role, Operation::Delete)?;

        if !self.users.delete(user_id).await? {
            return Err(UserAdminError::UserNotFound);
        }

        info!(
            target: "user.admin",
            user_id = %user_id,
            actor = %actor.id,
            action = "delete"
        );

        Ok(())
    }

    /// The actor's own record, re-read from the store.
    pub async fn profile(&self, actor: &User) -> Result<User, UserAdminError> {
        rbac::authorize(actor.role, Operation::Profile)?;
        self.users
            .find_by_id(actor.id)
            .await?
            .ok_or(UserAdminError::UserNotFound)
    }
}

/// Fields for an Admin-initiated account.
#[derive(Debug, Clone, Default)]
pub struct CreateUserCommand {
    /// Required.
    pub username: String,
    /// Optional.
    pub email: Option<String>,
    /// `None` stores an unusable credential.
    pub password: Option<String>,
    /// Defaults to Employee.
    pub role: Option<UserRole>,
}

/// Field changes; `None` leaves a field untouched. An empty email clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserCommand {
    /// New username; must stay unique.
    pub username: Option<String>,
    /// New email.
    pub email: Option<String>,
    /// New role.
    pub role: Option<UserRole>,
    /// New password, rehashed before storing.
    pub password: Option<String>,
}

/// Failures of the user API service.
#[derive(Debug, Error)]
pub enum UserAdminError {
    /// Absent or outside the actor's scope.
    #[error("Not found.")]
    UserNotFound,
    /// Field-level input error.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Role check failed.
    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),
    /// Store or hashing failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<UserRepositoryError> for UserAdminError {
    fn from(err: UserRepositoryError) -> Self {
        match err {
            UserRepositoryError::NotFound => UserAdminError::UserNotFound,
            UserRepositoryError::UsernameExists => {
                UserAdminError::Validation(ValidationError::UsernameTaken)
            }
            other => UserAdminError::Internal(other.to_string()),
        }
    }
}
