use crate::rbac::UserScope;
use crate::user_management::domain::{User, Username};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository trait for user data persistence operations
///
/// Implementations must apply [`UserScope`] inside the query so out-of-scope
/// rows are never materialized, and must enforce username uniqueness
/// atomically with the write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user. Fails with `UsernameExists` on a duplicate.
    async fn create(&self, user: User) -> Result<User, UserRepositoryError>;

    /// Find a user by id, regardless of scope
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserRepositoryError>;

    /// Find a user by id within a scope
    async fn find_in_scope(
        &self,
        id: Uuid,
        scope: UserScope,
    ) -> Result<Option<User>, UserRepositoryError>;

    /// Find a user by their username (exact, case-sensitive)
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, UserRepositoryError>;

    /// List the users visible in a scope, ordered by join date
    async fn list(&self, scope: UserScope) -> Result<Vec<User>, UserRepositoryError>;

    /// Replace an existing user. Fails with `NotFound` if the id is gone and
    /// `UsernameExists` if a rename collides.
    async fn update(&self, user: User) -> Result<User, UserRepositoryError>;

    /// Delete a user by their identifier
    async fn delete(&self, id: Uuid) -> Result<bool, UserRepositoryError>;

    /// Check if a username is already taken
    async fn username_exists(&self, username: &Username) -> Result<bool, UserRepositoryError>;
}

/// Errors that can occur during repository operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum UserRepositoryError {
    #[error("User not found")]
    NotFound,

    #[error("Username already exists")]
    UsernameExists,

    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Database query error: {0}")]
    QueryError(String),

    #[error("Corrupt user record: {0}")]
    CorruptRecord(String),
}

impl UserRepositoryError {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, UserRepositoryError::NotFound)
    }

    /// Check if this is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, UserRepositoryError::UsernameExists)
    }
}
