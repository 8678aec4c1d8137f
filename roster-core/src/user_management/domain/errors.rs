use super::value_objects::{EmailError, UnknownRole, UsernameError};

/// Field-level validation failure surfaced to clients as a 400.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Username(#[from] UsernameError),

    #[error("A user with this username already exists.")]
    UsernameTaken,

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Role(#[from] UnknownRole),

    #[error("Self-registration may only request the Employee role.")]
    RoleNotPermitted,

    #[error("Superuser must have {0}=True.")]
    SuperuserFlag(&'static str),

    #[error("This field is required.")]
    Required(&'static str),
}

impl ValidationError {
    /// Name of the offending input field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Username(_) | ValidationError::UsernameTaken => "username",
            ValidationError::Email(_) => "email",
            ValidationError::Role(_) | ValidationError::RoleNotPermitted => "role",
            ValidationError::SuperuserFlag(flag) => flag,
            ValidationError::Required(field) => field,
        }
    }

    pub fn is_username_conflict(&self) -> bool {
        matches!(self, ValidationError::UsernameTaken)
    }
}
