use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthCrypto;
use crate::user_management::domain::{
    Email, User, UserRepository, UserRepositoryError, UserRole, Username, ValidationError,
};

use super::UserAdminError;

/// Input for both account creation paths.
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    /// Validated as a [`Username`](crate::user_management::Username).
    pub username: String,
    /// Optional; blank counts as absent.
    pub email: Option<String>,
    /// `None` stores an unusable credential.
    pub password: Option<String>,
    /// `None` means the default role (Employee). Ignored by the superuser path.
    pub role: Option<UserRole>,
    /// Explicit flag overrides.
    pub extra: ExtraFields,
}

/// Flags that may be set explicitly at creation time.
///
/// `None` leaves the path-specific default in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtraFields {
    /// Staff flag.
    pub is_staff: Option<bool>,
    /// Superuser flag.
    pub is_superuser: Option<bool>,
    /// Whether the account may authenticate.
    pub is_active: Option<bool>,
}

/// Creates accounts and enforces role defaults and the superuser coupling.
#[derive(Clone)]
pub struct AccountManager {
    users: Arc<dyn UserRepository>,
    crypto: Arc<AuthCrypto>,
}

impl std::fmt::Debug for AccountManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountManager")
            .field("users_repo", &Arc::strong_count(&self.users))
            .finish_non_exhaustive()
    }
}

impl AccountManager {
    /// Build over a user store and the password hasher.
    pub fn new(users: Arc<dyn UserRepository>, crypto: Arc<AuthCrypto>) -> Self {
        Self { users, crypto }
    }

    /// Hasher used for new credentials and login checks.
    pub fn crypto(&self) -> &AuthCrypto {
        &self.crypto
    }

    /// Create a regular account.
    ///
    /// The role defaults to Employee. Username format and uniqueness are
    /// checked before anything is hashed or written.
    pub async fn create_user(&self, account: NewAccount) -> Result<User, UserAdminError> {
        let username = Username::new(&account.username).map_err(ValidationError::from)?;
        let email = Email::parse_optional(account.email.as_deref()).map_err(ValidationError::from)?;

        if self.users.username_exists(&username).await? {
            return Err(ValidationError::UsernameTaken.into());
        }

        let password_hash = match account.password.as_deref() {
            Some(password) => self
                .crypto
                .hash_password(password)
                .map_err(|err| UserAdminError::Internal(err.to_string()))?,
            None => AuthCrypto::unusable_password(),
        };

        let user = User {
            id: Uuid::now_v7(),
            username,
            email,
            password_hash,
            role: account.role.unwrap_or_default(),
            is_staff: account.extra.is_staff.unwrap_or(false),
            is_superuser: account.extra.is_superuser.unwrap_or(false),
            is_active: account.extra.is_active.unwrap_or(true),
            date_joined: Utc::now(),
        };

        // A concurrent insert can still win between the existence check and
        // here; the store reports it and it surfaces as the same conflict.
        let user = self.users.create(user).await.map_err(|err| match err {
            UserRepositoryError::UsernameExists => ValidationError::UsernameTaken.into(),
            other => UserAdminError::from(other),
        })?;

        info!(
            target: "user.admin",
            user_id = %user.id,
            username = %user.username,
            role = %user.role,
            action = "create"
        );

        Ok(user)
    }

    /// Create an Admin account with `is_staff` and `is_superuser` set.
    ///
    /// Any caller-supplied role is replaced by Admin. Explicitly passing
    /// `false` for either flag is rejected.
    pub async fn create_superuser(&self, mut account: NewAccount) -> Result<User, UserAdminError> {
        let is_staff = *account.extra.is_staff.get_or_insert(true);
        let is_superuser = *account.extra.is_superuser.get_or_insert(true);

        if !is_staff {
            return Err(ValidationError::SuperuserFlag("is_staff").into());
        }
        if !is_superuser {
            return Err(ValidationError::SuperuserFlag("is_superuser").into());
        }

        account.role = Some(UserRole::Admin);
        self.create_user(account).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user_management::domain::MockUserRepository;
    use crate::user_management::infrastructure::InMemoryUserRepository;

    fn manager() -> (AccountManager, Arc<InMemoryUserRepository>) {
        let repo = Arc::new(InMemoryUserRepository::new());
        let crypto = Arc::new(AuthCrypto::insecure_for_tests("pepper").unwrap());
        (AccountManager::new(repo.clone(), crypto), repo)
    }

    fn account(username: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            password: Some("Passw0rd!".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_user_defaults_to_employee() {
        let (accounts, _) = manager();
        let user = accounts.create_user(account("alice")).await.unwrap();
        assert_eq!(user.role, UserRole::Employee);
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
        assert!(user.is_active);
    }

    #[tokio::test]
    async fn create_user_keeps_requested_role() {
        let (accounts, _) = manager();
        let user = accounts
            .create_user(NewAccount {
                role: Some(UserRole::Manager),
                ..account("carol")
            })
            .await
            .unwrap();
        assert_eq!(user.role, UserRole::Manager);
    }

    #[tokio::test]
    async fn create_user_stores_only_a_derived_credential() {
        let (accounts, repo) = manager();
        let user = accounts.create_user(account("alice")).await.unwrap();
        let stored = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "Passw0rd!");
        assert!(
            accounts
                .crypto()
                .verify_password("Passw0rd!", &stored.password_hash)
                .unwrap()
        );
    }

    #[tokio::test]
    async fn create_user_without_password_gets_unusable_credential() {
        let (accounts, _) = manager();
        let user = accounts
            .create_user(NewAccount {
                password: None,
                ..account("nopass")
            })
            .await
            .unwrap();
        assert!(!AuthCrypto::is_usable(&user.password_hash));
    }

    #[tokio::test]
    async fn create_user_normalizes_email() {
        let (accounts, _) = manager();
        let user = accounts
            .create_user(NewAccount {
                email: Some(" Alice@EXAMPLE.org ".to_string()),
                ..account("alice")
            })
            .await
            .unwrap();
        assert_eq!(user.email.unwrap().as_str(), "Alice@example.org");
    }

    #[tokio::test]
    async fn rejects_empty_username() {
        let (accounts, _) = manager();
        let err = accounts.create_user(account("")).await.unwrap_err();
        match err {
            UserAdminError::Validation(inner) => assert_eq!(inner.field(), "username"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_username_with_digits_or_symbols() {
        let (accounts, repo) = manager();
        for name in ["bob1", "bob!", "bob_smith"] {
            let err = accounts.create_user(account(name)).await.unwrap_err();
            assert!(matches!(err, UserAdminError::Validation(_)), "{name}");
        }
        assert!(repo.list(crate::rbac::UserScope::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_username_is_a_validation_error() {
        let (accounts, _) = manager();
        accounts.create_user(account("alice")).await.unwrap();
        let err = accounts.create_user(account("alice")).await.unwrap_err();
        match err {
            UserAdminError::Validation(inner) => assert!(inner.is_username_conflict()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn store_level_conflict_maps_to_validation_error() {
        let mut repo = MockUserRepository::new();
        repo.expect_username_exists().returning(|_| Ok(false));
        repo.expect_create()
            .returning(|_| Err(UserRepositoryError::UsernameExists));

        let accounts = AccountManager::new(
            Arc::new(repo),
            Arc::new(AuthCrypto::insecure_for_tests("pepper").unwrap()),
        );
        let err = accounts.create_user(account("racer")).await.unwrap_err();
        assert!(matches!(
            err,
            UserAdminError::Validation(ValidationError::UsernameTaken)
        ));
    }

    #[tokio::test]
    async fn superuser_is_always_admin_staff_superuser() {
        let (accounts, _) = manager();
        let user = accounts
            .create_superuser(NewAccount {
                role: Some(UserRole::Employee),
                ..account("root")
            })
            .await
            .unwrap();
        assert_eq!(user.role, UserRole::Admin);
        assert!(user.is_staff);
        assert!(user.is_superuser);
    }

    #[tokio::test]
    async fn superuser_rejects_explicit_false_flags() {
        let (accounts, repo) = manager();

        let err = accounts
            .create_superuser(NewAccount {
                extra: ExtraFields {
                    is_staff: Some(false),
                    ..Default::default()
                },
                ..account("root")
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UserAdminError::Validation(ValidationError::SuperuserFlag("is_staff"))
        ));

        let err = accounts
            .create_superuser(NewAccount {
                extra: ExtraFields {
                    is_superuser: Some(false),
                    ..Default::default()
                },
                ..account("root")
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UserAdminError::Validation(ValidationError::SuperuserFlag("is_superuser"))
        ));

        assert!(repo.list(crate::rbac::UserScope::All).await.unwrap().is_empty());
    }
}
