use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::rbac::UserScope;
use crate::user_management::domain::{User, UserRepository, UserRepositoryError, Username};

/// Process-local user store.
///
/// Used when no database is configured and by the test suites. Uniqueness
/// checks and writes happen under the same write guard, so concurrent
/// creates of one username cannot both succeed.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    fn sorted(mut users: Vec<User>) -> Vec<User> {
        users.sort_by(|a, b| a.date_joined.cmp(&b.date_joined).then(a.id.cmp(&b.id)));
        users
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, UserRepositoryError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(UserRepositoryError::UsernameExists);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserRepositoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_in_scope(
        &self,
        id: Uuid,
        scope: UserScope,
    ) -> Result<Option<User>, UserRepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .get(&id)
            .filter(|user| scope.admits(user))
            .cloned())
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, UserRepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| &u.username == username)
            .cloned())
    }

    async fn list(&self, scope: UserScope) -> Result<Vec<User>, UserRepositoryError> {
        let users = self
            .users
            .read()
            .await
            .values()
            .filter(|user| scope.admits(user))
            .cloned()
            .collect();
        Ok(Self::sorted(users))
    }

    async fn update(&self, user: User) -> Result<User, UserRepositoryError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(UserRepositoryError::NotFound);
        }
        if users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(UserRepositoryError::UsernameExists);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, UserRepositoryError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn username_exists(&self, username: &Username) -> Result<bool, UserRepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .any(|u| &u.username == username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user_management::domain::UserRole;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn user(name: &str, role: UserRole, joined_offset: i64) -> User {
        User {
            id: Uuid::now_v7(),
            username: Username::new(name).unwrap(),
            email: None,
            password_hash: "!".into(),
            role,
            is_staff: false,
            is_superuser: false,
            is_active: true,
            date_joined: Utc::now() + Duration::seconds(joined_offset),
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_usernames() {
        let repo = InMemoryUserRepository::new();
        repo.create(user("alice", UserRole::Employee, 0)).await.unwrap();
        let err = repo
            .create(user("alice", UserRole::Manager, 1))
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn usernames_are_case_sensitive() {
        let repo = InMemoryUserRepository::new();
        repo.create(user("alice", UserRole::Employee, 0)).await.unwrap();
        repo.create(user("Alice", UserRole::Employee, 1)).await.unwrap();
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn list_applies_scope_and_join_order() {
        let repo = InMemoryUserRepository::new();
        let admin = repo.create(user("ada", UserRole::Admin, 0)).await.unwrap();
        let manager = repo.create(user("max", UserRole::Manager, 2)).await.unwrap();
        let employee = repo.create(user("eve", UserRole::Employee, 1)).await.unwrap();

        let all = repo.list(UserScope::All).await.unwrap();
        let ids: Vec<_> = all.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![admin.id, employee.id, manager.id]);

        let managed = repo.list(UserScope::ExcludeAdmins).await.unwrap();
        assert_eq!(managed.len(), 2);

        let own = repo.list(UserScope::OnlySelf(employee.id)).await.unwrap();
        assert_eq!(own, vec![employee]);
    }

    #[tokio::test]
    async fn find_in_scope_hides_out_of_scope_rows() {
        let repo = InMemoryUserRepository::new();
        let admin = repo.create(user("ada", UserRole::Admin, 0)).await.unwrap();
        assert!(
            repo.find_in_scope(admin.id, UserScope::ExcludeAdmins)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            repo.find_in_scope(admin.id, UserScope::All)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn update_rejects_rename_collision_and_missing_rows() {
        let repo = InMemoryUserRepository::new();
        repo.create(user("alice", UserRole::Employee, 0)).await.unwrap();
        let mut bob = repo.create(user("bob", UserRole::Employee, 1)).await.unwrap();

        bob.username = Username::new("alice").unwrap();
        assert!(matches!(
            repo.update(bob).await,
            Err(UserRepositoryError::UsernameExists)
        ));

        let ghost = user("ghost", UserRole::Employee, 2);
        assert!(repo.update(ghost).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn concurrent_creates_of_one_username_yield_one_row() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.create(user("dup", UserRole::Employee, i)).await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(repo.len().await, 1);
    }
}
