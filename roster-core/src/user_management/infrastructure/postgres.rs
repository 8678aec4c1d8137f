use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::rbac::UserScope;
use crate::user_management::domain::{
    Email, User, UserRepository, UserRepositoryError, UserRole, Username,
};

const USERS_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            UUID PRIMARY KEY,
    username      TEXT NOT NULL,
    email         TEXT,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL,
    is_staff      BOOLEAN NOT NULL DEFAULT FALSE,
    is_superuser  BOOLEAN NOT NULL DEFAULT FALSE,
    is_active     BOOLEAN NOT NULL DEFAULT TRUE,
    date_joined   TIMESTAMPTZ NOT NULL,
    CONSTRAINT users_username_key UNIQUE (username)
)
"#;

const SELECT_USERS: &str = "SELECT id, username, email, password_hash, role, is_staff, \
     is_superuser, is_active, date_joined FROM users WHERE TRUE";

/// PostgreSQL-backed user store.
#[derive(Clone, Debug)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: Option<String>,
    password_hash: String,
    role: String,
    is_staff: bool,
    is_superuser: bool,
    is_active: bool,
    date_joined: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = UserRepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |what: String| UserRepositoryError::CorruptRecord(format!("{id}: {what}"));

        Ok(User {
            id,
            username: Username::new(&row.username).map_err(|e| corrupt(e.to_string()))?,
            email: Email::parse_optional(row.email.as_deref()).map_err(|e| corrupt(e.to_string()))?,
            role: row.role.parse::<UserRole>().map_err(|e| corrupt(e.to_string()))?,
            password_hash: row.password_hash,
            is_staff: row.is_staff,
            is_superuser: row.is_superuser,
            is_active: row.is_active,
            date_joined: row.date_joined,
        })
    }
}

fn map_write_error(err: sqlx::Error) -> UserRepositoryError {
    if let Some(db_err) = err.as_database_error()
        && (db_err.is_unique_violation() || db_err.constraint() == Some("users_username_key"))
    {
        return UserRepositoryError::UsernameExists;
    }
    map_read_error(err)
}

fn map_read_error(err: sqlx::Error) -> UserRepositoryError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            UserRepositoryError::ConnectionError(err.to_string())
        }
        other => UserRepositoryError::QueryError(other.to_string()),
    }
}

fn push_scope(query: &mut QueryBuilder<'_, Postgres>, scope: UserScope) {
    match scope {
        UserScope::All => {}
        UserScope::ExcludeAdmins => {
            query
                .push(" AND role <> ")
                .push_bind(UserRole::Admin.as_str());
        }
        UserScope::OnlySelf(id) => {
            query.push(" AND id = ").push_bind(id);
        }
    }
}

impl PostgresUserRepository {
    /// Wrap an existing pool. Call [`Self::ensure_schema`] before first use.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, UserRepositoryError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| UserRepositoryError::ConnectionError(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Create the `users` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), UserRepositoryError> {
        sqlx::query(USERS_DDL)
            .execute(&self.pool)
            .await
            .map_err(map_read_error)?;
        info!("users table ready");
        Ok(())
    }

    async fn fetch_one_where(
        &self,
        build: impl FnOnce(&mut QueryBuilder<'_, Postgres>),
    ) -> Result<Option<User>, UserRepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_USERS);
        build(&mut query);
        query
            .build_query_as::<UserRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_read_error)?
            .map(User::try_from)
            .transpose()
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> Result<User, UserRepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, password_hash, role,
                is_staff, is_superuser, is_active, date_joined
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(user.username.as_str())
        .bind(user.email.as_ref().map(Email::as_str))
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.is_active)
        .bind(user.date_joined)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserRepositoryError> {
        self.fetch_one_where(|q| {
            q.push(" AND id = ").push_bind(id);
        })
        .await
    }

    async fn find_in_scope(
        &self,
        id: Uuid,
        scope: UserScope,
    ) -> Result<Option<User>, UserRepositoryError> {
        self.fetch_one_where(|q| {
            q.push(" AND id = ").push_bind(id);
            push_scope(q, scope);
        })
        .await
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, UserRepositoryError> {
        let username = username.as_str().to_owned();
        self.fetch_one_where(|q| {
            q.push(" AND username = ").push_bind(username);
        })
        .await
    }

    async fn list(&self, scope: UserScope) -> Result<Vec<User>, UserRepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_USERS);
        push_scope(&mut query, scope);
        query.push(" ORDER BY date_joined, id");

        query
            .build_query_as::<UserRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_read_error)?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn update(&self, user: User) -> Result<User, UserRepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, role = $5,
                is_staff = $6, is_superuser = $7, is_active = $8
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(user.username.as_str())
        .bind(user.email.as_ref().map(Email::as_str))
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.is_active)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(UserRepositoryError::NotFound);
        }
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, UserRepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_read_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn username_exists(&self, username: &Username) -> Result<bool, UserRepositoryError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_read_error)
    }
}
