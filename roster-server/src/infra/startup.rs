use std::sync::Arc;

use anyhow::{Context, Result, bail};
use roster_core::{
    auth::AuthCrypto,
    user_management::{
        NewAccount, User, UserRepository, Username,
        infrastructure::{InMemoryUserRepository, PostgresUserRepository},
    },
};
use tracing::{info, warn};

use crate::{
    infra::{app_state::AppState, config::Config},
    users::auth::TokenService,
};

/// What [`bootstrap_superuser`] did on this start.
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    /// No `BOOTSTRAP_SUPERUSER_*` settings were provided.
    Disabled,
    /// An account with the configured username already exists and was left as is.
    AlreadyPresent,
    /// A new superuser was created.
    Created(User),
}

/// Open the user store and wire the shared state from `config`.
pub async fn build_state(config: Config) -> Result<AppState> {
    let users = open_user_store(&config).await?;
    let crypto = Arc::new(
        AuthCrypto::new(config.auth_password_pepper.as_bytes())
            .context("failed to initialise password hashing")?,
    );
    let tokens = TokenService::new(
        &config.jwt_secret,
        config.access_token_ttl,
        config.refresh_token_ttl,
    )
    .context("failed to initialise token signing")?;

    Ok(AppState::new(users, crypto, tokens, config))
}

/// PostgreSQL when `DATABASE_URL` is set, memory otherwise.
pub async fn open_user_store(config: &Config) -> Result<Arc<dyn UserRepository>> {
    let users: Arc<dyn UserRepository> = match &config.database_url {
        Some(url) => {
            let repo = PostgresUserRepository::connect(url)
                .await
                .context("failed to connect to PostgreSQL")?;
            repo.ensure_schema()
                .await
                .context("failed to prepare users table")?;
            info!("using PostgreSQL user store");
            Arc::new(repo)
        }
        None => {
            warn!("DATABASE_URL not set; accounts are kept in memory and lost on exit");
            Arc::new(InMemoryUserRepository::new())
        }
    };
    Ok(users)
}

/// Backs the `create-superuser` command. Refuses to run without a
/// persistent store, since the account would vanish with the process.
pub async fn create_superuser(config: Config, account: NewAccount) -> Result<User> {
    if config.database_url.is_none() {
        bail!("create-superuser needs DATABASE_URL; the in-memory store does not outlive this command");
    }
    let state = build_state(config).await?;

    let user = state
        .accounts()
        .create_superuser(account)
        .await
        .context("failed to create superuser")?;

    info!(target: "user.admin", user_id = %user.id, username = %user.username, "superuser created");
    Ok(user)
}

/// Create the configured bootstrap superuser unless that username is taken.
pub async fn bootstrap_superuser(state: &AppState) -> Result<BootstrapOutcome> {
    let Some(bootstrap) = state.config.bootstrap_superuser.clone() else {
        return Ok(BootstrapOutcome::Disabled);
    };

    let username =
        Username::new(&bootstrap.username).context("invalid BOOTSTRAP_SUPERUSER_USERNAME")?;
    if state
        .users
        .username_exists(&username)
        .await
        .context("failed to check bootstrap superuser")?
    {
        info!(username = %username, "bootstrap superuser already present");
        return Ok(BootstrapOutcome::AlreadyPresent);
    }

    let user = state
        .accounts()
        .create_superuser(NewAccount {
            username: bootstrap.username,
            email: bootstrap.email,
            password: Some(bootstrap.password),
            ..Default::default()
        })
        .await
        .context("failed to create bootstrap superuser")?;

    info!(target: "user.admin", user_id = %user.id, username = %user.username, "bootstrap superuser created");
    Ok(BootstrapOutcome::Created(user))
}
