#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use anyhow::{Result, anyhow};
use axum_test::TestServer;
use roster_core::{
    auth::AuthCrypto,
    user_management::{
        ExtraFields, NewAccount, User, UserRole, infrastructure::InMemoryUserRepository,
    },
};
use roster_server::{
    infra::{
        app_state::AppState,
        config::{Config, RegistrationRolePolicy},
    },
    routes::{self, create_app},
    users::auth::TokenService,
};
use serde_json::{Value, json};

pub const PASSWORD: &str = "Sup3r-Secret!";

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub store: Arc<InMemoryUserRepository>,
}

pub fn test_config(policy: RegistrationRolePolicy) -> Config {
    Config {
        server_host: "127.0.0.1".into(),
        server_port: 0,
        database_url: None,
        jwt_secret: "integration-test-secret".into(),
        access_token_ttl: Duration::from_secs(300),
        refresh_token_ttl: Duration::from_secs(3600),
        auth_password_pepper: "integration-test-pepper".into(),
        cors_allowed_origins: Vec::new(),
        registration_role_policy: policy,
        dev_mode: true,
        bootstrap_superuser: None,
    }
}

pub fn build_test_app() -> Result<TestApp> {
    build_test_app_with(RegistrationRolePolicy::EmployeeOnly)
}

pub fn build_test_app_with(policy: RegistrationRolePolicy) -> Result<TestApp> {
    build_test_app_from(test_config(policy))
}

pub fn build_test_app_from(config: Config) -> Result<TestApp> {
    let store = Arc::new(InMemoryUserRepository::new());
    let crypto = Arc::new(AuthCrypto::insecure_for_tests(&config.auth_password_pepper)?);
    let tokens = TokenService::new(
        &config.jwt_secret,
        config.access_token_ttl,
        config.refresh_token_ttl,
    )?;

    let state = AppState::new(store.clone(), crypto, tokens, config);
    let server =
        TestServer::new(create_app(state.clone())).map_err(|err| anyhow!(err.to_string()))?;

    Ok(TestApp {
        server,
        state,
        store,
    })
}

impl TestApp {
    pub async fn seed(&self, username: &str, role: UserRole) -> User {
        self.seed_with(username, role, ExtraFields::default()).await
    }

    pub async fn seed_with(&self, username: &str, role: UserRole, extra: ExtraFields) -> User {
        self.state
            .accounts()
            .create_user(NewAccount {
                username: username.into(),
                email: Some(format!("{username}@example.com")),
                password: Some(PASSWORD.into()),
                role: Some(role),
                extra,
            })
            .await
            .expect("seed user")
    }

    /// Log in and return the response body (`access` and `refresh`).
    pub async fn login(&self, username: &str) -> Value {
        let response = self
            .server
            .post(routes::LOGIN)
            .json(&json!({ "username": username, "password": PASSWORD }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()
    }

    pub async fn access_token(&self, username: &str) -> String {
        self.login(username).await["access"]
            .as_str()
            .expect("access token")
            .to_string()
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub fn user_path(id: impl std::fmt::Display) -> String {
    format!("/api/users/{id}/")
}
