use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use roster_core::user_management::{NewAccount, UserRole, Username, ValidationError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::jwt::{TokenPair, TokenType};
use crate::infra::{
    app_state::AppState,
    config::RegistrationRolePolicy,
    errors::{AppError, AppResult},
};
use crate::users::user_management::{CreateUserRequest, UserResponse, parse_role};

const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

/// Exchange username and password for an access/refresh pair
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<TokenPair>> {
    let Json(request) = payload?;

    // A malformed username cannot exist, so it fails like any other miss.
    let user = match Username::new(&request.username) {
        Ok(username) => state.users.find_by_username(&username).await.map_err(|err| {
            tracing::error!(error = %err, "failed to load user for login");
            AppError::internal("Internal server error")
        })?,
        Err(_) => None,
    };

    let Some(user) = user else {
        warn!(target: "auth", username = %request.username, "login failed: unknown user");
        return Err(AppError::unauthorized(BAD_CREDENTIALS));
    };

    let verified = state
        .crypto()
        .verify_password(&request.password, &user.password_hash)
        .map_err(|err| {
            tracing::error!(error = %err, user_id = %user.id, "stored credential unreadable");
            AppError::internal("Internal server error")
        })?;

    if !verified || !user.is_active {
        warn!(
            target: "auth",
            user_id = %user.id,
            active = user.is_active,
            "login failed"
        );
        return Err(AppError::unauthorized(BAD_CREDENTIALS));
    }

    let pair = state.tokens.issue_pair(user.id)?;
    info!(target: "auth", user_id = %user.id, "login succeeded");
    Ok(Json(pair))
}

/// Exchange a refresh token for a new access token
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> AppResult<Json<AccessTokenResponse>> {
    let Json(request) = payload?;

    let claims = state
        .tokens
        .verify(&request.refresh, TokenType::Refresh)
        .inspect_err(|err| warn!(target: "auth", error = %err, "refresh rejected"))?;

    let active = state
        .users
        .find_by_id(claims.sub)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to load refresh subject");
            AppError::internal("Internal server error")
        })?
        .is_some_and(|user| user.is_active);

    if !active {
        warn!(target: "auth", user_id = %claims.sub, "refresh rejected: user gone or inactive");
        return Err(AppError::unauthorized("Token is invalid or expired"));
    }

    let access = state.tokens.issue(claims.sub, TokenType::Access)?;
    info!(target: "auth", user_id = %claims.sub, "access token refreshed");
    Ok(Json(AccessTokenResponse { access }))
}

/// Public self-registration
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload?;

    let username = request
        .username
        .ok_or(ValidationError::Required("username"))?;
    let password = request
        .password
        .filter(|p| !p.is_empty())
        .ok_or(ValidationError::Required("password"))?;
    let role = parse_role(request.role.as_deref())?;

    match (state.config.registration_role_policy, role) {
        (RegistrationRolePolicy::EmployeeOnly, Some(role)) if role != UserRole::Employee => {
            return Err(ValidationError::RoleNotPermitted.into());
        }
        (RegistrationRolePolicy::CallerSupplied, Some(role)) if role != UserRole::Employee => {
            warn!(
                target: "user.admin",
                username = %username,
                role = %role,
                "self-registration requested an elevated role"
            );
        }
        _ => {}
    }

    let user = state
        .accounts()
        .create_user(NewAccount {
            username,
            email: request.email,
            password: Some(password),
            role,
            extra: Default::default(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}
