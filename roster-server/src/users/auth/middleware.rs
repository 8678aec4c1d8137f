use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::jwt::TokenType;
use crate::infra::{app_state::AppState, errors::AppError};

/// Resolve the bearer access token to an active user and attach it to the
/// request. Runs before any handler or policy check.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&request)?;

    let claims = state
        .tokens
        .verify(token, TokenType::Access)
        .map_err(|err| {
            debug!(target: "auth", error = %err, "rejected access token");
            invalid_token()
        })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to load token subject");
            AppError::internal("Internal server error")
        })?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::unauthorized("User not found or inactive"))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn extract_bearer_token(request: &Request) -> Result<&str, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Authentication credentials were not provided."))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(invalid_token)
}

fn invalid_token() -> AppError {
    AppError::unauthorized("Given token not valid for any token type")
}
