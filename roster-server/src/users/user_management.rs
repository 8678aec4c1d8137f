use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use roster_core::rbac::{self, Operation};
use roster_core::user_management::{
    CreateUserCommand, UpdateUserCommand, User, UserAdminError, UserRole, ValidationError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

/// Public representation of a user. The password hash never leaves the
/// server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub role: UserRole,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.to_string(),
            email: user.email.as_ref().map(|e| e.to_string()),
            role: user.role,
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

/// Body for `POST /api/users/` and `POST /api/register/`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Body for `PUT` and `PATCH` on `/api/users/{id}/`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Roles arrive as text so unknown values surface as a field error.
pub(crate) fn parse_role(raw: Option<&str>) -> Result<Option<UserRole>, ValidationError> {
    raw.map(|r| r.parse::<UserRole>().map_err(ValidationError::from))
        .transpose()
}

/// A malformed id cannot name any user, so it answers like an absent one.
fn user_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| UserAdminError::UserNotFound.into())
}

/// Gate a mutation on the actor's role ahead of any input handling.
fn require(actor: &User, operation: Operation) -> Result<(), AppError> {
    rbac::authorize(actor.role, operation).map_err(|denied| UserAdminError::from(denied).into())
}

impl UpdateUserRequest {
    fn into_command(self) -> Result<UpdateUserCommand, ValidationError> {
        Ok(UpdateUserCommand {
            role: parse_role(self.role.as_deref())?,
            username: self.username,
            email: self.email,
            password: self.password,
        })
    }
}

/// List users visible to the caller
pub async fn list_users_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = state.user_admin.list_users(&actor).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Create a user (Admin only)
pub async fn create_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    require(&actor, Operation::Create)?;
    let Json(request) = payload?;

    let command = CreateUserCommand {
        username: request.username.ok_or(ValidationError::Required("username"))?,
        email: request.email,
        password: request.password,
        role: parse_role(request.role.as_deref())?,
    };

    let user = state.user_admin.create_user(&actor, command).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Retrieve one user within the caller's scope
pub async fn get_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<UserResponse>> {
    let user = state.user_admin.get_user(&actor, user_id(path)?).await?;
    Ok(Json(user.into()))
}

/// Full update; `username` must be present
pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> AppResult<Json<UserResponse>> {
    require(&actor, Operation::Update)?;
    let user_id = user_id(path)?;
    let Json(request) = payload?;

    if request.username.is_none() {
        return Err(ValidationError::Required("username").into());
    }

    let user = state
        .user_admin
        .update_user(&actor, user_id, request.into_command()?)
        .await?;
    Ok(Json(user.into()))
}

/// Partial update
pub async fn partial_update_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> AppResult<Json<UserResponse>> {
    require(&actor, Operation::Update)?;
    let user_id = user_id(path)?;
    let Json(request) = payload?;

    let user = state
        .user_admin
        .update_user(&actor, user_id, request.into_command()?)
        .await?;
    Ok(Json(user.into()))
}

/// Delete a user (Admin only)
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<StatusCode> {
    require(&actor, Operation::Delete)?;
    state.user_admin.delete_user(&actor, user_id(path)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's own record
pub async fn profile_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
) -> AppResult<Json<UserResponse>> {
    let user = state.user_admin.profile(&actor).await?;
    Ok(Json(user.into()))
}
