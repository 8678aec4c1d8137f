//! Route table.
//!
//! Every API path answers both with and without its trailing slash.

use axum::{
    Json, Router, middleware,
    routing::{MethodRouter, get, post},
};
use serde_json::{Value, json};

use crate::infra::app_state::AppState;
use crate::users::{
    auth::{auth_middleware, handlers as auth_handlers},
    user_management,
};

pub const LOGIN: &str = "/api/login/";
pub const TOKEN_REFRESH: &str = "/api/token/refresh/";
pub const REGISTER: &str = "/api/register/";
pub const USERS: &str = "/api/users/";
pub const USER_ITEM: &str = "/api/users/{id}/";
pub const PROFILE: &str = "/api/profile/";
pub const HEALTH: &str = "/health";

/// Build the full application router with state applied.
pub fn create_app(state: AppState) -> Router {
    create_api_router(state.clone())
        .route(HEALTH, get(health))
        .with_state(state)
}

pub fn create_api_router(state: AppState) -> Router<AppState> {
    let public = Router::<AppState>::new()
        .route_both(LOGIN, post(auth_handlers::login))
        .route_both(TOKEN_REFRESH, post(auth_handlers::refresh))
        .route_both(REGISTER, post(auth_handlers::register));

    let protected = Router::<AppState>::new()
        .route_both(
            USERS,
            get(user_management::list_users_handler).post(user_management::create_user_handler),
        )
        .route_both(
            USER_ITEM,
            get(user_management::get_user_handler)
                .put(user_management::update_user_handler)
                .patch(user_management::partial_update_user_handler)
                .delete(user_management::delete_user_handler),
        )
        .route_both(PROFILE, get(user_management::profile_handler))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

trait RouteBothSlashes {
    fn route_both(self, path: &str, handler: MethodRouter<AppState>) -> Self;
}

impl RouteBothSlashes for Router<AppState> {
    /// Register `path` and its slash-less twin.
    fn route_both(self, path: &str, handler: MethodRouter<AppState>) -> Self {
        let bare = path.trim_end_matches('/');
        self.route(bare, handler.clone())
            .route(&format!("{bare}/"), handler)
    }
}
