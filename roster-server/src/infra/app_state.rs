use std::{fmt, sync::Arc};

use roster_core::auth::AuthCrypto;
use roster_core::user_management::{AccountManager, UserAdministrationService, UserRepository};

use crate::infra::config::Config;
use crate::users::auth::jwt::TokenService;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub user_admin: Arc<UserAdministrationService>,
    pub tokens: Arc<TokenService>,
    pub config: Arc<Config>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        crypto: Arc<AuthCrypto>,
        tokens: TokenService,
        config: Config,
    ) -> Self {
        let user_admin = Arc::new(UserAdministrationService::new(Arc::clone(&users), crypto));
        Self {
            users,
            user_admin,
            tokens: Arc::new(tokens),
            config: Arc::new(config),
        }
    }

    pub fn accounts(&self) -> &AccountManager {
        self.user_admin.accounts()
    }

    pub fn crypto(&self) -> &AuthCrypto {
        self.accounts().crypto()
    }
}
