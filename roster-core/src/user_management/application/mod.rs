pub mod account_manager;
pub mod admin_service;

pub use account_manager::{AccountManager, ExtraFields, NewAccount};
pub use admin_service::{
    CreateUserCommand, UpdateUserCommand, UserAdminError, UserAdministrationService,
};
