//! User accounts: the domain model, account creation and the role-scoped
//! user API, plus the store adapters behind it.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::*;
pub use domain::*;
