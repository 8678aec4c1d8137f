//! Roster core: user accounts with Admin, Manager and Employee roles.
//!
//! - [`user_management`] holds the user model, the account manager and the
//!   role-scoped user API service.
//! - [`rbac`] decides what each role may see and change.
//! - [`auth`] hashes and verifies passwords.
//!
//! HTTP transport and token handling live in `roster-server`.

pub mod auth;
pub mod rbac;
pub mod user_management;
