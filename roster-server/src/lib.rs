//! HTTP surface for Roster.
//!
//! [`routes::create_app`] assembles the router; [`infra`] holds configuration,
//! shared state and the error envelope; [`users`] holds the handlers.

pub mod infra;
pub mod routes;
pub mod users;
