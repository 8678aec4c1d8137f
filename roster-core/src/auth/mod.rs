//! Credential handling shared by the account manager and the login flow.

pub mod crypto;

pub use crypto::{AuthCrypto, AuthCryptoError, UNUSABLE_PASSWORD_PREFIX};
