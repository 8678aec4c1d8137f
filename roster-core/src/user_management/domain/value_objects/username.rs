use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+$").expect("username pattern compiles"));

/// Username value object with validation
///
/// Represents a validated username that follows the business rules:
/// - Required, at most 150 characters
/// - ASCII letters only (`A-Z`, `a-z`)
/// - Case is preserved; `Alice` and `alice` are distinct accounts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub const MAX_LENGTH: usize = 150;

    /// Create a new username with validation
    pub fn new(username: impl AsRef<str>) -> Result<Self, UsernameError> {
        let username = username.as_ref();

        if username.is_empty() {
            return Err(UsernameError::Empty);
        }

        if username.len() > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong);
        }

        if !USERNAME_PATTERN.is_match(username) {
            return Err(UsernameError::InvalidCharacters);
        }

        Ok(Self(username.to_string()))
    }

    /// Get the username as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the username as a String
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

/// Errors that can occur when creating a username
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsernameError {
    #[error("The Username must be set")]
    Empty,

    #[error("Username too long: maximum 150 characters allowed")]
    TooLong,

    #[error("Username must contain only letters (A-Z, a-z).")]
    InvalidCharacters,
}
