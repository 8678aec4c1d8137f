use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized email address
///
/// Surrounding whitespace is stripped and the domain part (after the last
/// `@`) is lower-cased. The local part is kept verbatim since mailbox names
/// may be case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub const MAX_LENGTH: usize = 254;

    /// Parse and normalize an email address.
    pub fn new(email: impl AsRef<str>) -> Result<Self, EmailError> {
        let email = email.as_ref().trim();

        if email.is_empty() {
            return Err(EmailError::Empty);
        }

        if email.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong);
        }

        let (local, domain) = email.rsplit_once('@').ok_or(EmailError::InvalidFormat)?;
        if local.is_empty() || domain.is_empty() || domain.chars().any(char::is_whitespace) {
            return Err(EmailError::InvalidFormat);
        }

        Ok(Self(format!("{local}@{}", domain.to_lowercase())))
    }

    /// Normalize an optional raw value; blank input means "no email".
    pub fn parse_optional(raw: Option<&str>) -> Result<Option<Self>, EmailError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => Self::new(value).map(Some),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmailError {
    #[error("Email cannot be empty")]
    Empty,

    #[error("Email too long: maximum 254 characters allowed")]
    TooLong,

    #[error("Enter a valid email address.")]
    InvalidFormat,
}
