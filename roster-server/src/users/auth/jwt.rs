use std::{fmt, time::Duration as StdDuration};

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Which half of the pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims for both token types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub token_type: TokenType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is invalid")]
    Invalid,
    #[error("expected a {expected:?} token")]
    WrongType { expected: TokenType },
    #[error("failed to sign token: {0}")]
    Encode(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        }
    }
}

/// Signs and verifies HS256 access and refresh tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(
        secret: &str,
        access_ttl: StdDuration,
        refresh_ttl: StdDuration,
    ) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::Encode("JWT secret must not be empty".into()));
        }
        let ttl = |d: StdDuration| {
            Duration::from_std(d).map_err(|err| TokenError::Encode(err.to_string()))
        };

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: ttl(access_ttl)?,
            refresh_ttl: ttl(refresh_ttl)?,
        })
    }

    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenType::Access)?,
            refresh: self.issue(user_id, TokenType::Refresh)?,
        })
    }

    pub fn issue(&self, user_id: Uuid, token_type: TokenType) -> Result<String, TokenError> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let now = Utc::now();

        let claims = Claims {
            sub: user_id,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| TokenError::Encode(err.to_string()))
    }

    /// Decode a token and require it to be of `expected` type.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        let claims = decode::<Claims>(token, &self.decoding, &validation)?.claims;

        if claims.token_type != expected {
            return Err(TokenError::WrongType { expected });
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(
            "test-secret",
            StdDuration::from_secs(300),
            StdDuration::from_secs(86_400),
        )
        .unwrap()
    }

    #[test]
    fn issues_and_verifies_a_pair() {
        let tokens = service();
        let user_id = Uuid::now_v7();
        let pair = tokens.issue_pair(user_id).unwrap();

        let access = tokens.verify(&pair.access, TokenType::Access).unwrap();
        assert_eq!(access.sub, user_id);
        assert_eq!(access.exp - access.iat, 300);

        let refresh = tokens.verify(&pair.refresh, TokenType::Refresh).unwrap();
        assert_eq!(refresh.sub, user_id);
        assert_eq!(refresh.exp - refresh.iat, 86_400);
        assert_ne!(access.jti, refresh.jti);
    }

    #[test]
    fn token_types_are_not_interchangeable() {
        let tokens = service();
        let pair = tokens.issue_pair(Uuid::now_v7()).unwrap();

        assert!(matches!(
            tokens.verify(&pair.refresh, TokenType::Access),
            Err(TokenError::WrongType {
                expected: TokenType::Access
            })
        ));
        assert!(matches!(
            tokens.verify(&pair.access, TokenType::Refresh),
            Err(TokenError::WrongType {
                expected: TokenType::Refresh
            })
        ));
    }

    #[test]
    fn rejects_expired_tokens() {
        let tokens = service();
        let past = Utc::now() - Duration::hours(2);
        let claims = Claims {
            sub: Uuid::now_v7(),
            exp: (past + Duration::minutes(5)).timestamp(),
            iat: past.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: TokenType::Access,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &tokens.encoding).unwrap();

        assert!(matches!(
            tokens.verify(&token, TokenType::Access),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn rejects_foreign_signatures_and_garbage() {
        let ours = service();
        let theirs = TokenService::new(
            "other-secret",
            StdDuration::from_secs(300),
            StdDuration::from_secs(300),
        )
        .unwrap();
        let token = theirs.issue(Uuid::now_v7(), TokenType::Access).unwrap();

        assert!(matches!(
            ours.verify(&token, TokenType::Access),
            Err(TokenError::Invalid)
        ));
        assert!(matches!(
            ours.verify("not-a-jwt", TokenType::Access),
            Err(TokenError::Invalid)
        ));
    }
}
