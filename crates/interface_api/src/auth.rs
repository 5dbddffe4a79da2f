//! Caller authentication
//!
//! Callers present an HS256 JWT whose subject is their [`Identity`]. A
//! verified token is the only way the service learns who signed a call.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::Identity;

/// Upper bound on token lifetime (ten years)
const MAX_EXPIRATION_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Caller identity
    pub sub: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

/// Auth errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token subject is not a valid identity: {0}")]
    InvalidSubject(String),
}

/// Issues and verifies caller tokens
#[derive(Clone)]
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiration: Duration,
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

impl TokenAuthority {
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiration: Duration::seconds(
                i64::try_from(expiration_secs)
                    .unwrap_or(MAX_EXPIRATION_SECS)
                    .min(MAX_EXPIRATION_SECS),
            ),
        }
    }

    /// Issues a token for `identity`
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token cannot be encoded
    pub fn issue(&self, identity: Identity) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.to_string(),
            exp: (now + self.expiration).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Verifies a token, with or without a `Bearer ` prefix, and returns the
    /// caller identity
    ///
    /// # Errors
    ///
    /// - `AuthError::MissingToken` for an empty token
    /// - `AuthError::TokenExpired` past the expiry
    /// - `AuthError::InvalidToken` for a bad signature or malformed token
    /// - `AuthError::InvalidSubject` if the subject is not an identity
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })?;

        data.claims
            .sub
            .parse()
            .map_err(|_| AuthError::InvalidSubject(data.claims.sub.clone()))
    }
}
