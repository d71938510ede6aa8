//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs carrying `{"sub": "<user id>", "exp": <unix
//! seconds>}`. The extractors [`AuthUser`] and [`MaybeAuthUser`] read them
//! from the `Authorization` header.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ApiError;
use crate::state::AppState;

/// Environment variable holding the signing secret.
pub const TOKEN_SECRET_ENV: &str = "PROMPTFLOW_TOKEN_SECRET";

/// Default token lifetime: seven days.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Length of a generated signing secret in bytes.
const RANDOM_SECRET_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("bad token signature")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("could not generate a signing key")]
    KeyGeneration,

    #[error("could not sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::BadSignature,
            _ => Self::Malformed,
        }
    }
}

/// Registered claims only; `sub` is the user id in decimal.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// Issues and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &[u8], lifetime: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        }
    }

    /// Signer with a fresh random secret. Tokens do not survive a restart.
    pub fn random(lifetime: Duration) -> Result<Self, TokenError> {
        let mut secret = [0u8; RANDOM_SECRET_LEN];
        SystemRandom::new()
            .fill(&mut secret)
            .map_err(|_| TokenError::KeyGeneration)?;
        Ok(Self::new(&secret, lifetime))
    }

    /// Signer keyed from [`TOKEN_SECRET_ENV`], or a random key with a
    /// warning when it is unset or blank.
    pub fn from_env(lifetime: Duration) -> Result<Self, TokenError> {
        match std::env::var(TOKEN_SECRET_ENV) {
            Ok(secret) if !secret.trim().is_empty() => Ok(Self::new(secret.as_bytes(), lifetime)),
            _ => {
                tracing::warn!(
                    env = TOKEN_SECRET_ENV,
                    "token secret not set, using a random per-process key"
                );
                Self::random(lifetime)
            }
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a token for `user_id` valid from now.
    pub fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue_at(user_id, chrono::Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (unix seconds).
    pub fn issue_at(&self, user_id: i64, now: i64) -> Result<String, TokenError> {
        let lifetime = i64::try_from(self.lifetime.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user_id.to_string(),
            exp: now.saturating_add(lifetime),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify `token` against the current time and return the user id it
    /// was issued for.
    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        data.claims.sub.parse().map_err(|_| TokenError::Malformed)
    }
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// The authenticated caller. Rejects with 401 when no token is sent and 403
/// when the token is invalid or expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

/// The caller when a valid token is present; invalid tokens are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaybeAuthUser(pub Option<i64>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Access token required".into()))?;
        state
            .tokens
            .verify(token)
            .map(AuthUser)
            .map_err(|err| {
                tracing::debug!(%err, "rejected bearer token");
                ApiError::Forbidden("Invalid or expired token".into())
            })
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeAuthUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(
            bearer_token(parts).and_then(|token| state.tokens.verify(token).ok()),
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
