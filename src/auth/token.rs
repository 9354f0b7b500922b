//! Signed, time-limited access tokens.
//!
//! Tokens are compact JWS strings (`header.claims.signature`) carrying the user
//! id as `sub`. There is no revocation list: a token is valid while its
//! signature checks out and `exp` has not passed.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::config::SecurityConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Any reason a token is unusable. Malformed, forged and expired tokens are
/// deliberately indistinguishable to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid token")]
pub struct InvalidToken;

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenIssuer {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], algorithm: Algorithm, ttl: Duration, leeway_seconds: u64) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.leeway = leeway_seconds;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
            validation,
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Result<Self> {
        let algorithm = Algorithm::from_str(&config.algorithm)
            .with_context(|| format!("Unknown token algorithm: {}", config.algorithm))?;

        Ok(Self::new(
            config.secret_key.as_bytes(),
            algorithm,
            Duration::minutes(i64::from(config.access_token_expire_minutes)),
            config.token_leeway_seconds,
        ))
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, subject: i32) -> Result<IssuedToken> {
        self.issue_at(subject, Utc::now())
    }

    /// Issues a token as if the current time were `issued_at`.
    pub fn issue_at(&self, subject: i32, issued_at: DateTime<Utc>) -> Result<IssuedToken> {
        let expires_at = issued_at + self.ttl;
        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .context("Failed to sign access token")?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Returns the user id the token was issued for.
    pub fn validate(&self, token: &str) -> Result<i32, InvalidToken> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!("Rejected access token: {e}");
            InvalidToken
        })?;

        data.claims.sub.parse::<i32>().map_err(|_| InvalidToken)
    }
}
