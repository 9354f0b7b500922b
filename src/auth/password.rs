//! Argon2id password hashing.
//!
//! Hashing is deliberately slow, so both directions run on tokio's blocking
//! pool instead of an async worker.

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use tokio::task;

use crate::config::SecurityConfig;

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(config: &SecurityConfig) -> Result<Self> {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes `plaintext` with a fresh salt, returning the PHC string.
    pub async fn hash(&self, plaintext: &str) -> Result<String> {
        let hasher = self.clone();
        let password = plaintext.to_string();

        task::spawn_blocking(move || hasher.hash_blocking(&password))
            .await
            .context("Password hashing task panicked")?
    }

    /// Returns true only when `plaintext` matches `stored_hash`.
    ///
    /// A malformed hash, or a worker failure, is a non-match.
    pub async fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        let password = plaintext.to_string();
        let stored = stored_hash.to_string();

        match task::spawn_blocking(move || Self::verify_blocking(&password, &stored)).await {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!("Password verification task failed: {e}");
                false
            }
        }
    }

    pub fn hash_blocking(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

        Ok(hash.to_string())
    }

    /// Verification needs no instance costs: they are read back from the
    /// stored hash, so hashes made under older settings still verify.
    #[must_use]
    pub fn verify_blocking(plaintext: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            tracing::warn!("Stored password hash is not a valid PHC string");
            return false;
        };

        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Generates a random password of `length` characters for bootstrap accounts.
#[must_use]
pub fn generate_password(length: usize) -> String {
    use rand::Rng;
    use rand::seq::IndexedRandom;

    const ALPHABET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!#$%&*+-=?@^_";

    let mut rng = rand::rng();
    let mut password: String = (0..length)
        .filter_map(|_| ALPHABET.choose(&mut rng).map(|b| char::from(*b)))
        .collect();

    // Guarantee at least one digit so the result passes naive complexity checks.
    if length > 0 && !password.chars().any(|c| c.is_ascii_digit()) {
        let idx = rng.random_range(0..length);
        let digit = char::from(b'0' + rng.random_range(0..10u8));
        password.replace_range(idx..=idx, &digit.to_string());
    }

    password
}
