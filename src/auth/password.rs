use anyhow::Context;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

use crate::config::PasswordConfig;

/// One-way password hashing with a configurable Argon2id cost.
#[derive(Clone)]
pub struct Credentials {
    params: Params,
}

impl Credentials {
    pub fn new(cfg: &PasswordConfig) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 parameters: {e}"))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// True iff `plain` matches `digest`. A malformed digest never matches.
    ///
    /// Cost parameters are read from the digest itself, so hashes made under
    /// an older configuration keep verifying.
    pub fn verify(&self, digest: &str, plain: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "argon2 parse hash error");
                return false;
            }
        };
        self.argon2()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }

    /// `hash` on the blocking thread pool, keeping Argon2 off the async workers.
    pub async fn spawn_hash(&self, plain: &str) -> anyhow::Result<String> {
        let creds = self.clone();
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || creds.hash(&plain))
            .await
            .context("password hashing task")?
    }

    /// `verify` on the blocking thread pool.
    pub async fn spawn_verify(&self, digest: &str, plain: &str) -> anyhow::Result<bool> {
        let creds = self.clone();
        let (digest, plain) = (digest.to_owned(), plain.to_owned());
        tokio::task::spawn_blocking(move || creds.verify(&digest, &plain))
            .await
            .context("password verification task")
    }
}

#[cfg(test)]
pub(crate) fn fast_credentials() -> Credentials {
    Credentials::new(&PasswordConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .expect("valid test params")
}
