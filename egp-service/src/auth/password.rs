//! Password hashing using Argon2id
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`), so
//! verification reads its parameters from the hash itself.
//!
//! # Example
//!
//! ```rust,ignore
//! use egp_service::auth::PasswordHasher;
//! use egp_service::config::PasswordConfig;
//!
//! let hasher = PasswordHasher::new(&PasswordConfig::default())?;
//! let hash = hasher.hash("correct horse battery")?;
//! assert!(hasher.verify("correct horse battery", &hash)?);
//! ```

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

use crate::config::PasswordConfig;
use crate::error::{Error, Result};

/// Password hasher using Argon2id
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
    min_password_length: usize,
}

impl PasswordHasher {
    /// Create a hasher from configuration
    ///
    /// Fails when the Argon2 cost parameters are out of range.
    pub fn new(config: &PasswordConfig) -> Result<Self> {
        let params = Params::new(
            config.memory_cost_kib,
            config.time_cost,
            config.parallelism,
            None,
        )
        .map_err(|e| Error::Auth(format!("Invalid Argon2 parameters: {}", e)))?;

        Ok(Self {
            params,
            min_password_length: config.min_password_length,
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt
    ///
    /// Returns `Error::ValidationError` when the password is shorter than
    /// the configured minimum.
    pub fn hash(&self, password: &str) -> Result<String> {
        if password.chars().count() < self.min_password_length {
            return Err(Error::ValidationError(format!(
                "Password must be at least {} characters",
                self.min_password_length
            )));
        }

        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Auth(format!("Failed to hash password: {}", e)))?;

        Ok(hash.to_string())
    }

    /// Verify a password against a PHC hash
    ///
    /// A mismatch is `Ok(false)`; a malformed hash is an error.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| Error::Auth(format!("Invalid password hash format: {}", e)))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Auth(format!("Password verification failed: {}", e))),
        }
    }

    /// Whether a stored hash was produced with other parameters than ours
    pub fn needs_rehash(&self, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return true;
        };

        if parsed_hash.algorithm != Algorithm::Argon2id.ident()
            || parsed_hash.version != Some(Version::V0x13.into())
        {
            return true;
        }

        match Params::try_from(&parsed_hash) {
            Ok(stored) => {
                stored.m_cost() != self.params.m_cost()
                    || stored.t_cost() != self.params.t_cost()
                    || stored.p_cost() != self.params.p_cost()
            }
            Err(_) => true,
        }
    }

    /// Minimum accepted password length, in characters
    pub fn min_password_length(&self) -> usize {
        self.min_password_length
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Cheap parameters so tests stay fast
    pub(crate) fn fast_config() -> PasswordConfig {
        PasswordConfig {
            memory_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
            min_password_length: 8,
        }
    }

    pub(crate) fn fast_hasher() -> PasswordHasher {
        PasswordHasher::new(&fast_config()).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let hash = hasher.hash("test_password_123").unwrap();
        assert!(hash.starts_with("$argon2id$"));

        assert!(hasher.verify("test_password_123", &hash).unwrap());
        assert!(!hasher.verify("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_password_too_short() {
        let result = fast_hasher().hash("short");
        match result {
            Err(Error::ValidationError(msg)) => assert!(msg.contains("at least 8 characters")),
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_min_length() {
        let hasher = PasswordHasher::new(&PasswordConfig {
            min_password_length: 12,
            ..fast_config()
        })
        .unwrap();

        assert!(hasher.hash("0123456789").is_err());
        assert!(hasher.hash("012345678901").is_ok());
        assert_eq!(hasher.min_password_length(), 12);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = PasswordHasher::new(&PasswordConfig {
            parallelism: 0,
            ..fast_config()
        });
        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[test]
    fn test_needs_rehash() {
        let hasher = fast_hasher();
        let hash = hasher.hash("test_password_123").unwrap();
        assert!(!hasher.needs_rehash(&hash));

        let stronger = PasswordHasher::new(&PasswordConfig {
            memory_cost_kib: 2048,
            ..fast_config()
        })
        .unwrap();
        assert!(stronger.needs_rehash(&hash));
        assert!(stronger.needs_rehash("not_a_valid_hash"));
    }

    #[test]
    fn test_invalid_hash_format() {
        assert!(fast_hasher().verify("password", "not_a_valid_hash").is_err());
    }

    #[test]
    fn test_salts_differ() {
        let hasher = fast_hasher();
        let hash1 = hasher.hash("test_password_123").unwrap();
        let hash2 = hasher.hash("test_password_123").unwrap();
        assert_ne!(hash1, hash2);
        assert!(hasher.verify("test_password_123", &hash2).unwrap());
    }
}
