//! The single user allowed through HTTP Basic authentication

use serde::Serialize;

use super::PasswordHasher;
use crate::config::SecurityUserConfig;
use crate::error::Result;

/// Authenticated caller, inserted into request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Username the caller authenticated as
    pub username: String,
}

/// Service user with a hashed password
///
/// The plaintext password is only kept long enough to hash it.
#[derive(Debug, Clone)]
pub struct ServiceUser {
    name: String,
    password_hash: String,
}

impl ServiceUser {
    /// Build the service user from configuration
    ///
    /// When no password is configured a random one is generated and logged
    /// once at WARN, so a fresh deployment is reachable but never open.
    pub fn from_config(config: &SecurityUserConfig, hasher: &PasswordHasher) -> Result<Self> {
        let password_hash = match &config.password {
            Some(password) => hasher.hash(password)?,
            None => {
                let generated = generate_password();
                tracing::warn!(
                    user = %config.name,
                    "Using generated security password: {}. \
                     Set security.user.password before exposing this service.",
                    generated
                );
                hasher.hash(&generated)?
            }
        };

        Ok(Self {
            name: config.name.clone(),
            password_hash,
        })
    }

    /// Configured username
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check a username/password pair
    ///
    /// The password is verified even when the username is wrong so both
    /// failures cost the same.
    pub fn verify(&self, hasher: &PasswordHasher, username: &str, password: &str) -> Result<bool> {
        let password_ok = hasher.verify(password, &self.password_hash)?;
        Ok(password_ok && username == self.name)
    }
}

fn generate_password() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
