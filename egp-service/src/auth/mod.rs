//! Credentials: password hashing and the configured service user
//!
//! # Example
//!
//! ```rust,ignore
//! use egp_service::auth::{PasswordHasher, ServiceUser};
//!
//! let hasher = PasswordHasher::new(&config.security.password)?;
//! let user = ServiceUser::from_config(&config.security.user, &hasher)?;
//! assert!(user.verify(&hasher, "user", "the-password")?);
//! ```

pub mod password;
pub mod service_user;

pub use password::PasswordHasher;
pub use service_user::{Principal, ServiceUser};
