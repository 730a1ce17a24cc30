//! Storage abstraction for users
//!
//! # Features
//!
//! - **Upsert CRUD**: [`Repository`] trait with `get / list / put / delete`
//! - **In-memory backend**: [`InMemoryUserRepository`], always available
//! - **PostgreSQL backend**: `PgUserRepository`, behind the `database` feature
//!
//! # Example
//!
//! ```rust,ignore
//! use egp_service::model::User;
//! use egp_service::repository::{InMemoryUserRepository, Repository};
//!
//! let repo = InMemoryUserRepository::new();
//! let stored = repo.put(user).await?;
//! assert!(stored.id.is_some());
//! ```

mod error;
mod memory;
#[cfg(feature = "database")]
mod postgres;
mod traits;

pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use memory::InMemoryUserRepository;
#[cfg(feature = "database")]
pub use postgres::PgUserRepository;
pub use traits::{Repository, RepositoryResult};
