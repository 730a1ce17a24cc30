//! Repository trait definitions
//!
//! Storage is reached through a small explicit interface using RPITIT
//! (Return Position Impl Trait In Traits), so implementations are plain
//! `async fn`s without `async_trait`.
//!
//! # Example
//!
//! ```rust,ignore
//! use egp_service::repository::{Repository, RepositoryResult};
//!
//! impl Repository<UserId, User> for MyStore {
//!     async fn get(&self, id: &UserId) -> RepositoryResult<Option<User>> {
//!         Ok(self.rows.get(id).cloned())
//!     }
//!     // ... other methods
//! }
//! ```

use std::future::Future;

use super::error::RepositoryError;

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Storage interface for one entity type
///
/// # Type Parameters
///
/// - `Id`: The identifier type for the entity
/// - `Entity`: The stored record
pub trait Repository<Id, Entity>: Send + Sync {
    /// Fetch an entity by its identifier
    ///
    /// Returns `Ok(None)` if no record has that identifier.
    fn get(&self, id: &Id) -> impl Future<Output = RepositoryResult<Option<Entity>>> + Send;

    /// Fetch every entity, in the store's iteration order
    fn list(&self) -> impl Future<Output = RepositoryResult<Vec<Entity>>> + Send;

    /// Insert or replace an entity
    ///
    /// An entity without an identifier is inserted under a newly generated
    /// one. An entity with an identifier replaces the stored record, or is
    /// inserted under that identifier when none exists. Returns the stored
    /// entity with its identifier set.
    fn put(&self, entity: Entity) -> impl Future<Output = RepositoryResult<Entity>> + Send;

    /// Insert or replace an entity, reporting whether it was new
    ///
    /// Same write as [`put`](Self::put). The flag is `true` when no record
    /// existed under the identifier before this write, decided atomically
    /// with the write itself.
    fn upsert(
        &self,
        entity: Entity,
    ) -> impl Future<Output = RepositoryResult<(Entity, bool)>> + Send;

    /// Delete an entity by its identifier
    ///
    /// Returns `true` if a record was removed, `false` if none existed.
    fn delete(&self, id: &Id) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Count stored entities
    fn count(&self) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Check whether an identifier is in use
    fn exists(&self, id: &Id) -> impl Future<Output = RepositoryResult<bool>> + Send;
}
