//! In-memory user storage

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{Repository, RepositoryError, RepositoryOperation, RepositoryResult};
use crate::model::{User, UserId};

#[derive(Debug)]
struct Inner {
    rows: BTreeMap<UserId, User>,
    /// `None` once `i64::MAX` has been handed out or written
    next_id: Option<i64>,
}

impl Inner {
    fn allocate(&mut self) -> RepositoryResult<UserId> {
        let id = self.next_id.ok_or_else(|| {
            RepositoryError::constraint_violation(
                RepositoryOperation::Put,
                "User id sequence exhausted",
            )
        })?;
        self.next_id = id.checked_add(1);
        Ok(UserId::new(id))
    }

    fn reserve(&mut self, id: UserId) {
        if self.next_id.is_some_and(|next| id.get() >= next) {
            self.next_id = id.get().checked_add(1);
        }
    }

    fn write(&mut self, mut user: User) -> RepositoryResult<(User, bool)> {
        let id = match user.id {
            Some(id) => {
                self.reserve(id);
                id
            }
            None => self.allocate()?,
        };

        user.id = Some(id);
        let inserted = self.rows.insert(id, user.clone()).is_none();
        Ok((user, inserted))
    }
}

/// Process-local user store
///
/// Cloning shares the same underlying map. Identifiers start at 1 and only
/// ever grow; an explicit id written through [`Repository::put`] pushes the
/// sequence past it.
#[derive(Debug, Clone)]
pub struct InMemoryUserRepository {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryUserRepository {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                rows: BTreeMap::new(),
                next_id: Some(1),
            })),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository<UserId, User> for InMemoryUserRepository {
    async fn get(&self, id: &UserId) -> RepositoryResult<Option<User>> {
        Ok(self.inner.read().await.rows.get(id).cloned())
    }

    async fn list(&self) -> RepositoryResult<Vec<User>> {
        Ok(self.inner.read().await.rows.values().cloned().collect())
    }

    async fn put(&self, user: User) -> RepositoryResult<User> {
        let (user, _) = self.inner.write().await.write(user)?;
        Ok(user)
    }

    async fn upsert(&self, user: User) -> RepositoryResult<(User, bool)> {
        self.inner.write().await.write(user)
    }

    async fn delete(&self, id: &UserId) -> RepositoryResult<bool> {
        Ok(self.inner.write().await.rows.remove(id).is_some())
    }

    async fn count(&self) -> RepositoryResult<u64> {
        Ok(self.inner.read().await.rows.len() as u64)
    }

    async fn exists(&self, id: &UserId) -> RepositoryResult<bool> {
        Ok(self.inner.read().await.rows.contains_key(id))
    }
}
