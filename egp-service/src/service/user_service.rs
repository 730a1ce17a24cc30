//! CRUD orchestration for users
//!
//! Converts between [`UserDto`] and [`User`], hashes passwords, and talks to
//! the store only through the [`Repository`] trait.

use crate::auth::PasswordHasher;
use crate::error::Result;
use crate::model::{User, UserDto, UserId};
use crate::repository::Repository;

/// User operations over a repository
#[derive(Debug, Clone)]
pub struct UserService<R> {
    repository: R,
    hasher: PasswordHasher,
}

impl<R> UserService<R>
where
    R: Repository<UserId, User>,
{
    /// Create a service from its collaborators
    pub fn new(repository: R, hasher: PasswordHasher) -> Self {
        Self { repository, hasher }
    }

    /// The underlying repository
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Every stored user, in storage order
    pub async fn get_all_users(&self) -> Result<Vec<UserDto>> {
        let users = self.repository.list().await?;
        tracing::debug!(count = users.len(), "Listed users");
        Ok(users.into_iter().map(UserDto::from).collect())
    }

    /// One user, or `None` when the id is unknown
    pub async fn get_user_by_id(&self, id: UserId) -> Result<Option<UserDto>> {
        let user = self.repository.get(&id).await?;
        if user.is_none() {
            tracing::debug!(user_id = %id, "User not found");
        }
        Ok(user.map(UserDto::from))
    }

    /// Store a new user under a generated id
    ///
    /// Any id supplied by the client is discarded.
    pub async fn create_user(&self, dto: UserDto) -> Result<UserDto> {
        let mut user = self.to_entity(dto).await?;
        user.id = None;

        let stored = self.repository.put(user).await?;
        tracing::info!(user_id = ?stored.id, username = %stored.username, "Created user");
        Ok(stored.into())
    }

    /// Replace the user stored under `id`
    ///
    /// The id in the path wins over any id in the body. When nothing is
    /// stored under `id` yet, the user is created there.
    pub async fn update_user(&self, id: UserId, dto: UserDto) -> Result<UserDto> {
        let user = self.to_entity(dto).await?.with_id(id);

        let (stored, inserted) = self.repository.upsert(user).await?;
        if inserted {
            tracing::warn!(user_id = %id, "Update target did not exist, created it");
        } else {
            tracing::info!(user_id = %id, "Updated user");
        }
        Ok(stored.into())
    }

    /// Remove a user; unknown ids are ignored
    pub async fn delete_user(&self, id: UserId) -> Result<()> {
        if self.repository.delete(&id).await? {
            tracing::info!(user_id = %id, "Deleted user");
        } else {
            tracing::debug!(user_id = %id, "Delete of unknown user ignored");
        }
        Ok(())
    }

    async fn to_entity(&self, mut dto: UserDto) -> Result<User> {
        let password_hash = match dto.password.take() {
            Some(password) => {
                let hasher = self.hasher.clone();
                Some(tokio::task::spawn_blocking(move || hasher.hash(&password)).await??)
            }
            None => None,
        };
        Ok(User::from_dto(dto, password_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::tests::fast_hasher;
    use crate::error::Error;
    use crate::repository::{InMemoryUserRepository, RepositoryResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service() -> UserService<InMemoryUserRepository> {
        UserService::new(InMemoryUserRepository::new(), fast_hasher())
    }

    fn ada() -> UserDto {
        UserDto::new("ada", "ada@example.com").with_display_name("Ada Lovelace")
    }

    #[tokio::test]
    async fn test_create_then_get_returns_equal_dto() {
        let service = service();
        let created = service.create_user(ada()).await.unwrap();
        let id = created.id.unwrap();

        let fetched = service.get_user_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.display_name.as_deref(), Some("Ada Lovelace"));
    }

    #[tokio::test]
    async fn test_create_ignores_client_id() {
        let service = service();
        let mut dto = ada();
        dto.id = Some(UserId::new(99));

        let created = service.create_user(dto).await.unwrap();
        assert_eq!(created.id, Some(UserId::new(1)));
        assert!(service.get_user_by_id(UserId::new(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_then_get_is_absent() {
        let service = service();
        let id = service.create_user(ada()).await.unwrap().id.unwrap();

        service.delete_user(id).await.unwrap();
        assert!(service.get_user_by_id(id).await.unwrap().is_none());

        // Second delete is a no-op
        service.delete_user(id).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_of_unknown_id_creates_without_collisions() {
        let service = service();
        let id = UserId::new(5);

        let updated = service
            .update_user(id, UserDto::new("grace", "grace@example.com"))
            .await
            .unwrap();
        assert_eq!(updated.id, Some(id));

        let next = service.create_user(ada()).await.unwrap();
        assert_ne!(next.id, Some(id));
        assert_eq!(service.get_all_users().await.unwrap().len(), 2);
    }

    /// Store that records how often `exists` is consulted
    #[derive(Default)]
    struct ExistsSpy {
        inner: InMemoryUserRepository,
        exists_calls: AtomicUsize,
    }

    impl Repository<UserId, User> for ExistsSpy {
        async fn get(&self, id: &UserId) -> RepositoryResult<Option<User>> {
            self.inner.get(id).await
        }

        async fn list(&self) -> RepositoryResult<Vec<User>> {
            self.inner.list().await
        }

        async fn put(&self, user: User) -> RepositoryResult<User> {
            self.inner.put(user).await
        }

        async fn upsert(&self, user: User) -> RepositoryResult<(User, bool)> {
            self.inner.upsert(user).await
        }

        async fn delete(&self, id: &UserId) -> RepositoryResult<bool> {
            self.inner.delete(id).await
        }

        async fn count(&self) -> RepositoryResult<u64> {
            self.inner.count().await
        }

        async fn exists(&self, id: &UserId) -> RepositoryResult<bool> {
            self.exists_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.exists(id).await
        }
    }

    #[tokio::test]
    async fn test_update_decides_creation_in_one_write() {
        let service = UserService::new(ExistsSpy::default(), fast_hasher());

        service
            .update_user(UserId::new(3), UserDto::new("grace", "grace@example.com"))
            .await
            .unwrap();
        service
            .update_user(UserId::new(3), UserDto::new("grace", "grace@navy.mil"))
            .await
            .unwrap();

        assert_eq!(service.repository().exists_calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.repository().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_path_id_wins_and_replaces_fields() {
        let service = service();
        let id = service.create_user(ada()).await.unwrap().id.unwrap();

        let mut dto = UserDto::new("ada2", "ada2@example.com");
        dto.id = Some(UserId::new(42));
        let updated = service.update_user(id, dto).await.unwrap();

        assert_eq!(updated.id, Some(id));
        assert_eq!(updated.username, "ada2");
        assert!(updated.display_name.is_none());
        assert!(service.get_user_by_id(UserId::new(42)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_hashed_and_never_returned() {
        let service = service();
        let created = service
            .create_user(ada().with_password("correct-horse"))
            .await
            .unwrap();
        assert!(created.password.is_none());

        let stored = service
            .repository()
            .get(&created.id.unwrap())
            .await
            .unwrap()
            .unwrap();
        let hash = stored.password_hash.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(fast_hasher().verify("correct-horse", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_short_password_rejected() {
        let result = service().create_user(ada().with_password("short")).await;
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_update_without_password_clears_hash() {
        let service = service();
        let id = service
            .create_user(ada().with_password("correct-horse"))
            .await
            .unwrap()
            .id
            .unwrap();

        service.update_user(id, ada()).await.unwrap();
        let stored = service.repository().get(&id).await.unwrap().unwrap();
        assert!(stored.password_hash.is_none());
    }

    #[tokio::test]
    async fn test_get_all_in_id_order() {
        let service = service();
        service.create_user(ada()).await.unwrap();
        service
            .create_user(UserDto::new("grace", "grace@example.com"))
            .await
            .unwrap();

        let names: Vec<_> = service
            .get_all_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["ada", "grace"]);
    }
}
