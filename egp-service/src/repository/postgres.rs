//! PostgreSQL user storage

use sqlx::PgPool;

use super::{
    Repository, RepositoryError, RepositoryErrorKind, RepositoryOperation, RepositoryResult,
};
use crate::model::{User, UserId};

const USER_COLUMNS: &str = "id, username, email, display_name, password_hash";

/// PostgreSQL-backed user store
///
/// Identifiers come from the `BIGSERIAL` sequence of the `users` table.
/// Writes with an explicit id push that sequence past the id, never back.
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `users` table if missing
    ///
    /// Should be called once during application startup.
    pub async fn initialize(&self) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                username TEXT NOT NULL,
                email TEXT NOT NULL,
                display_name TEXT,
                password_hash TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(RepositoryOperation::Initialize, e))?;

        tracing::debug!("users table ready");
        Ok(())
    }

    /// Borrow the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert(&self, user: User) -> RepositoryResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, email, display_name, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(RepositoryOperation::Put, e))?;

        Ok(row.into())
    }

    async fn write_with_id(&self, id: UserId, user: User) -> RepositoryResult<(User, bool)> {
        let put_err = |e: sqlx::Error| {
            map_sqlx_error(RepositoryOperation::Put, e).with_entity("User", id.to_string())
        };

        let mut tx = self.pool.begin().await.map_err(put_err)?;

        // Self-conflicting and blocks plain INSERTs, so no nextval() runs
        // between the write and the sequence bump below
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(put_err)?;

        let row = sqlx::query_as::<_, UpsertRow>(&format!(
            "INSERT INTO users (id, username, email, display_name, password_hash) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET \
                username = EXCLUDED.username, \
                email = EXCLUDED.email, \
                display_name = EXCLUDED.display_name, \
                password_hash = EXCLUDED.password_hash \
             RETURNING {USER_COLUMNS}, (xmax = 0) AS inserted"
        ))
        .bind(id.get())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(put_err)?;

        // Only ever move the sequence forward
        sqlx::query(
            "SELECT setval(s.seq, $1) \
             FROM (SELECT pg_get_serial_sequence('users', 'id')::regclass AS seq) s \
             WHERE $1 > COALESCE(pg_sequence_last_value(s.seq), 0)",
        )
        .bind(id.get())
        .execute(&mut *tx)
        .await
        .map_err(put_err)?;

        tx.commit().await.map_err(put_err)?;

        Ok((row.user.into(), row.inserted))
    }
}

impl Repository<UserId, User> for PgUserRepository {
    async fn get(&self, id: &UserId) -> RepositoryResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(RepositoryOperation::Get, e).with_entity("User", id.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn list(&self) -> RepositoryResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(RepositoryOperation::List, e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn put(&self, user: User) -> RepositoryResult<User> {
        let (user, _) = self.upsert(user).await?;
        Ok(user)
    }

    async fn upsert(&self, user: User) -> RepositoryResult<(User, bool)> {
        match user.id {
            Some(id) => self.write_with_id(id, user).await,
            None => Ok((self.insert(user).await?, true)),
        }
    }

    async fn delete(&self, id: &UserId) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                map_sqlx_error(RepositoryOperation::Delete, e).with_entity("User", id.to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> RepositoryResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(RepositoryOperation::Count, e))?;

        Ok(count.max(0) as u64)
    }

    async fn exists(&self, id: &UserId) -> RepositoryResult<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                map_sqlx_error(RepositoryOperation::Exists, e).with_entity("User", id.to_string())
            })
    }
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    display_name: Option<String>,
    password_hash: Option<String>,
}

#[derive(sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    user: UserRow,
    inserted: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: Some(UserId::new(row.id)),
            username: row.username,
            email: row.email,
            display_name: row.display_name,
            password_hash: row.password_hash,
        }
    }
}

/// Classify a sqlx error into a repository error
fn map_sqlx_error(operation: RepositoryOperation, err: sqlx::Error) -> RepositoryError {
    let kind = match &err {
        sqlx::Error::RowNotFound => RepositoryErrorKind::NotFound,
        sqlx::Error::PoolTimedOut => RepositoryErrorKind::Timeout,
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
            RepositoryErrorKind::ConnectionFailed
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            RepositoryErrorKind::SerializationError
        }
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryErrorKind::AlreadyExists,
        sqlx::Error::Database(db) if db.is_check_violation() || db.is_foreign_key_violation() => {
            RepositoryErrorKind::ConstraintViolation
        }
        _ => RepositoryErrorKind::DatabaseError,
    };

    RepositoryError::new(operation, kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_maps_to_stored_user() {
        let user: User = UserRow {
            id: 9,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            display_name: None,
            password_hash: Some("hash".to_string()),
        }
        .into();
        assert_eq!(user.id, Some(UserId::new(9)));
        assert_eq!(user.password_hash.as_deref(), Some("hash"));
    }

    #[test]
    fn test_error_classification() {
        let err = map_sqlx_error(RepositoryOperation::List, sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind, RepositoryErrorKind::Timeout);
        assert!(err.is_retriable());

        let err = map_sqlx_error(RepositoryOperation::Put, sqlx::Error::PoolClosed);
        assert_eq!(err.kind, RepositoryErrorKind::ConnectionFailed);
        assert_eq!(err.operation, RepositoryOperation::Put);

        let err = map_sqlx_error(RepositoryOperation::Get, sqlx::Error::RowNotFound);
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL; set EGP_TEST_DATABASE_URL (table users is truncated)"]
    async fn test_explicit_ids_never_rewind_sequence() {
        let url = std::env::var("EGP_TEST_DATABASE_URL").unwrap();
        let repo = PgUserRepository::new(PgPool::connect(&url).await.unwrap());
        repo.initialize().await.unwrap();
        sqlx::query("TRUNCATE users RESTART IDENTITY")
            .execute(repo.pool())
            .await
            .unwrap();

        let user = |name: &str| User {
            id: None,
            username: name.to_string(),
            email: format!("{name}@example.com"),
            display_name: None,
            password_hash: None,
        };

        for name in ["a", "b", "c"] {
            repo.put(user(name)).await.unwrap();
        }
        assert!(repo.delete(&UserId::new(3)).await.unwrap());

        let (_, inserted) = repo.upsert(user("a2").with_id(UserId::new(1))).await.unwrap();
        assert!(!inserted);
        let next = repo.put(user("d")).await.unwrap();
        assert_eq!(next.id, Some(UserId::new(4)));

        let (_, inserted) = repo.upsert(user("e").with_id(UserId::new(50))).await.unwrap();
        assert!(inserted);
        let next = repo.put(user("f")).await.unwrap();
        assert_eq!(next.id, Some(UserId::new(51)));
    }
}
