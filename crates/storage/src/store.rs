//! Connection pool, transactions, advisory locks, and savepoints.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres};

use crate::error::StorageError;
use crate::migrations::run_migrations;

/// Handle to the database. Cheap to clone; all mutation goes through [`Tx`].
#[derive(Clone, Debug)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connect, configure the pool, and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .idle_timeout(std::time::Duration::from_secs(300))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;
        run_migrations(&pool).await?;
        tracing::info!("store initialized");
        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests). Does not run migrations.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Begin a transaction. One HTTP request runs under exactly one.
    pub async fn begin(&self) -> Result<Tx, StorageError> {
        Ok(Tx { inner: self.pool.begin().await? })
    }

    /// The underlying pool, for read-only one-offs.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// One open transaction. All entity CRUD hangs off this type, split across
/// the sibling modules by entity.
///
/// Dropping without [`commit`](Tx::commit) rolls back.
pub struct Tx {
    inner: sqlx::Transaction<'static, Postgres>,
}

impl Tx {
    /// Commit all writes made under this transaction.
    pub async fn commit(self) -> Result<(), StorageError> {
        self.inner.commit().await?;
        Ok(())
    }

    /// Explicitly roll back. Equivalent to dropping, but logs intent.
    pub async fn rollback(self) -> Result<(), StorageError> {
        self.inner.rollback().await?;
        Ok(())
    }

    pub(crate) fn conn(&mut self) -> &mut PgConnection {
        &mut self.inner
    }

    /// Serialize all turns on one chat session until transaction end.
    pub async fn lock_session(&mut self, session_id: &str) -> Result<(), StorageError> {
        self.advisory_lock(&format!("session:{session_id}")).await
    }

    /// Serialize all task mutations for one user until transaction end.
    pub async fn lock_user_tasks(&mut self, user_id: &str) -> Result<(), StorageError> {
        self.advisory_lock(&format!("user:{user_id}:tasks")).await
    }

    async fn advisory_lock(&mut self, key: &str) -> Result<(), StorageError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(key)
            .execute(self.conn())
            .await?;
        Ok(())
    }

    /// Open a named savepoint. Tool handlers run under one so a failed tool
    /// rolls back only its own writes while the turn continues.
    pub async fn savepoint(&mut self, name: &str) -> Result<(), StorageError> {
        sqlx::query(&format!("SAVEPOINT {}", savepoint_ident(name)?))
            .execute(self.conn())
            .await?;
        Ok(())
    }

    /// Roll back to a savepoint, discarding writes made since.
    pub async fn rollback_to_savepoint(&mut self, name: &str) -> Result<(), StorageError> {
        sqlx::query(&format!("ROLLBACK TO SAVEPOINT {}", savepoint_ident(name)?))
            .execute(self.conn())
            .await?;
        Ok(())
    }

    /// Release a savepoint, folding its writes into the transaction.
    pub async fn release_savepoint(&mut self, name: &str) -> Result<(), StorageError> {
        sqlx::query(&format!("RELEASE SAVEPOINT {}", savepoint_ident(name)?))
            .execute(self.conn())
            .await?;
        Ok(())
    }
}

/// Savepoint names cannot be bound as parameters, so only identifier-safe
/// names are accepted.
fn savepoint_ident(name: &str) -> Result<&str, StorageError> {
    let ok = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if ok {
        Ok(name)
    } else {
        Err(StorageError::Conflict(format!("invalid savepoint name: {name}")))
    }
}

/// Guard used by every user-scoped accessor. Cross-user reads are a
/// programming error; in debug builds an empty scope aborts loudly.
pub(crate) fn assert_user_scope(user_id: &str) {
    debug_assert!(!user_id.is_empty(), "user-scoped query issued without a user id");
}
