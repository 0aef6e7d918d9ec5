//! User rows.

use quill_core::User;
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::error::StorageError;
use crate::store::Tx;

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_active, is_verified, created_at, updated_at";

fn row_to_user(row: &PgRow) -> Result<User, StorageError> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        is_active: row.try_get("is_active")?,
        is_verified: row.try_get("is_verified")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Tx {
    /// Insert a new user. Fails with `Duplicate` on username/email collision.
    pub async fn create_user(&mut self, user: &User) -> Result<(), StorageError> {
        sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)"
        ))
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_verified)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.conn())
        .await?;
        Ok(())
    }

    pub async fn get_user_by_id(&mut self, user_id: &str) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(self.conn())
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    pub async fn get_user_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(self.conn())
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(self.conn())
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    /// Soft-deactivate a user and revoke all of their auth sessions.
    pub async fn deactivate_user(&mut self, user_id: &str) -> Result<(), StorageError> {
        sqlx::query("UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(self.conn())
            .await?;
        sqlx::query("UPDATE auth_sessions SET revoked = TRUE WHERE user_id = $1")
            .bind(user_id)
            .execute(self.conn())
            .await?;
        Ok(())
    }
}
