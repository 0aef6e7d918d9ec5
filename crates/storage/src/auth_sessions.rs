//! Auth session rows. Tokens are stored as one-way digests only.

use quill_core::AuthSession;
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::error::StorageError;
use crate::store::Tx;

const AUTH_SESSION_COLUMNS: &str =
    "id, user_id, token_hash, expires_at, revoked, user_agent, ip_address, created_at";

fn row_to_auth_session(row: &PgRow) -> Result<AuthSession, StorageError> {
    Ok(AuthSession {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        token_hash: row.try_get("token_hash")?,
        expires_at: row.try_get("expires_at")?,
        revoked: row.try_get("revoked")?,
        user_agent: row.try_get("user_agent")?,
        ip_address: row.try_get("ip_address")?,
        created_at: row.try_get("created_at")?,
    })
}

impl Tx {
    pub async fn create_auth_session(
        &mut self,
        session: &AuthSession,
    ) -> Result<(), StorageError> {
        sqlx::query(&format!(
            "INSERT INTO auth_sessions ({AUTH_SESSION_COLUMNS})
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8)"
        ))
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.token_hash)
        .bind(session.expires_at)
        .bind(session.revoked)
        .bind(&session.user_agent)
        .bind(&session.ip_address)
        .bind(session.created_at)
        .execute(self.conn())
        .await?;
        Ok(())
    }

    /// Look up a session by token digest. Returns revoked/expired rows too;
    /// validity is the caller's check.
    pub async fn get_auth_session_by_token_hash(
        &mut self,
        token_hash: &str,
    ) -> Result<Option<AuthSession>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {AUTH_SESSION_COLUMNS} FROM auth_sessions
             WHERE token_hash = $1 ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(token_hash)
        .fetch_optional(self.conn())
        .await?;
        row.map(|r| row_to_auth_session(&r)).transpose()
    }

    /// Revoke the session matching a token digest. Returns whether a row
    /// was revoked.
    pub async fn revoke_auth_session(&mut self, token_hash: &str) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "UPDATE auth_sessions SET revoked = TRUE WHERE token_hash = $1 AND NOT revoked",
        )
        .bind(token_hash)
        .execute(self.conn())
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
