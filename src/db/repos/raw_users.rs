//! Privileged access to the raw secret columns of `users`.
//!
//! This store holds no cipher: it reads and writes exactly the bytes at rest.
//! It exists for the encryption migration only; application code goes through
//! [`super::users::UserStore`].

use rusqlite::Row;

use crate::db::models::{CandidateRecord, SecretUpdate};
use crate::db::DbPool;
use crate::error::AppError;

const SELECT_CANDIDATES: &str = "SELECT id, email, ai_api_key, webhook_secret
     FROM users
     WHERE ai_api_key IS NOT NULL OR webhook_secret IS NOT NULL
     ORDER BY id";

fn row_to_candidate(row: &Row) -> rusqlite::Result<CandidateRecord> {
    Ok(CandidateRecord {
        id: row.get("id")?,
        email: row.get("email")?,
        ai_api_key: row.get("ai_api_key")?,
        webhook_secret: row.get("webhook_secret")?,
    })
}

pub struct RawUserStore {
    pool: DbPool,
}

impl RawUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Every user with at least one non-null secret column, ordered by id.
    pub fn fetch_candidates(&self) -> Result<Vec<CandidateRecord>, AppError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(SELECT_CANDIDATES)?;
        let rows = stmt.query_map([], row_to_candidate)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(AppError::Database)
    }

    #[cfg(test)]
    pub fn get_by_id(&self, id: &str) -> Result<CandidateRecord, AppError> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, email, ai_api_key, webhook_secret FROM users WHERE id = ?1",
            [id],
            row_to_candidate,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("User {id}")),
            other => AppError::Database(other),
        })
    }

    /// Store already-encrypted tokens verbatim, plus a fresh `updated_at`.
    ///
    /// Only the columns set in `update` are written. The statement runs in its
    /// own transaction and must hit exactly one row, otherwise nothing is
    /// committed.
    pub fn write_secrets(&self, id: &str, update: &SecretUpdate) -> Result<(), AppError> {
        if update.is_empty() {
            return Err(AppError::Internal(format!("Empty secret update for user {id}")));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut sets: Vec<String> = vec!["updated_at = ?1".into()];
        let mut param_idx = 2u32;

        push_field!(update.ai_api_key, "ai_api_key", sets, param_idx);
        push_field!(update.webhook_secret, "webhook_secret", sets, param_idx);

        let sql = format!("UPDATE users SET {} WHERE id = ?{}", sets.join(", "), param_idx);

        let mut param_values: Vec<&dyn rusqlite::types::ToSql> = vec![&now];
        if let Some(ref v) = update.ai_api_key {
            param_values.push(v);
        }
        if let Some(ref v) = update.webhook_secret {
            param_values.push(v);
        }
        param_values.push(&id);

        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let rows = tx.execute(&sql, param_values.as_slice())?;
        if rows != 1 {
            // Dropping the transaction rolls it back.
            return Err(AppError::NotFound(format!("User {id} (matched {rows} rows)")));
        }
        tx.commit()?;
        Ok(())
    }
}
