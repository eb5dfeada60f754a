//! The application's normal access path to `users`.
//!
//! Secret columns are encrypted on every write and decrypted on every read,
//! so callers only ever handle plaintext. Because of that, this store must
//! never be handed a value that is already a token: it would be encrypted a
//! second time. The migration uses [`super::raw_users::RawUserStore`] instead.

use rusqlite::{params, Row};

use crate::crypto::TokenCipher;
use crate::db::models::{CreateUserInput, SecretField, UpdateUserSecretsInput, User};
use crate::db::DbPool;
use crate::error::AppError;

pub struct UserStore<'c> {
    pool: DbPool,
    cipher: &'c dyn TokenCipher,
}

impl<'c> UserStore<'c> {
    pub fn new(pool: DbPool, cipher: &'c dyn TokenCipher) -> Self {
        Self { pool, cipher }
    }

    fn seal(&self, field: SecretField, value: Option<&str>) -> Result<Option<String>, AppError> {
        let Some(value) = value else {
            return Ok(None);
        };
        match self.cipher.encrypt(value)? {
            Some(token) => Ok(Some(token)),
            None => Err(AppError::Internal(format!("Failed to encrypt {field}"))),
        }
    }

    fn open(&self, field: SecretField, id: &str, stored: Option<String>) -> Option<String> {
        let stored = stored?;
        match self.cipher.decrypt(&stored) {
            Ok(Some(plaintext)) => Some(plaintext),
            Ok(None) => {
                tracing::warn!(user_id = %id, field = %field, "Stored secret could not be decrypted");
                None
            }
            Err(e) => {
                tracing::warn!(user_id = %id, field = %field, "Stored secret is not a token: {}", e);
                None
            }
        }
    }

    fn row_to_user(&self, row: &Row) -> rusqlite::Result<User> {
        let id: String = row.get("id")?;
        let ai_api_key = self.open(SecretField::AiApiKey, &id, row.get("ai_api_key")?);
        let webhook_secret = self.open(SecretField::WebhookSecret, &id, row.get("webhook_secret")?);
        Ok(User {
            email: row.get("email")?,
            name: row.get("name")?,
            ai_api_key,
            webhook_secret,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            id,
        })
    }

    pub fn get_by_id(&self, id: &str) -> Result<User, AppError> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, email, name, ai_api_key, webhook_secret, created_at, updated_at
             FROM users WHERE id = ?1",
            params![id],
            |row| self.row_to_user(row),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("User {id}")),
            other => AppError::Database(other),
        })
    }

    pub fn create(&self, input: CreateUserInput) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let ai_api_key = self.seal(SecretField::AiApiKey, input.ai_api_key.as_deref())?;
        let webhook_secret = self.seal(SecretField::WebhookSecret, input.webhook_secret.as_deref())?;

        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO users
             (id, email, name, ai_api_key, webhook_secret, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![id, input.email, input.name, ai_api_key, webhook_secret, now],
        )?;
        drop(conn);

        self.get_by_id(&id)
    }

    pub fn update_secrets(&self, id: &str, input: UpdateUserSecretsInput) -> Result<User, AppError> {
        let ai_api_key = self.seal(SecretField::AiApiKey, input.ai_api_key.as_deref())?;
        let webhook_secret = self.seal(SecretField::WebhookSecret, input.webhook_secret.as_deref())?;

        let now = chrono::Utc::now().to_rfc3339();
        let mut sets: Vec<String> = vec!["updated_at = ?1".into()];
        let mut param_idx = 2u32;

        push_field!(ai_api_key, "ai_api_key", sets, param_idx);
        push_field!(webhook_secret, "webhook_secret", sets, param_idx);

        let sql = format!("UPDATE users SET {} WHERE id = ?{}", sets.join(", "), param_idx);

        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(now)];
        if let Some(v) = ai_api_key {
            param_values.push(Box::new(v));
        }
        if let Some(v) = webhook_secret {
            param_values.push(Box::new(v));
        }
        param_values.push(Box::new(id.to_string()));

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();

        let conn = self.pool.get()?;
        let rows = conn.execute(&sql, params_ref.as_slice())?;
        if rows == 0 {
            return Err(AppError::NotFound(format!("User {id}")));
        }
        drop(conn);

        self.get_by_id(id)
    }
}
