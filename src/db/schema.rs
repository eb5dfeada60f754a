use rusqlite::Connection;

use crate::error::AppError;

pub const USERS_TABLE: &str = "users";

/// Columns the migration reads or writes. The schema itself is owned by the
/// application; this only checks it has been deployed.
pub const REQUIRED_COLUMNS: [&str; 5] = ["id", "email", "ai_api_key", "webhook_secret", "updated_at"];

/// Fail fast if the `users` table is missing any column the migration touches.
pub fn verify(conn: &Connection) -> Result<(), AppError> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let columns = stmt
        .query_map([USERS_TABLE], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Err(AppError::Config(format!("Table '{USERS_TABLE}' does not exist")));
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| !columns.iter().any(|c| c == required))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Config(format!(
            "Table '{USERS_TABLE}' is missing columns: {}",
            missing.join(", ")
        )));
    }

    tracing::debug!(columns = columns.len(), "Schema check passed");
    Ok(())
}

/// Shape of the application's `users` table, for test databases.
#[cfg(test)]
pub const TEST_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY,
    email           TEXT NOT NULL UNIQUE,
    name            TEXT,
    ai_api_key      TEXT,
    webhook_secret  TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);
"#;
