#[macro_use]
pub mod macros;
pub mod models;
pub mod repos;
pub mod schema;

use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use std::path::Path;
use std::time::Duration;

use crate::error::AppError;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Connection customizer that sets per-connection SQLite pragmas.
#[derive(Debug)]
struct SqlitePragmaCustomizer;

impl CustomizeConnection<rusqlite::Connection, rusqlite::Error> for SqlitePragmaCustomizer {
    fn on_acquire(&self, conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }
}

/// Open the application's existing database for the migration run.
///
/// The file must already exist (it is opened without `SQLITE_OPEN_CREATE`)
/// and its `users` table must carry the secret columns. The pool holds a
/// single connection; dropping the pool closes it.
pub fn open_existing(db_path: &Path) -> Result<DbPool, AppError> {
    tracing::info!(path = %db_path.display(), "Opening database");

    if !db_path.is_file() {
        return Err(AppError::Config(format!(
            "Database file not found: {}",
            db_path.display()
        )));
    }

    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX);
    let pool = Pool::builder()
        .max_size(1)
        .connection_timeout(Duration::from_secs(10))
        .connection_customizer(Box::new(SqlitePragmaCustomizer))
        .build(manager)?;

    {
        let conn = pool.get()?;
        schema::verify(&conn)?;
    }

    tracing::debug!("Database ready (max_size=1)");
    Ok(pool)
}

#[cfg(test)]
pub fn init_test_db() -> Result<DbPool, AppError> {
    // Use a unique temp file for each test to avoid in-memory connection issues with r2d2.
    let tmp = std::env::temp_dir().join(format!("secrets_migrate_test_{}.db", uuid::Uuid::new_v4()));
    let manager = SqliteConnectionManager::file(&tmp);
    let pool = Pool::builder()
        .max_size(2)
        .connection_timeout(Duration::from_secs(5))
        .connection_customizer(Box::new(SqlitePragmaCustomizer))
        .build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch(schema::TEST_SCHEMA)?;
    drop(conn);
    Ok(pool)
}
