pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod logging;
pub mod migration;

use config::MigrationConfig;
use crypto::AesGcmCipher;
use db::repos::raw_users::RawUserStore;
use error::AppError;
use migration::RunSummary;

/// Entry point for the binary. Returns the process exit status.
pub fn run() -> u8 {
    let dotenv = dotenvy::dotenv();
    logging::init();

    tracing::info!("Starting user secrets migration v{}", env!("CARGO_PKG_VERSION"));
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    report(MigrationConfig::from_env().and_then(execute_with))
}

/// Print the outcome of a run and map it to an exit status: 0 only for a
/// run that completed with no per-record errors.
fn report(result: Result<RunSummary, AppError>) -> u8 {
    match result {
        Ok(summary) => {
            println!("\n{summary}");
            match serde_json::to_string(&summary) {
                Ok(report) => tracing::debug!(report = %report, "Run report"),
                Err(e) => tracing::warn!("Failed to serialize run report: {}", e),
            }
            summary.exit_status()
        }
        Err(e) => {
            let report = serde_json::to_string(&e).unwrap_or_else(|_| e.to_string());
            tracing::error!(report = %report, "Migration failed: {}", e);
            1
        }
    }
}

/// Set up the raw store and cipher, then run the migration. The pool is
/// owned here, so its connection is closed on every return path.
fn execute_with(config: MigrationConfig) -> Result<RunSummary, AppError> {
    let cipher = AesGcmCipher::new(&config.key);

    let pool = db::open_existing(&config.database_path)?;
    let store = RawUserStore::new(pool);

    migration::run(&store, &cipher)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::crypto::{MasterKey, TokenCipher};
    use crate::db::schema::TEST_SCHEMA;

    fn temp_db(schema: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("secrets_migrate_run_{}.db", uuid::Uuid::new_v4()));
        rusqlite::Connection::open(&path).unwrap().execute_batch(schema).unwrap();
        path
    }

    fn insert(path: &Path, id: &str, key: &str) {
        rusqlite::Connection::open(path)
            .unwrap()
            .execute(
                "INSERT INTO users (id, email, ai_api_key, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 'then', 'then')",
                rusqlite::params![id, format!("{id}@example.com"), key],
            )
            .unwrap();
    }

    fn config(path: &Path) -> MigrationConfig {
        MigrationConfig { database_path: path.to_path_buf(), key: MasterKey::from_bytes([9u8; 32]) }
    }

    #[test]
    fn test_clean_run_exits_zero() {
        let path = temp_db(TEST_SCHEMA);
        insert(&path, "1", "sk-live-abc");

        assert_eq!(report(execute_with(config(&path))), 0);

        let stored: String = rusqlite::Connection::open(&path)
            .unwrap()
            .query_row("SELECT ai_api_key FROM users WHERE id = '1'", [], |r| r.get(0))
            .unwrap();
        let cipher = AesGcmCipher::new(&MasterKey::from_bytes([9u8; 32]));
        assert_eq!(cipher.decrypt(&stored).unwrap().as_deref(), Some("sk-live-abc"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_config_error_exits_one() {
        let result = MigrationConfig::from_lookup(|_| None).and_then(execute_with);
        assert!(matches!(result, Err(AppError::Config(_))));
        assert_eq!(report(result), 1);
    }

    #[test]
    fn test_missing_database_exits_one() {
        let path = std::env::temp_dir().join(format!("absent_{}.db", uuid::Uuid::new_v4()));
        assert_eq!(report(execute_with(config(&path))), 1);
        assert!(!path.exists());
    }

    #[test]
    fn test_schema_mismatch_exits_one() {
        let path = temp_db("CREATE TABLE users (id TEXT PRIMARY KEY, email TEXT NOT NULL);");
        assert_eq!(report(execute_with(config(&path))), 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_selector_abort_exits_one() {
        let pool = db::init_test_db().unwrap();
        pool.get().unwrap().execute_batch("DROP TABLE users;").unwrap();
        let store = RawUserStore::new(pool);
        let cipher = AesGcmCipher::new(&MasterKey::from_bytes([9u8; 32]));

        let result = migration::run(&store, &cipher);
        assert!(result.is_err());
        assert_eq!(report(result), 1);
    }

    #[test]
    fn test_per_record_errors_exit_one() {
        let path = temp_db(
            "CREATE TABLE users (
                id TEXT PRIMARY KEY, email TEXT NOT NULL, ai_api_key TEXT,
                webhook_secret TEXT, created_at TEXT, updated_at TEXT
             );
             CREATE TRIGGER reject_update BEFORE UPDATE ON users
             BEGIN SELECT RAISE(ABORT, 'read only'); END;",
        );
        insert(&path, "1", "sk-live-abc");

        assert_eq!(report(execute_with(config(&path))), 1);
        let _ = std::fs::remove_file(&path);
    }
}
