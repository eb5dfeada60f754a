use std::path::PathBuf;

use crate::crypto::MasterKey;
use crate::error::AppError;

pub const DATABASE_PATH: &str = "DATABASE_PATH";
pub const ENCRYPTION_KEY: &str = "SECRETS_ENCRYPTION_KEY";
pub const ENCRYPT_SECRET: &str = "SECRETS_ENCRYPT_SECRET";
pub const ENCRYPT_SALT: &str = "SECRETS_ENCRYPT_SALT";

/// Everything the migration needs from its environment: where the store
/// lives and the key the application encrypts with.
#[derive(Debug)]
pub struct MigrationConfig {
    pub database_path: PathBuf,
    pub key: MasterKey,
}

impl MigrationConfig {
    /// Load from the process environment. `.env` has already been merged in
    /// by the binary's startup.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve the config through an arbitrary variable lookup.
    ///
    /// The key is never generated here: encrypting with a fresh key would make
    /// every migrated value unreadable to the application.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_path = get(DATABASE_PATH)
            .map(PathBuf::from)
            .ok_or_else(|| AppError::Config(format!("{DATABASE_PATH} is required")))?;

        let key = match (get(ENCRYPTION_KEY), get(ENCRYPT_SECRET), get(ENCRYPT_SALT)) {
            (Some(encoded), None, None) => MasterKey::from_encoded(&encoded)?,
            (None, Some(secret), Some(salt)) => MasterKey::derive(&secret, &salt)?,
            (Some(_), _, _) => {
                return Err(AppError::Config(format!(
                    "Set either {ENCRYPTION_KEY} or {ENCRYPT_SECRET}/{ENCRYPT_SALT}, not both"
                )))
            }
            (None, _, _) => {
                return Err(AppError::Config(format!(
                    "Missing key material: set {ENCRYPTION_KEY} or both {ENCRYPT_SECRET} and {ENCRYPT_SALT}"
                )))
            }
        };

        Ok(Self { database_path, key })
    }
}
