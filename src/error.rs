use serde::Serialize;

use crate::crypto::CryptoError;

/// Crate-wide error type. Every fallible setup or store function returns
/// `Result<T, AppError>`. Per-record migration failures are not `AppError`s;
/// they are recorded as [`crate::migration::MigrationError`] and never abort a run.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database",
            AppError::Pool(_) => "pool",
            AppError::Config(_) => "config",
            AppError::Crypto(_) => "crypto",
            AppError::NotFound(_) => "not_found",
            AppError::Io(_) => "io",
            AppError::Serde(_) => "serde",
            AppError::Internal(_) => "internal",
        }
    }
}

/// Serialized as `{ error: "...", kind: "..." }` so the final run report can
/// embed an abort cause.
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("AppError", 2)?;
        s.serialize_field("error", &self.to_string())?;
        s.serialize_field("kind", self.kind())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_kind() {
        let err = AppError::Config("DATABASE_PATH is required".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "config");
        assert_eq!(json["error"], "Configuration error: DATABASE_PATH is required");
    }

    #[test]
    fn test_crypto_error_converts() {
        let err: AppError = CryptoError::KeyManagement("missing".into()).into();
        assert_eq!(err.kind(), "crypto");
    }
}
