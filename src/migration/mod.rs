//! One-shot encryption of plaintext user secrets.
//!
//! The run is a single sequential pass: load candidates, then classify,
//! encrypt and commit each record in turn. Writes go through
//! [`RawUserStore`] because the application's [`crate::db::repos::users::UserStore`]
//! would encrypt the tokens a second time. Re-running is safe: values written
//! by an earlier run classify as encrypted and are skipped.

pub mod classifier;
pub mod committer;
pub mod selector;
pub mod summary;

pub use classifier::{classify, Classification, Evidence, FieldState};
pub use committer::{migrate_record, MigrationError, RecordOutcome};
pub use summary::RunSummary;

use crate::crypto::TokenCipher;
use crate::db::repos::raw_users::RawUserStore;
use crate::error::AppError;

/// Migrate every candidate record.
///
/// Returns `Err` only when candidates could not be loaded, before any write.
/// Per-record failures are collected in the returned summary.
pub fn run(store: &RawUserStore, cipher: &dyn TokenCipher) -> Result<RunSummary, AppError> {
    tracing::info!("Starting migration of User secrets...");

    let candidates = selector::select_candidates(store)?;
    let mut summary = RunSummary::new(candidates.len());

    for record in &candidates {
        let outcome = migrate_record(store, cipher, record);
        summary.record(outcome);
    }

    debug_assert_eq!(summary.processed(), summary.total);
    tracing::info!(
        total = summary.total,
        migrated = summary.migrated,
        skipped = summary.skipped,
        errored = summary.errored,
        "Migration finished"
    );
    Ok(summary)
}
