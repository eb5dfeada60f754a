use crate::db::models::CandidateRecord;
use crate::db::repos::raw_users::RawUserStore;
use crate::error::AppError;

/// Load every user holding a secret, once, before anything is written.
///
/// A failure here aborts the run: no row has been touched yet, so there is
/// nothing to clean up.
pub fn select_candidates(store: &RawUserStore) -> Result<Vec<CandidateRecord>, AppError> {
    let mut candidates = store.fetch_candidates().map_err(|e| {
        tracing::error!(kind = e.kind(), "Failed to load candidate users: {}", e);
        e
    })?;

    for record in &mut candidates {
        drop_empty(record);
    }

    tracing::info!("Found {} users with secrets to potentially migrate.", candidates.len());
    Ok(candidates)
}

/// Empty strings hold no secret; treat them like NULL so they are neither
/// classified nor rewritten.
fn drop_empty(record: &mut CandidateRecord) {
    if record.ai_api_key.as_deref() == Some("") {
        record.ai_api_key = None;
    }
    if record.webhook_secret.as_deref() == Some("") {
        record.webhook_secret = None;
    }
}
