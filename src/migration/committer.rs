use serde::Serialize;

use crate::crypto::TokenCipher;
use crate::db::models::{CandidateRecord, SecretField, SecretUpdate};
use crate::db::repos::raw_users::RawUserStore;
use crate::logging::{DECISION_TARGET, REPORT_TARGET};

use super::classifier::{classify, FieldState};

/// A per-record failure. Recorded in the run summary; never aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MigrationError {
    #[error("User {email}: Failed to encrypt {field}")]
    EncryptionFailed {
        user_id: String,
        email: String,
        field: SecretField,
    },

    #[error("User {email}: Update failed: {reason}")]
    UpdateFailed {
        user_id: String,
        email: String,
        reason: String,
    },
}

/// Terminal state of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Nothing needed encrypting; the store was not touched.
    Skipped,
    /// One update stored tokens for these fields.
    Committed { fields: Vec<SecretField> },
    /// Nothing was written for this record.
    Errored { errors: Vec<MigrationError> },
}

/// What encrypting a record's plaintext fields produced, before any write.
#[derive(Debug, Default)]
struct RecordPlan {
    update: SecretUpdate,
    errors: Vec<MigrationError>,
}

fn plan_record(cipher: &dyn TokenCipher, record: &CandidateRecord) -> RecordPlan {
    let mut plan = RecordPlan::default();

    for field in SecretField::ALL {
        let Some(value) = record.field(field) else {
            continue;
        };

        let classification = classify(cipher, value);
        tracing::debug!(
            user_id = %record.id,
            field = %field,
            evidence = ?classification.evidence,
            "Classified secret"
        );

        if classification.state == FieldState::Encrypted {
            tracing::info!(
                target: DECISION_TARGET,
                "  [SKIP] User {}: {} appears already encrypted",
                record.email,
                field
            );
            continue;
        }

        match cipher.encrypt(value) {
            Ok(Some(token)) => plan.update.set(field, token),
            result => {
                if let Err(e) = result {
                    tracing::debug!(user_id = %record.id, field = %field, "Cipher error: {}", e);
                }
                tracing::error!(
                    target: DECISION_TARGET,
                    "  [ERROR] User {}: Failed to encrypt {}",
                    record.email,
                    field
                );
                tracing::error!(
                    target: REPORT_TARGET,
                    user_id = %record.id,
                    field = %field,
                    "Secret encryption failed"
                );
                plan.errors.push(MigrationError::EncryptionFailed {
                    user_id: record.id.clone(),
                    email: record.email.clone(),
                    field,
                });
            }
        }
    }

    plan
}

/// Classify, encrypt and commit one record.
///
/// A record is written only when every plaintext field encrypted cleanly; if
/// any field failed, tokens produced for its siblings are dropped so the row
/// is never left half migrated by this run.
pub fn migrate_record(
    store: &RawUserStore,
    cipher: &dyn TokenCipher,
    record: &CandidateRecord,
) -> RecordOutcome {
    let RecordPlan { update, errors } = plan_record(cipher, record);

    if !errors.is_empty() {
        if !update.is_empty() {
            tracing::warn!(
                target: DECISION_TARGET,
                "  [DISCARD] User {}: not writing {} encrypted field(s) because a sibling failed",
                record.email,
                update.fields().len()
            );
        }
        return RecordOutcome::Errored { errors };
    }

    if update.is_empty() {
        return RecordOutcome::Skipped;
    }

    let fields = update.fields();
    for field in &fields {
        tracing::info!(
            target: DECISION_TARGET,
            "  [ENCRYPT] User {}: {} will be encrypted",
            record.email,
            field
        );
    }

    match store.write_secrets(&record.id, &update) {
        Ok(()) => RecordOutcome::Committed { fields },
        Err(e) => {
            tracing::error!(
                target: DECISION_TARGET,
                "  [ERROR] User {}: Update failed: {}",
                record.email,
                e
            );
            tracing::error!(target: REPORT_TARGET, user_id = %record.id, error = %e, "Secret update failed");
            RecordOutcome::Errored {
                errors: vec![MigrationError::UpdateFailed {
                    user_id: record.id.clone(),
                    email: record.email.clone(),
                    reason: e.to_string(),
                }],
            }
        }
    }
}
