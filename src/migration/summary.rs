use std::fmt;

use serde::Serialize;

use super::committer::{MigrationError, RecordOutcome};

const RULE_WIDTH: usize = 50;

/// Counters for one run. Only ever incremented; read once at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub migrated: usize,
    pub skipped: usize,
    pub errored: usize,
    /// Every field or record failure, in the order they happened.
    pub errors: Vec<MigrationError>,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self { total, ..Default::default() }
    }

    pub fn record(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Skipped => self.skipped += 1,
            RecordOutcome::Committed { .. } => self.migrated += 1,
            RecordOutcome::Errored { errors } => {
                self.errored += 1;
                self.errors.extend(errors);
            }
        }
    }

    pub fn processed(&self) -> usize {
        self.migrated + self.skipped + self.errored
    }

    pub fn is_success(&self) -> bool {
        self.errored == 0 && self.errors.is_empty()
    }

    /// Process exit status: 0 when every record was skipped or migrated.
    pub fn exit_status(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// The human-readable block printed after the per-record log lines.
impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(f, "{rule}")?;
        writeln!(f, "Migration Summary:")?;
        writeln!(f, "  Total users processed: {}", self.total)?;
        writeln!(f, "  Successfully migrated: {}", self.migrated)?;
        writeln!(f, "  Skipped (already encrypted): {}", self.skipped)?;
        writeln!(f, "  Errors: {}", self.errored)?;
        writeln!(f, "{rule}")?;

        if self.is_success() {
            write!(f, "\nMigration completed successfully!")
        } else {
            writeln!(f, "\nSome errors occurred. Please review the logs above.")?;
            for error in &self.errors {
                writeln!(f, "  - {error}")?;
            }
            write!(f, "Re-running is safe: migrated values are detected and skipped.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::SecretField;

    fn encryption_failed(id: &str) -> MigrationError {
        MigrationError::EncryptionFailed {
            user_id: id.into(),
            email: format!("{id}@example.com"),
            field: SecretField::AiApiKey,
        }
    }

    #[test]
    fn test_counts_and_exit_status() {
        let mut summary = RunSummary::new(4);
        summary.record(RecordOutcome::Skipped);
        summary.record(RecordOutcome::Committed { fields: vec![SecretField::AiApiKey] });
        summary.record(RecordOutcome::Committed { fields: vec![SecretField::WebhookSecret] });
        assert!(summary.is_success());
        assert_eq!(summary.exit_status(), 0);

        summary.record(RecordOutcome::Errored { errors: vec![encryption_failed("9")] });
        assert_eq!((summary.migrated, summary.skipped, summary.errored), (2, 1, 1));
        assert_eq!(summary.processed(), summary.total);
        assert!(!summary.is_success());
        assert_eq!(summary.exit_status(), 1);
    }

    #[test]
    fn test_errored_record_keeps_every_field_error() {
        let mut summary = RunSummary::new(1);
        summary.record(RecordOutcome::Errored {
            errors: vec![
                encryption_failed("1"),
                MigrationError::EncryptionFailed {
                    user_id: "1".into(),
                    email: "1@example.com".into(),
                    field: SecretField::WebhookSecret,
                },
            ],
        });
        assert_eq!(summary.errored, 1);
        assert_eq!(summary.errors.len(), 2);
    }

    #[test]
    fn test_display_success_block() {
        let mut summary = RunSummary::new(1);
        summary.record(RecordOutcome::Skipped);
        let text = summary.to_string();
        assert!(text.starts_with(&"=".repeat(RULE_WIDTH)));
        assert!(text.contains("  Total users processed: 1"));
        assert!(text.contains("  Skipped (already encrypted): 1"));
        assert!(text.contains("  Errors: 0"));
        assert!(text.ends_with("Migration completed successfully!"));
    }

    #[test]
    fn test_display_lists_errors() {
        let mut summary = RunSummary::new(1);
        summary.record(RecordOutcome::Errored { errors: vec![encryption_failed("7")] });
        let text = summary.to_string();
        assert!(text.contains("Some errors occurred"));
        assert!(text.contains("  - User 7@example.com: Failed to encrypt aiApiKey"));
    }

    #[test]
    fn test_serializes_for_the_final_log_event() {
        let mut summary = RunSummary::new(1);
        summary.record(RecordOutcome::Errored { errors: vec![encryption_failed("7")] });
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["errored"], 1);
        assert_eq!(json["errors"][0]["kind"], "encryption_failed");
        assert_eq!(json["errors"][0]["field"], "ai_api_key");
    }
}
