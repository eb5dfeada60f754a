use serde::{Deserialize, Serialize};

// ============================================================================
// Secret fields
// ============================================================================

/// The user columns that hold secrets and are encrypted at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretField {
    AiApiKey,
    WebhookSecret,
}

impl SecretField {
    pub const ALL: [SecretField; 2] = [SecretField::AiApiKey, SecretField::WebhookSecret];

    /// Name used in log lines.
    pub fn label(self) -> &'static str {
        match self {
            SecretField::AiApiKey => "aiApiKey",
            SecretField::WebhookSecret => "webhookSecret",
        }
    }
}

impl std::fmt::Display for SecretField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Users
// ============================================================================

/// A user as the application sees it: secrets are plaintext in memory and
/// only ever ciphertext in the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub ai_api_key: Option<String>,
    #[serde(skip_serializing)]
    pub webhook_secret: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub name: Option<String>,
    pub ai_api_key: Option<String>,
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserSecretsInput {
    pub ai_api_key: Option<String>,
    pub webhook_secret: Option<String>,
}

// ============================================================================
// Migration rows
// ============================================================================

/// A row that holds at least one secret, exactly as stored. Carries only what
/// classification and log lines need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    pub id: String,
    pub email: String,
    pub ai_api_key: Option<String>,
    pub webhook_secret: Option<String>,
}

impl CandidateRecord {
    pub fn field(&self, field: SecretField) -> Option<&str> {
        match field {
            SecretField::AiApiKey => self.ai_api_key.as_deref(),
            SecretField::WebhookSecret => self.webhook_secret.as_deref(),
        }
    }
}

/// Freshly produced tokens for one row. `None` columns are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretUpdate {
    pub ai_api_key: Option<String>,
    pub webhook_secret: Option<String>,
}

impl SecretUpdate {
    pub fn set(&mut self, field: SecretField, token: String) {
        match field {
            SecretField::AiApiKey => self.ai_api_key = Some(token),
            SecretField::WebhookSecret => self.webhook_secret = Some(token),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ai_api_key.is_none() && self.webhook_secret.is_none()
    }

    pub fn fields(&self) -> Vec<SecretField> {
        SecretField::ALL
            .into_iter()
            .filter(|f| match f {
                SecretField::AiApiKey => self.ai_api_key.is_some(),
                SecretField::WebhookSecret => self.webhook_secret.is_some(),
            })
            .collect()
    }
}
