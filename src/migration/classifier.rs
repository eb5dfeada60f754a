//! Infers whether a stored secret is already a token.
//!
//! Nothing in the table records which values are encrypted. The only signal is
//! whether the value decrypts, under the application key, to something other
//! than itself. A plaintext that happens to authenticate as a token would be
//! misread as encrypted and left alone; with AES-GCM that needs a valid
//! 128-bit tag, so it is not checked for separately.

use serde::Serialize;

use crate::crypto::TokenCipher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldState {
    Plaintext,
    Encrypted,
}

/// Why a value ended up in its state. Only used for debug logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    /// The cipher rejected the input outright (bad encoding or length).
    Rejected,
    /// The cipher returned its "not decryptable" signal.
    NotDecryptable,
    /// Decryption "succeeded" but gave back the input unchanged.
    SelfIdentical,
    /// Decryption produced a different string.
    Decrypted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub state: FieldState,
    pub evidence: Evidence,
    /// The recovered plaintext, present only for `Encrypted`.
    pub decrypted: Option<String>,
}

impl Classification {
    fn plaintext(evidence: Evidence) -> Self {
        Self { state: FieldState::Plaintext, evidence, decrypted: None }
    }

    pub fn is_encrypted(&self) -> bool {
        self.state == FieldState::Encrypted
    }
}

/// Classify one stored value. Pure: depends only on `value` and the key
/// inside `cipher`, and is recomputed on every run.
pub fn classify(cipher: &dyn TokenCipher, value: &str) -> Classification {
    match cipher.decrypt(value) {
        Err(_) => Classification::plaintext(Evidence::Rejected),
        Ok(None) => Classification::plaintext(Evidence::NotDecryptable),
        Ok(Some(decrypted)) if decrypted == value => Classification::plaintext(Evidence::SelfIdentical),
        Ok(Some(decrypted)) => Classification {
            state: FieldState::Encrypted,
            evidence: Evidence::Decrypted,
            decrypted: Some(decrypted),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::testing::FakeCipher;
    use crate::crypto::{AesGcmCipher, CryptoError, MasterKey};
    use proptest::prelude::*;

    /// Decrypts everything to itself.
    struct IdentityCipher;

    impl TokenCipher for IdentityCipher {
        fn encrypt(&self, plaintext: &str) -> Result<Option<String>, CryptoError> {
            Ok(Some(plaintext.to_string()))
        }

        fn decrypt(&self, token: &str) -> Result<Option<String>, CryptoError> {
            Ok(Some(token.to_string()))
        }
    }

    fn aes() -> AesGcmCipher {
        AesGcmCipher::new(&MasterKey::from_bytes([3u8; 32]))
    }

    #[test]
    fn test_raising_decrypt_is_plaintext() {
        let c = classify(&FakeCipher::default(), "!garbage");
        assert_eq!(c.state, FieldState::Plaintext);
        assert_eq!(c.evidence, Evidence::Rejected);
        assert_eq!(c.decrypted, None);
    }

    #[test]
    fn test_null_decrypt_is_plaintext() {
        let c = classify(&FakeCipher::default(), "sk-live-abc");
        assert_eq!(c.state, FieldState::Plaintext);
        assert_eq!(c.evidence, Evidence::NotDecryptable);
    }

    #[test]
    fn test_self_identical_decrypt_is_plaintext() {
        let c = classify(&IdentityCipher, "whsec_123");
        assert_eq!(c.state, FieldState::Plaintext);
        assert_eq!(c.evidence, Evidence::SelfIdentical);
    }

    #[test]
    fn test_different_decrypt_is_encrypted() {
        let c = classify(&FakeCipher::default(), "enc:sk-live-abc");
        assert!(c.is_encrypted());
        assert_eq!(c.decrypted.as_deref(), Some("sk-live-abc"));
    }

    #[test]
    fn test_real_token_is_encrypted() {
        let cipher = aes();
        let token = cipher.encrypt("sk-live-xyz").unwrap().unwrap();
        let c = classify(&cipher, &token);
        assert!(c.is_encrypted());
        assert_eq!(c.decrypted.as_deref(), Some("sk-live-xyz"));
    }

    #[test]
    fn test_token_under_other_key_is_plaintext() {
        let token = aes().encrypt("sk-live-xyz").unwrap().unwrap();
        let other = AesGcmCipher::new(&MasterKey::from_bytes([4u8; 32]));
        assert_eq!(classify(&other, &token).evidence, Evidence::NotDecryptable);
    }

    proptest! {
        #[test]
        fn prop_fresh_tokens_are_encrypted(secret in ".+") {
            let cipher = aes();
            let token = cipher.encrypt(&secret).unwrap().unwrap();
            let c = classify(&cipher, &token);
            prop_assert!(c.is_encrypted());
            prop_assert_eq!(c.decrypted, Some(secret));
        }

        #[test]
        fn prop_api_key_shaped_values_are_plaintext(secret in "sk-[A-Za-z0-9_-]{8,64}") {
            prop_assert_eq!(classify(&aes(), &secret).state, FieldState::Plaintext);
        }
    }
}
