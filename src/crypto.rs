use aes_gcm::aead::consts::U16;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-256-GCM with the 16-byte IV the application's token format uses.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;
const PBKDF2_ROUNDS: u32 = 100_000;

/// Error type for crypto operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    Encrypt(String),
    #[error("Decryption failed: {0}")]
    Decrypt(String),
    #[error("Malformed token: {0}")]
    Malformed(String),
    #[error("Key management error: {0}")]
    KeyManagement(String),
    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// The encrypt/decrypt primitive the migration and the transparent store
/// layer are written against.
///
/// Both operations distinguish two failure shapes: `Ok(None)` is the
/// primitive's "not possible with this key/format" signal, `Err` means the
/// input was rejected outright. Callers that only care about success treat
/// both the same.
pub trait TokenCipher {
    fn encrypt(&self, plaintext: &str) -> Result<Option<String>, CryptoError>;
    fn decrypt(&self, token: &str) -> Result<Option<String>, CryptoError>;
}

// ---------------------------------------------------------------------------
// Key Management
// ---------------------------------------------------------------------------

/// 32-byte master key, wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse an encoded key. Accepts 64 hex characters or standard base64,
    /// either of which must decode to exactly 32 bytes.
    pub fn from_encoded(encoded: &str) -> Result<Self, CryptoError> {
        let trimmed = encoded.trim();
        let mut bytes = if trimmed.len() == KEY_LEN * 2 && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            hex::decode(trimmed)?
        } else {
            B64.decode(trimmed)?
        };

        if bytes.len() != KEY_LEN {
            let len = bytes.len();
            bytes.zeroize();
            return Err(CryptoError::KeyManagement(format!(
                "Key has wrong length: {} (expected {})",
                len, KEY_LEN
            )));
        }

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(key))
    }

    /// Derive the key from a passphrase and salt with PBKDF2-HMAC-SHA256.
    pub fn derive(secret: &str, salt: &str) -> Result<Self, CryptoError> {
        if secret.is_empty() || salt.is_empty() {
            return Err(CryptoError::KeyManagement(
                "Key derivation requires a non-empty secret and salt".into(),
            ));
        }
        let mut key = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut key);
        Ok(Self(key))
    }

    fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// AES-256-GCM token cipher
// ---------------------------------------------------------------------------

/// Production cipher. A token is lowercase hex of `iv || tag || ciphertext`.
pub struct AesGcmCipher {
    cipher: Aes256Gcm16,
}

impl AesGcmCipher {
    pub fn new(key: &MasterKey) -> Self {
        let cipher = Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key.as_bytes()));
        Self { cipher }
    }
}

impl TokenCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<Option<String>, CryptoError> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        let nonce = Nonce::<U16>::from_slice(&iv);

        // aes-gcm appends the tag; the stored layout puts it before the body.
        let sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::Encrypt(e.to_string()))?;
        let (body, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        let mut token = Vec::with_capacity(IV_LEN + TAG_LEN + body.len());
        token.extend_from_slice(&iv);
        token.extend_from_slice(tag);
        token.extend_from_slice(body);
        Ok(Some(hex::encode(token)))
    }

    fn decrypt(&self, token: &str) -> Result<Option<String>, CryptoError> {
        let raw = hex::decode(token)?;
        if raw.len() < IV_LEN + TAG_LEN {
            return Err(CryptoError::Malformed(format!(
                "Token too short: {} bytes (need at least {})",
                raw.len(),
                IV_LEN + TAG_LEN
            )));
        }

        let (iv, rest) = raw.split_at(IV_LEN);
        let (tag, body) = rest.split_at(TAG_LEN);
        let mut sealed = Vec::with_capacity(body.len() + TAG_LEN);
        sealed.extend_from_slice(body);
        sealed.extend_from_slice(tag);

        let nonce = Nonce::<U16>::from_slice(iv);
        let Ok(plaintext) = self.cipher.decrypt(nonce, sealed.as_ref()) else {
            return Ok(None);
        };
        Ok(String::from_utf8(plaintext).ok())
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::HashSet;

    use super::{CryptoError, TokenCipher};

    /// Deterministic cipher for tests: `encrypt(p) == "enc:" + p`.
    ///
    /// Values in `fail_encrypt` make `encrypt` return `None`; tokens starting
    /// with `!` make `decrypt` raise. Every `encrypt` input is recorded.
    #[derive(Default)]
    pub struct FakeCipher {
        pub fail_encrypt: HashSet<String>,
        pub encrypt_calls: RefCell<Vec<String>>,
    }

    impl FakeCipher {
        pub fn failing_on(values: &[&str]) -> Self {
            Self {
                fail_encrypt: values.iter().map(|v| v.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    impl TokenCipher for FakeCipher {
        fn encrypt(&self, plaintext: &str) -> Result<Option<String>, CryptoError> {
            self.encrypt_calls.borrow_mut().push(plaintext.to_string());
            if self.fail_encrypt.contains(plaintext) {
                return Ok(None);
            }
            Ok(Some(format!("enc:{plaintext}")))
        }

        fn decrypt(&self, token: &str) -> Result<Option<String>, CryptoError> {
            if token.starts_with('!') {
                return Err(CryptoError::Malformed(token.to_string()));
            }
            Ok(token.strip_prefix("enc:").map(str::to_string))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
