//! Encryption of stored marketplace access tokens.
//!
//! Tokens are sealed with AES-256 in CFB mode under a fresh random IV. The
//! stored form is `base64url(iv || ciphertext)` with padding.
//!
//! # Key handling
//!
//! The configured key string is used byte-for-byte: longer keys are truncated
//! to 32 bytes and shorter keys are right-padded with zero bytes. Padding
//! weakens short keys but is kept so existing ciphertexts stay readable; the
//! server warns at startup when the key is short.

use std::sync::Arc;

use aes::Aes256;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use secrecy::{ExposeSecret, SecretBox, SecretString};
use thiserror::Error;

/// AES-256 key size in bytes.
pub const KEY_LEN: usize = 32;

/// AES block size, which is also the IV length.
pub const IV_LEN: usize = 16;

type Encryptor = cfb_mode::Encryptor<Aes256>;
type Decryptor = cfb_mode::Decryptor<Aes256>;

/// Errors raised by the credential cipher.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The cipher could not be constructed from the key and IV.
    #[error("cipher setup failed: {0}")]
    Setup(String),

    /// Stored value is not valid base64.
    #[error("ciphertext is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// Stored value is shorter than the IV prefix.
    #[error("ciphertext too short ({0} bytes)")]
    TooShort(usize),

    /// Decrypted bytes are not UTF-8, usually a wrong key.
    #[error("decrypted token is not valid UTF-8")]
    InvalidPlaintext,
}

/// Encrypts and decrypts tokens under one normalized key.
///
/// Cheap to clone; the key is shared and zeroized on drop.
#[derive(Clone)]
pub struct CredentialCipher {
    key: Arc<SecretBox<[u8; KEY_LEN]>>,
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl CredentialCipher {
    /// Build a cipher from the configured key string.
    #[must_use]
    pub fn new(key: &SecretString) -> Self {
        Self::from_key_str(key.expose_secret())
    }

    fn from_key_str(key: &str) -> Self {
        Self {
            key: Arc::new(SecretBox::new(Box::new(normalize_key(key)))),
        }
    }

    /// Encrypt `plaintext` under a fresh random IV.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Setup` if the cipher cannot be initialized.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let iv: [u8; IV_LEN] = rand::random();

        let mut sealed = Vec::with_capacity(IV_LEN + plaintext.len());
        sealed.extend_from_slice(&iv);
        sealed.extend_from_slice(plaintext.as_bytes());

        Encryptor::new_from_slices(self.key.expose_secret(), &iv)
            .map_err(|e| CryptoError::Setup(e.to_string()))?
            .encrypt(&mut sealed[IV_LEN..]);

        Ok(URL_SAFE.encode(sealed))
    }

    /// Decrypt a value produced by [`CredentialCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns `CryptoError` if the value is not base64, is shorter than the
    /// IV, or does not decrypt to UTF-8.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let mut sealed = URL_SAFE.decode(ciphertext)?;
        if sealed.len() < IV_LEN {
            return Err(CryptoError::TooShort(sealed.len()));
        }

        let (iv, body) = sealed.split_at_mut(IV_LEN);
        Decryptor::new_from_slices(self.key.expose_secret(), iv)
            .map_err(|e| CryptoError::Setup(e.to_string()))?
            .decrypt(body);

        String::from_utf8(body.to_vec()).map_err(|_| CryptoError::InvalidPlaintext)
    }
}

/// Encrypt `plaintext` with a raw key string.
///
/// # Errors
///
/// See [`CredentialCipher::encrypt`].
pub fn encrypt(plaintext: &str, key: &str) -> Result<String, CryptoError> {
    CredentialCipher::from_key_str(key).encrypt(plaintext)
}

/// Decrypt `ciphertext` with a raw key string.
///
/// # Errors
///
/// See [`CredentialCipher::decrypt`].
pub fn decrypt(ciphertext: &str, key: &str) -> Result<String, CryptoError> {
    CredentialCipher::from_key_str(key).decrypt(ciphertext)
}

/// Truncate or zero-pad the key to exactly `KEY_LEN` bytes.
fn normalize_key(key: &str) -> [u8; KEY_LEN] {
    let mut material = [0u8; KEY_LEN];
    let bytes = key.as_bytes();
    let len = bytes.len().min(KEY_LEN);
    material[..len].copy_from_slice(&bytes[..len]);
    material
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TOKEN: &str = "tok1234567";

    #[test]
    fn test_round_trip_for_any_key_length() {
        for key in [
            "k",
            "0123456789abcdef0123456789abcdef",
            "0123456789abcdef0123456789abcdef-and-then-some",
        ] {
            let sealed = encrypt(TOKEN, key).unwrap();
            assert_eq!(decrypt(&sealed, key).unwrap(), TOKEN);
        }
    }

    #[test]
    fn test_encrypt_is_randomized() {
        let cipher = CredentialCipher::from_key_str("unit-test-key");
        let first = cipher.encrypt(TOKEN).unwrap();
        let second = cipher.encrypt(TOKEN).unwrap();
        assert_ne!(first, second);
        assert_eq!(cipher.decrypt(&first).unwrap(), cipher.decrypt(&second).unwrap());
    }

    #[test]
    fn test_output_is_padded_url_safe_base64() {
        let sealed = encrypt(TOKEN, "unit-test-key").unwrap();
        let raw = URL_SAFE.decode(&sealed).unwrap();
        assert_eq!(raw.len(), IV_LEN + TOKEN.len());
        assert!(!sealed.contains('+') && !sealed.contains('/'));
    }

    #[test]
    fn test_long_keys_are_truncated() {
        let sealed = encrypt(TOKEN, &"k".repeat(40)).unwrap();
        assert_eq!(decrypt(&sealed, &"k".repeat(32)).unwrap(), TOKEN);
    }

    #[test]
    fn test_short_key_matches_explicit_zero_padding() {
        assert_eq!(normalize_key("abc")[..3], *b"abc");
        assert!(normalize_key("abc")[3..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_ciphertext_shorter_than_iv() {
        let short = URL_SAFE.encode([0u8; IV_LEN - 1]);
        assert!(matches!(
            decrypt(&short, "unit-test-key"),
            Err(CryptoError::TooShort(15))
        ));
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(
            decrypt("not base64!!", "unit-test-key"),
            Err(CryptoError::Encoding(_))
        ));
    }

    #[test]
    fn test_empty_plaintext_round_trips() {
        let sealed = encrypt("", "unit-test-key").unwrap();
        assert_eq!(decrypt(&sealed, "unit-test-key").unwrap(), "");
    }

    #[test]
    fn test_debug_redacts_key() {
        let cipher = CredentialCipher::new(&SecretString::from("very-private-key"));
        let debug_output = format!("{cipher:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("very-private-key"));
    }
}
