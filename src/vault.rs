//! Encryption at rest for platform OAuth tokens.
//!
//! ChaCha20-Poly1305 with a single process-wide key loaded at startup.
//! Each blob is `nonce || ciphertext`, base64url encoded; the Poly1305 tag
//! makes tampering detectable on decrypt.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

/// Nonce length for ChaCha20-Poly1305 (12 bytes).
const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption key is missing or malformed (expected 32 bytes, base64)")]
    BadKey,
    #[error("encryption failed")]
    Encrypt,
    #[error("ciphertext is malformed or has been tampered with")]
    Decrypt,
}

/// Stateless symmetric vault; cheap to clone, safe to share across tasks.
#[derive(Clone)]
pub struct Vault {
    key: Key,
}

impl Vault {
    /// Build a vault from the base64-encoded 32-byte key in configuration.
    pub fn from_key(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .or_else(|_| URL_SAFE_NO_PAD.decode(encoded.trim()))
            .map_err(|_| CryptoError::BadKey)?;
        if bytes.len() != 32 {
            return Err(CryptoError::BadKey);
        }
        Ok(Self {
            key: *Key::from_slice(&bytes),
        })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let cipher = ChaCha20Poly1305::new(&self.key);
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(blob))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CryptoError> {
        let blob = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| CryptoError::Decrypt)?;
        if blob.len() <= NONCE_LEN {
            return Err(CryptoError::Decrypt);
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);

        let cipher = ChaCha20Poly1305::new(&self.key);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CryptoError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Decrypt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vault() -> Vault {
        Vault::from_key(&STANDARD.encode([7u8; 32])).expect("test key")
    }

    #[test]
    fn roundtrip() {
        let vault = test_vault();
        let blob = vault.encrypt("very-secret-access-token").unwrap();
        assert_ne!(blob, "very-secret-access-token");
        assert_eq!(vault.decrypt(&blob).unwrap(), "very-secret-access-token");
    }

    #[test]
    fn nonces_differ_between_calls() {
        let vault = test_vault();
        let a = vault.encrypt("token").unwrap();
        let b = vault.encrypt("token").unwrap();
        assert_ne!(a, b);
        assert_eq!(vault.decrypt(&a).unwrap(), vault.decrypt(&b).unwrap());
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let vault = test_vault();
        let blob = vault.encrypt("token").unwrap();
        let mut raw = URL_SAFE_NO_PAD.decode(&blob).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(raw);
        assert!(matches!(vault.decrypt(&tampered), Err(CryptoError::Decrypt)));
    }

    #[test]
    fn garbage_input_is_rejected() {
        let vault = test_vault();
        assert!(matches!(vault.decrypt("not base64!!"), Err(CryptoError::Decrypt)));
        assert!(matches!(vault.decrypt(""), Err(CryptoError::Decrypt)));
    }

    #[test]
    fn wrong_key_cannot_decrypt() {
        let blob = test_vault().encrypt("token").unwrap();
        let other = Vault::from_key(&STANDARD.encode([9u8; 32])).unwrap();
        assert!(matches!(other.decrypt(&blob), Err(CryptoError::Decrypt)));
    }

    #[test]
    fn malformed_keys_are_fatal() {
        assert!(matches!(Vault::from_key("short"), Err(CryptoError::BadKey)));
        assert!(matches!(
            Vault::from_key(&STANDARD.encode([1u8; 16])),
            Err(CryptoError::BadKey)
        ));
        assert!(matches!(Vault::from_key(""), Err(CryptoError::BadKey)));
    }
}
