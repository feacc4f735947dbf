/// Symmetric field-level encryption.
///
/// Encrypts individual column values with AES-256-GCM under a single
/// process-wide key loaded once from configuration. Ciphertexts are
/// self-contained (nonce prepended, GCM tag appended) and encoded as
/// url-safe base64 so they can live in TEXT columns.
///
/// There is no key rotation and no key-id tagging: changing the key
/// invalidates all previously encrypted data.
use crate::error::CryptoError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

/// Size of the GCM nonce in bytes (96 bits).
const NONCE_LEN: usize = 12;

/// Size of the encryption key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Field cipher holding the process-wide encryption key.
#[derive(Clone)]
pub struct FieldCipher {
    cipher: Aes256Gcm,
}

impl FieldCipher {
    /// Construct from a url-safe base64 encoded 32-byte key.
    ///
    /// Padding is accepted and ignored so both padded and unpadded
    /// encodings of the same key work.
    pub fn from_base64(key: &str) -> Result<Self, CryptoError> {
        let raw = URL_SAFE_NO_PAD
            .decode(key.trim_end_matches('='))
            .map_err(|_| CryptoError::InvalidKey)?;

        if raw.len() != KEY_LEN {
            return Err(CryptoError::InvalidKey);
        }

        let key = Key::<Aes256Gcm>::from_slice(&raw);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Encrypt a single field value.
    ///
    /// Empty input passes through unchanged: the schema treats "" the same
    /// as absent, and callers must not be able to tell encrypted columns
    /// apart from plain ones.
    ///
    /// Layout of the encoded bytes:
    /// ```text
    /// [ nonce (12 bytes) ][ ciphertext + GCM tag ]
    /// ```
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptFailed)?;

        let mut output = Vec::with_capacity(NONCE_LEN + sealed.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&sealed);

        Ok(URL_SAFE_NO_PAD.encode(output))
    }

    /// Decrypt a single field value. Inverse of [`encrypt`](Self::encrypt).
    ///
    /// Fails with `CryptoError::DecryptFailed` when the value was not
    /// produced under the current key or has been tampered with. The GCM
    /// authentication check guarantees no partial plaintext ever escapes.
    pub fn decrypt(&self, value: &str) -> Result<String, CryptoError> {
        if value.is_empty() {
            return Ok(String::new());
        }

        let raw = URL_SAFE_NO_PAD
            .decode(value.trim_end_matches('='))
            .map_err(|_| CryptoError::DecryptFailed)?;

        if raw.len() < NONCE_LEN {
            return Err(CryptoError::DecryptFailed);
        }

        let nonce = Nonce::from_slice(&raw[..NONCE_LEN]);
        let plaintext = self
            .cipher
            .decrypt(nonce, &raw[NONCE_LEN..])
            .map_err(|_| CryptoError::DecryptFailed)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptFailed)
    }

    /// Encrypt an optional value. `None` passes through untouched.
    pub fn encrypt_opt(&self, value: Option<&str>) -> Result<Option<String>, CryptoError> {
        value.map(|v| self.encrypt(v)).transpose()
    }

    /// Decrypt an optional value. `None` passes through untouched.
    pub fn decrypt_opt(&self, value: Option<&str>) -> Result<Option<String>, CryptoError> {
        value.map(|v| self.decrypt(v)).transpose()
    }
}

/// Generate a fresh url-safe base64 key. The `generate_key` binary is
/// the operator-facing version of this.
#[cfg(test)]
pub fn generate_key() -> String {
    let mut key = [0u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut key);
    URL_SAFE_NO_PAD.encode(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> FieldCipher {
        FieldCipher::from_base64(&generate_key()).unwrap()
    }

    #[test]
    fn round_trip() {
        let cipher = test_cipher();
        let plaintext = "Juan Pérez";
        let sealed = cipher.encrypt(plaintext).unwrap();

        assert_ne!(sealed, plaintext);
        assert_eq!(cipher.decrypt(&sealed).unwrap(), plaintext);
    }

    #[test]
    fn empty_passes_through() {
        let cipher = test_cipher();
        assert_eq!(cipher.encrypt("").unwrap(), "");
        assert_eq!(cipher.decrypt("").unwrap(), "");
    }

    #[test]
    fn fresh_nonce_per_call() {
        let cipher = test_cipher();
        let a = cipher.encrypt("same value").unwrap();
        let b = cipher.encrypt("same value").unwrap();
        assert_ne!(a, b);
        assert_eq!(cipher.decrypt(&a).unwrap(), cipher.decrypt(&b).unwrap());
    }

    #[test]
    fn wrong_key_fails_closed() {
        let sealed = test_cipher().encrypt("confidential").unwrap();
        let other = test_cipher();
        assert_eq!(other.decrypt(&sealed), Err(CryptoError::DecryptFailed));
    }

    #[test]
    fn tampered_ciphertext_rejected() {
        let cipher = test_cipher();
        let sealed = cipher.encrypt("confidential").unwrap();

        let mut raw = URL_SAFE_NO_PAD.decode(&sealed).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(raw);

        assert_eq!(cipher.decrypt(&tampered), Err(CryptoError::DecryptFailed));
    }

    #[test]
    fn garbage_input_rejected() {
        let cipher = test_cipher();
        assert_eq!(
            cipher.decrypt("not base64 at all!!"),
            Err(CryptoError::DecryptFailed)
        );
        assert_eq!(cipher.decrypt("c2hvcnQ"), Err(CryptoError::DecryptFailed));
    }

    #[test]
    fn padded_key_accepted() {
        let key = generate_key();
        let padded = format!("{}=", key);
        let a = FieldCipher::from_base64(&key).unwrap();
        let b = FieldCipher::from_base64(&padded).unwrap();
        let sealed = a.encrypt("x").unwrap();
        assert_eq!(b.decrypt(&sealed).unwrap(), "x");
    }

    #[test]
    fn short_key_rejected() {
        assert_eq!(
            FieldCipher::from_base64("dG9vLXNob3J0").err(),
            Some(CryptoError::InvalidKey)
        );
    }

    #[test]
    fn optional_values() {
        let cipher = test_cipher();
        assert_eq!(cipher.encrypt_opt(None).unwrap(), None);
        assert_eq!(cipher.decrypt_opt(None).unwrap(), None);

        let sealed = cipher.encrypt_opt(Some("note")).unwrap().unwrap();
        assert_eq!(cipher.decrypt_opt(Some(&sealed)).unwrap().unwrap(), "note");
    }
}
