/// Password hashing with Argon2id.
///
/// Hashes are self-describing PHC strings carrying the algorithm,
/// parameters and salt, so verification needs no external state.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};

use crate::error::CryptoError;

/// Hash a password with a fresh random salt.
///
/// Two calls with the same password produce different hashes.
pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| CryptoError::EncryptFailed)
}

/// Verify a password against a stored hash.
///
/// Returns `false` for a malformed hash rather than erroring: a corrupt
/// stored hash must read as "wrong password", not as a server fault.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("secret123").unwrap();
        assert!(verify_password("secret123", &hash));
        assert!(!verify_password("secret124", &hash));
    }

    #[test]
    fn salting_gives_distinct_hashes() {
        let a = hash_password("secret123").unwrap();
        let b = hash_password("secret123").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("secret123", &a));
        assert!(verify_password("secret123", &b));
    }

    #[test]
    fn hash_never_contains_plaintext() {
        let hash = hash_password("secret123").unwrap();
        assert!(!hash.contains("secret123"));
    }

    #[test]
    fn malformed_hash_verifies_false() {
        assert!(!verify_password("secret123", "not-a-phc-string"));
        assert!(!verify_password("secret123", ""));
    }
}
