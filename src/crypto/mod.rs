/// Cryptographic primitives: field-level encryption and password hashing
pub mod cipher;
pub mod password;

pub use cipher::FieldCipher;
pub use password::{hash_password, verify_password};
