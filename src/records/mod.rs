/// Patient and therapy-session repositories.
///
/// These managers own the encrypted-column boundary: designated columns
/// are encrypted before every bind and decrypted after every read, so
/// the rest of the crate only ever handles plaintext.
mod patients;
mod sessions;

pub use patients::PatientManager;
pub use sessions::SessionManager;
