/// Generate a fresh field-encryption key for the ENCRYPTION_KEY setting.
///
/// Prints a 32-byte url-safe base64 key to stdout and nothing else, so
/// the output can be piped straight into an env file.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

fn main() {
    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    println!("{}", URL_SAFE_NO_PAD.encode(key));
}
