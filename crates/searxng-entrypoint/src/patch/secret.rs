use rand::RngCore;
use rand::rngs::OsRng;

/// Secret key value shipped in the settings template.
pub const SECRET_KEY_PLACEHOLDER: &str = "ultrasecretkey";

const SECRET_KEY_BYTES: usize = 32;

/// Generates a fresh `server.secret_key`: 32 random bytes, hex encoded.
#[must_use]
pub fn generate_secret_key() -> String {
    let mut bytes = [0u8; SECRET_KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
