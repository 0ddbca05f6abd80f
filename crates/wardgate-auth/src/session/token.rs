//! Session token generation and hashing.
//!
//! Tokens are 32 CSPRNG bytes encoded as unpadded base64url. Only the
//! lowercase hex SHA-256 of a token is ever stored.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Token entropy in bytes.
pub const TOKEN_BYTES: usize = 32;

/// Generate a fresh session token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Lowercase hex SHA-256 of `value`.
pub fn sha256_hex(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}
