//! PKCE (RFC 7636) pair for the password-reset code exchange.
//!
//! The verifier stays in an HttpOnly cookie on the browser that asked for the reset;
//! only its S256 challenge goes out with the reset email. A reset link opened in any
//! other browser therefore cannot be exchanged for a session.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

/// A 32-byte random value encoded as base64url without padding (43 characters).
pub fn generate_code_verifier() -> String {
    let random_bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// `BASE64URL(SHA256(verifier))`.
pub fn code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
