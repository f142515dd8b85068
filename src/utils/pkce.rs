//! PKCE (Proof Key for Code Exchange, RFC 7636) verification.
//!
//! Only the `S256` challenge method is accepted — `/authorize` rejects any
//! other `code_challenge_method` before a flow state is ever persisted.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};

/// Minimum length for code_verifier as per RFC 7636.
pub const CODE_VERIFIER_MIN_LENGTH: usize = 43;

/// Maximum length for code_verifier as per RFC 7636.
pub const CODE_VERIFIER_MAX_LENGTH: usize = 128;

/// The only challenge method this server accepts.
pub const PKCE_METHOD_S256: &str = "S256";

/// Verify that `code_verifier` hashes (S256) to `code_challenge`.
pub fn verify_pkce(code_verifier: &str, code_challenge: &str) -> bool {
    let computed = compute_s256_challenge(code_verifier);
    constant_time_compare(&computed, code_challenge)
}

/// `code_challenge = BASE64URL(SHA256(code_verifier))`.
pub fn compute_s256_challenge(code_verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// RFC 7636 `code_verifier` shape: 43-128 chars of `[A-Za-z0-9-._~]`.
pub fn validate_code_verifier(verifier: &str) -> bool {
    let len = verifier.len();
    if !(CODE_VERIFIER_MIN_LENGTH..=CODE_VERIFIER_MAX_LENGTH).contains(&len) {
        return false;
    }
    verifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '~')
}

/// A `code_challenge` is a base64url string 43-128 characters long, the same
/// bounds RFC 7636 places on `code_verifier`.
pub fn validate_code_challenge(challenge: &str) -> bool {
    (CODE_VERIFIER_MIN_LENGTH..=CODE_VERIFIER_MAX_LENGTH).contains(&challenge.len())
        && challenge
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Constant-time string comparison to avoid leaking match length via timing.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
