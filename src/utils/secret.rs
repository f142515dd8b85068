use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use crate::error::OAuthError;

type HmacSha256 = Hmac<Sha256>;

/// Minimum length for generated secrets.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Default length for generated client secrets.
pub const DEFAULT_SECRET_LENGTH: usize = 48;

/// Bcrypt cost factor used for `client_secret_hash`.
pub const BCRYPT_COST: u32 = 12;

const SECRET_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*-_=+";

/// Generate a cryptographically secure random client secret.
pub fn generate_secret() -> String {
    generate_secret_with_length(DEFAULT_SECRET_LENGTH)
}

pub fn generate_secret_with_length(length: usize) -> String {
    let length = length.max(MIN_SECRET_LENGTH);
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..SECRET_CHARSET.len());
            SECRET_CHARSET[idx] as char
        })
        .collect()
}

/// Hash a client secret with bcrypt before storing it as `client_secret_hash`.
/// Bcrypt is salted and non-deterministic — verification always compares
/// against the stored hash, never looks a secret up by its hash.
pub fn hash_client_secret(secret: &str) -> Result<String, OAuthError> {
    bcrypt::hash(secret, BCRYPT_COST)
        .map_err(|e| OAuthError::ServerError(format!("secret hashing failed: {e}")))
}

/// Verify a client secret against its stored bcrypt hash.
pub fn verify_client_secret(secret: &str, hash: &str) -> Result<bool, OAuthError> {
    bcrypt::verify(secret, hash)
        .map_err(|e| OAuthError::ServerError(format!("secret verification failed: {e}")))
}

// ============================================================================
// Opaque token generation and HMAC hashing
// ============================================================================
// Registration access tokens and refresh tokens are stored keyed by their own
// hash (`oauth:refresh:{token_hash}`), so the hash must be deterministic — a
// salted bcrypt hash can't serve as a lookup key. We HMAC-SHA256 the token
// with a server-held secret instead: deterministic for lookups, but unlike
// plain SHA256 it can't be recomputed by anyone who doesn't hold the key, so
// a leaked state-store dump doesn't hand out working tokens.
// ============================================================================

const TOKEN_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Default length for generated opaque tokens (safely above RFC 7636's
/// 43-character minimum entropy bar for `code_verifier`-class secrets).
pub const DEFAULT_TOKEN_LENGTH: usize = 43;

/// Generate a cryptographically secure random opaque token (authorization
/// code, refresh token, registration access token).
pub fn generate_opaque_token() -> String {
    generate_opaque_token_with_length(DEFAULT_TOKEN_LENGTH)
}

pub fn generate_opaque_token_with_length(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..TOKEN_CHARSET.len());
            TOKEN_CHARSET[idx] as char
        })
        .collect()
}

/// HMAC-SHA256 a token with `hmac_secret`, base64url-encoded, for use both as
/// the stored hash and as the state-store lookup key.
pub fn hmac_token(token: &str, hmac_secret: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(hmac_secret).expect("HMAC accepts keys of any length");
    mac.update(token.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Verify a token against its stored HMAC hash using a constant-time compare.
pub fn verify_hmac_token(token: &str, hmac_secret: &[u8], hash: &str) -> bool {
    constant_time_compare(&hmac_token(token, hmac_secret), hash)
}

/// Constant-time string comparison to prevent timing attacks.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_secret_meets_minimum_length() {
        let secret = generate_secret();
        assert!(secret.len() >= MIN_SECRET_LENGTH);
        assert_eq!(secret.len(), DEFAULT_SECRET_LENGTH);
    }

    #[test]
    fn generate_secret_enforces_minimum_on_short_request() {
        let secret = generate_secret_with_length(10);
        assert!(secret.len() >= MIN_SECRET_LENGTH);
    }

    #[test]
    fn generate_secret_is_unique() {
        assert_ne!(generate_secret(), generate_secret());
    }

    #[test]
    fn client_secret_hash_round_trips() {
        let secret = generate_secret();
        let hash = hash_client_secret(&secret).unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_client_secret(&secret, &hash).unwrap());
        assert!(!verify_client_secret("wrong-secret-value-not-it", &hash).unwrap());
    }

    #[test]
    fn client_secret_hash_is_salted() {
        let secret = "same-secret-value";
        let hash1 = hash_client_secret(secret).unwrap();
        let hash2 = hash_client_secret(secret).unwrap();
        assert_ne!(hash1, hash2);
        assert!(verify_client_secret(secret, &hash1).unwrap());
        assert!(verify_client_secret(secret, &hash2).unwrap());
    }

    #[test]
    fn opaque_token_default_length_and_charset() {
        let token = generate_opaque_token();
        assert_eq!(token.len(), DEFAULT_TOKEN_LENGTH);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn opaque_tokens_are_unique() {
        assert_ne!(generate_opaque_token(), generate_opaque_token());
    }

    #[test]
    fn hmac_token_is_deterministic() {
        let secret = b"a-server-held-hmac-secret";
        let token = "some-refresh-token-value";
        assert_eq!(hmac_token(token, secret), hmac_token(token, secret));
    }

    #[test]
    fn hmac_token_differs_by_key() {
        let token = "some-refresh-token-value";
        assert_ne!(hmac_token(token, b"secret-one"), hmac_token(token, b"secret-two"));
    }

    #[test]
    fn verify_hmac_token_detects_tampering() {
        let secret = b"a-server-held-hmac-secret";
        let token = "some-refresh-token-value";
        let hash = hmac_token(token, secret);
        assert!(verify_hmac_token(token, secret, &hash));
        assert!(!verify_hmac_token("a-different-token-value", secret, &hash));
    }

    #[test]
    fn constant_time_compare_matches_eq() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
