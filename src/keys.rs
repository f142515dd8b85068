//! Key Manager: RSA keypair for JWT signing, JWKS publication, and the
//! symmetric HMAC secret used to hash refresh/registration tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::error::OAuthError;
use crate::models::token::AccessClaims;

const RSA_KEY_BITS: usize = 2048;

/// A single RSA public key rendered as a JWK (RFC 7517).
#[derive(Debug, Clone, Serialize)]
pub struct Jwk {
    pub kty: &'static str,
    #[serde(rename = "use")]
    pub use_: &'static str,
    pub alg: &'static str,
    pub kid: String,
    pub n: String,
    pub e: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JwksDocument {
    pub keys: Vec<Jwk>,
}

struct SigningKey {
    kid: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    jwk: Jwk,
}

/// Holds the current (and optionally one previous, for rotation grace) RSA
/// signing key plus the HMAC secret used to hash opaque tokens before they
/// are persisted in the state store.
#[derive(Clone)]
pub struct KeyManager {
    current: Arc<SigningKey>,
    previous: Arc<Option<SigningKey>>,
    hmac_secret: Arc<Vec<u8>>,
}

impl KeyManager {
    /// Load the signing key from `key_path`, generating a fresh 2048-bit RSA
    /// key on first start if the file does not exist.
    pub fn load_or_generate(key_path: &str, hmac_secret: String) -> anyhow::Result<Self> {
        let private_key = match std::fs::read_to_string(key_path) {
            Ok(pem) => RsaPrivateKey::from_pkcs1_pem(&pem)?,
            Err(_) => {
                tracing::info!(path = key_path, "no signing key found, generating a new one");
                let key = RsaPrivateKey::new(&mut rand::thread_rng(), RSA_KEY_BITS)?;
                write_key_restricted(key_path, &key)?;
                key
            }
        };

        let current = Arc::new(signing_key_from(private_key)?);

        Ok(Self {
            current,
            previous: Arc::new(None),
            hmac_secret: Arc::new(hmac_secret.into_bytes()),
        })
    }

    pub fn hmac_secret(&self) -> &[u8] {
        &self.hmac_secret
    }

    /// Sign `claims` as a compact RS256 JWS using the current key.
    pub fn sign(&self, claims: &AccessClaims) -> Result<String, OAuthError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.current.kid.clone());
        encode(&header, claims, &self.current.encoding_key)
            .map_err(|e| OAuthError::ServerError(format!("token signing failed: {e}")))
    }

    /// Verify `token`'s signature and standard time claims, selecting the
    /// decoding key by the header's `kid` (current, or previous during a
    /// rotation grace window).
    pub fn verify(&self, token: &str) -> Result<AccessClaims, OAuthError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|_| OAuthError::InvalidGrant("malformed token".into()))?;

        let decoding_key = match header.kid.as_deref() {
            Some(kid) if kid == self.current.kid => &self.current.decoding_key,
            Some(kid) => match self.previous.as_ref() {
                Some(prev) if prev.kid == kid => &prev.decoding_key,
                _ => return Err(OAuthError::InvalidGrant("unknown signing key".into())),
            },
            None => return Err(OAuthError::InvalidGrant("missing key id".into())),
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.validate_aud = false;

        decode::<AccessClaims>(token, decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| OAuthError::InvalidGrant("invalid or expired token".into()))
    }

    /// The public keys in JWKS form: current key, plus the previous key
    /// during a rotation grace window.
    pub fn jwks(&self) -> JwksDocument {
        let mut keys = vec![self.current.jwk.clone()];
        if let Some(prev) = self.previous.as_ref() {
            keys.push(prev.jwk.clone());
        }
        JwksDocument { keys }
    }
}

fn signing_key_from(private_key: RsaPrivateKey) -> anyhow::Result<SigningKey> {
    let pem = private_key.to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)?;
    let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes())?;

    let public_key = private_key.to_public_key();
    let public_pem = rsa::pkcs1::EncodeRsaPublicKey::to_pkcs1_pem(
        &public_key,
        rsa::pkcs1::LineEnding::LF,
    )?;
    let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())?;

    // Derived from the modulus rather than randomized, so a restart that
    // reloads the same key file keeps the same `kid` and tokens signed
    // before the restart still verify.
    let kid = kid_from_modulus(&public_key);

    let jwk = Jwk {
        kty: "RSA",
        use_: "sig",
        alg: "RS256",
        kid: kid.clone(),
        n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
        e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
    };

    Ok(SigningKey {
        kid,
        encoding_key,
        decoding_key,
        jwk,
    })
}

fn kid_from_modulus(public_key: &rsa::RsaPublicKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(public_key.n().to_bytes_be());
    hex::encode(&hasher.finalize()[..16])
}

#[cfg(unix)]
fn write_key_restricted(path: &str, key: &RsaPrivateKey) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let pem = key.to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)?;
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, pem.as_bytes())?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn write_key_restricted(path: &str, key: &RsaPrivateKey) -> anyhow::Result<()> {
    let pem = key.to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)?;
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, pem.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::RngCore;

    fn test_claims() -> AccessClaims {
        let now = Utc::now().timestamp();
        AccessClaims {
            iss: "https://auth.example".into(),
            sub: "42".into(),
            aud: "mcp-gateway".into(),
            exp: now + 3600,
            iat: now,
            jti: "jti-1".into(),
            client_id: "client-1".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            scope: "mcp:*".into(),
        }
    }

    fn test_manager(dir: &std::path::Path) -> KeyManager {
        let path = dir.join("signing.pem");
        KeyManager::load_or_generate(path.to_str().unwrap(), "test-hmac-secret".into()).unwrap()
    }

    #[test]
    fn generates_key_on_first_use_and_reloads() {
        let dir = tempfile_dir();
        let path = dir.join("signing.pem");
        assert!(!path.exists());
        let manager1 = test_manager(&dir);
        assert!(path.exists());

        // A token signed before a restart must still verify after the
        // process reloads the same key file — the `kid` has to survive
        // the restart along with the key material itself.
        let pre_restart_token = manager1.sign(&test_claims()).unwrap();

        let manager2 =
            KeyManager::load_or_generate(path.to_str().unwrap(), "test-hmac-secret".into())
                .unwrap();

        assert!(manager2.verify(&pre_restart_token).is_ok());

        let claims = test_claims();
        let token = manager2.sign(&claims).unwrap();
        assert!(manager2.verify(&token).is_ok());
    }

    #[test]
    fn kid_is_stable_across_reload() {
        let dir = tempfile_dir();
        let path = dir.join("signing.pem");
        let manager1 = test_manager(&dir);
        let manager2 =
            KeyManager::load_or_generate(path.to_str().unwrap(), "test-hmac-secret".into())
                .unwrap();
        assert_eq!(manager1.jwks().keys[0].kid, manager2.jwks().keys[0].kid);
    }

    #[test]
    fn sign_then_verify_round_trips_claims() {
        let dir = tempfile_dir();
        let manager = test_manager(&dir);
        let claims = test_claims();
        let token = manager.sign(&claims).unwrap();
        let verified = manager.verify(&token).unwrap();
        assert_eq!(verified.sub, claims.sub);
        assert_eq!(verified.jti, claims.jti);
    }

    #[test]
    fn verify_rejects_tampered_token() {
        let dir = tempfile_dir();
        let manager = test_manager(&dir);
        let token = manager.sign(&test_claims()).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(manager.verify(&tampered).is_err());
    }

    #[test]
    fn jwks_exposes_current_key_with_kid() {
        let dir = tempfile_dir();
        let manager = test_manager(&dir);
        let jwks = manager.jwks();
        assert_eq!(jwks.keys.len(), 1);
        assert_eq!(jwks.keys[0].kty, "RSA");
        assert!(!jwks.keys[0].kid.is_empty());
    }

    fn tempfile_dir() -> std::path::PathBuf {
        let mut dir = std::env::temp_dir();
        let mut suffix = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut suffix);
        dir.push(format!("mcp-gateway-auth-test-{}", hex::encode(suffix)));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
