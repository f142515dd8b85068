//! RFC 7591/7592 dynamic client registry. CRUD over `oauth:client:{id}`,
//! built on top of the typed State Store — no in-process memoization (a
//! stale record could let a deleted client keep issuing tokens).

use crate::dto::register::ClientMetadata;
use crate::error::RegistrationError;
use crate::keys::KeyManager;
use crate::models::Client;
use crate::state_store::StateStore;
use crate::utils::secret::{
    generate_opaque_token_with_length, generate_secret_with_length, hash_client_secret,
    hmac_token, verify_client_secret, verify_hmac_token,
};

const CLIENT_ID_LENGTH: usize = 16;
const CLIENT_SECRET_LENGTH: usize = 32;
const REGISTRATION_TOKEN_LENGTH: usize = 32;

#[derive(Clone)]
pub struct ClientRegistry {
    store: StateStore,
    keys: KeyManager,
    client_lifetime_secs: i64,
}

/// The plaintext credentials minted at registration time — shown to the
/// caller exactly once and never reconstructable afterward.
pub struct NewClientCredentials {
    pub client: Client,
    pub client_secret: Option<String>,
    pub registration_access_token: String,
}

impl ClientRegistry {
    pub fn new(store: StateStore, keys: KeyManager, client_lifetime_secs: i64) -> Self {
        Self {
            store,
            keys,
            client_lifetime_secs,
        }
    }

    pub async fn register(&self, metadata: ClientMetadata) -> Result<NewClientCredentials, RegistrationError> {
        validate_metadata(&metadata)?;

        let client_id = generate_opaque_token_with_length(CLIENT_ID_LENGTH);
        let auth_method = metadata
            .token_endpoint_auth_method
            .clone()
            .unwrap_or_else(|| "client_secret_post".to_string());

        let client_secret = if auth_method == "none" {
            None
        } else {
            Some(generate_secret_with_length(CLIENT_SECRET_LENGTH))
        };
        let client_secret_hash = client_secret
            .as_deref()
            .map(hash_client_secret)
            .transpose()
            .map_err(|e| RegistrationError::ServerError(e.to_string()))?;

        let registration_access_token = generate_opaque_token_with_length(REGISTRATION_TOKEN_LENGTH);
        let registration_access_token_hash =
            hmac_token(&registration_access_token, self.keys.hmac_secret());

        let now = unix_now();
        let expires_at = if self.client_lifetime_secs > 0 {
            now + self.client_lifetime_secs
        } else {
            0
        };

        let client = Client {
            client_id: client_id.clone(),
            client_secret_hash,
            registration_access_token_hash,
            redirect_uris: metadata.redirect_uris,
            client_name: metadata.client_name,
            client_uri: metadata.client_uri,
            logo_uri: metadata.logo_uri,
            contacts: metadata.contacts,
            tos_uri: metadata.tos_uri,
            policy_uri: metadata.policy_uri,
            software_id: metadata.software_id,
            software_version: metadata.software_version,
            grant_types: metadata
                .grant_types
                .unwrap_or_else(|| vec!["authorization_code".into(), "refresh_token".into()]),
            response_types: vec!["code".to_string()],
            token_endpoint_auth_method: auth_method,
            created_at: now,
            client_secret_expires_at: expires_at,
            extra: metadata.extra,
        };

        self.store
            .put_no_ttl(&Client::key(&client_id), &client)
            .await
            .map_err(RegistrationError::from)?;

        Ok(NewClientCredentials {
            client,
            client_secret,
            registration_access_token,
        })
    }

    /// Look up a client and verify the bearer registration token authorizes
    /// operations on it. Used by GET/PUT/DELETE `/register/{id}`.
    pub async fn authorize(&self, client_id: &str, bearer_token: &str) -> Result<Client, RegistrationError> {
        let client = self.get_live(client_id).await?;
        if !verify_hmac_token(bearer_token, self.keys.hmac_secret(), &client.registration_access_token_hash) {
            return Err(RegistrationError::Unauthorized);
        }
        Ok(client)
    }

    pub async fn put(
        &self,
        client_id: &str,
        bearer_token: &str,
        metadata: ClientMetadata,
    ) -> Result<Client, RegistrationError> {
        let existing = self.authorize(client_id, bearer_token).await?;

        if let Some(body_id) = &metadata.client_id {
            if body_id != client_id {
                return Err(RegistrationError::InvalidClientMetadata(
                    "client_id in body does not match path".into(),
                ));
            }
        }
        validate_metadata(&metadata)?;

        let auth_method = metadata
            .token_endpoint_auth_method
            .unwrap_or(existing.token_endpoint_auth_method);

        let updated = Client {
            client_id: existing.client_id,
            client_secret_hash: existing.client_secret_hash,
            registration_access_token_hash: existing.registration_access_token_hash,
            redirect_uris: metadata.redirect_uris,
            client_name: metadata.client_name,
            client_uri: metadata.client_uri,
            logo_uri: metadata.logo_uri,
            contacts: metadata.contacts,
            tos_uri: metadata.tos_uri,
            policy_uri: metadata.policy_uri,
            software_id: metadata.software_id,
            software_version: metadata.software_version,
            grant_types: metadata.grant_types.unwrap_or(existing.grant_types),
            response_types: vec!["code".to_string()],
            token_endpoint_auth_method: auth_method,
            created_at: existing.created_at,
            client_secret_expires_at: existing.client_secret_expires_at,
            extra: metadata.extra,
        };

        self.store
            .put_no_ttl(&Client::key(client_id), &updated)
            .await
            .map_err(RegistrationError::from)?;

        Ok(updated)
    }

    pub async fn delete(&self, client_id: &str, bearer_token: &str) -> Result<(), RegistrationError> {
        self.authorize(client_id, bearer_token).await?;
        self.store
            .delete(&Client::key(client_id))
            .await
            .map_err(RegistrationError::from)
    }

    /// Fetch a client record for internal use (token issuance, `/authorize`
    /// validation). Lazily evicts it if its lifetime has expired.
    pub async fn get_live(&self, client_id: &str) -> Result<Client, RegistrationError> {
        let client: Option<Client> = self
            .store
            .get(&Client::key(client_id))
            .await
            .map_err(RegistrationError::from)?;
        let client = client.ok_or(RegistrationError::NotFound)?;

        if client.is_expired(unix_now()) {
            let _ = self.store.delete(&Client::key(client_id)).await;
            return Err(RegistrationError::NotFound);
        }

        Ok(client)
    }

    pub fn verify_secret(&self, client: &Client, supplied: &str) -> Result<bool, RegistrationError> {
        match &client.client_secret_hash {
            Some(hash) => verify_client_secret(supplied, hash).map_err(|e| RegistrationError::ServerError(e.to_string())),
            None => Ok(false),
        }
    }
}

fn validate_metadata(metadata: &ClientMetadata) -> Result<(), RegistrationError> {
    if metadata.redirect_uris.is_empty() {
        return Err(RegistrationError::InvalidRedirectUri(
            "redirect_uris must be non-empty".into(),
        ));
    }
    for uri in &metadata.redirect_uris {
        validate_redirect_uri(uri)?;
    }

    if let Some(grant_types) = &metadata.grant_types {
        for grant in grant_types {
            if !crate::models::client::SUPPORTED_GRANT_TYPES.contains(&grant.as_str()) {
                return Err(RegistrationError::InvalidClientMetadata(format!(
                    "unsupported grant_type: {grant}"
                )));
            }
        }
    }

    if let Some(response_types) = &metadata.response_types {
        if response_types != &["code".to_string()] {
            return Err(RegistrationError::InvalidClientMetadata(
                "response_types must be [\"code\"]".into(),
            ));
        }
    }

    if let Some(method) = &metadata.token_endpoint_auth_method {
        if !crate::models::client::SUPPORTED_AUTH_METHODS.contains(&method.as_str()) {
            return Err(RegistrationError::InvalidClientMetadata(format!(
                "unsupported token_endpoint_auth_method: {method}"
            )));
        }
    }

    Ok(())
}

fn validate_redirect_uri(uri: &str) -> Result<(), RegistrationError> {
    let parsed = url::Url::parse(uri)
        .map_err(|_| RegistrationError::InvalidRedirectUri(format!("not an absolute URI: {uri}")))?;

    if parsed.scheme() == "http" {
        let host_is_local = matches!(parsed.host_str(), Some("localhost") | Some("127.0.0.1"));
        if !host_is_local {
            return Err(RegistrationError::InvalidRedirectUri(format!(
                "http:// is only allowed for localhost/127.0.0.1: {uri}"
            )));
        }
    }

    Ok(())
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
