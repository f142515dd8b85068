//! The authorization-code + PKCE state machine: `/authorize`, `/callback`,
//! `/token`, `/revoke`, `/introspect`. Produces and rotates JWTs + refresh
//! tokens. `client_credentials` has no place here — every token this engine
//! issues carries a federated human identity.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::dto::oauth::{AuthorizationRequest, IntrospectResponse, TokenResponse};
use crate::error::OAuthError;
use crate::keys::KeyManager;
use crate::models::{AccessClaims, AuthorizationCode, Client, FlowState, RefreshTokenRecord, TokenRecord, AUDIENCE};
use crate::services::client_registry::ClientRegistry;
use crate::services::idp_federator::{IdpFederator, UserProfile};
use crate::state_store::StateStore;
use crate::utils::pkce::{validate_code_challenge, verify_pkce, PKCE_METHOD_S256};
use crate::utils::secret::{generate_opaque_token, hmac_token};

const FLOW_STATE_LENGTH: usize = 16;
const AUTHZ_CODE_LENGTH: usize = 32;

/// Client-supplied credentials, resolved from either `Authorization: Basic`
/// or the form body, before the grant type is even looked at.
pub struct ClientAuth {
    pub client_id: String,
    pub client_secret: Option<String>,
}

pub enum AuthorizeOutcome {
    /// Validation passed; redirect the user-agent to the upstream IdP.
    RedirectToIdp(String),
    /// `client_id`/`redirect_uri` could not be trusted — render an HTML
    /// error page, never redirect to an unverified target.
    UntrustedRequest(String),
    /// Some other validation failure — redirect back to the (now-trusted)
    /// `redirect_uri` with an OAuth error.
    RedirectError {
        redirect_uri: String,
        error: &'static str,
        description: String,
        state: String,
    },
}

pub enum CallbackOutcome {
    Redirect(String),
    RedirectError {
        redirect_uri: String,
        error: &'static str,
        description: String,
        state: Option<String>,
    },
    BadRequest(String),
}

#[derive(Clone)]
pub struct OAuthEngine {
    store: StateStore,
    keys: KeyManager,
    registry: ClientRegistry,
    idp: IdpFederator,
    config: Arc<Config>,
}

impl OAuthEngine {
    pub fn new(store: StateStore, keys: KeyManager, registry: ClientRegistry, idp: IdpFederator, config: Arc<Config>) -> Self {
        Self {
            store,
            keys,
            registry,
            idp,
            config,
        }
    }

    pub async fn authorize(&self, req: &AuthorizationRequest) -> AuthorizeOutcome {
        let client = match self.registry.get_live(&req.client_id).await {
            Ok(client) => client,
            Err(_) => {
                return AuthorizeOutcome::UntrustedRequest(
                    "unknown or expired client_id".to_string(),
                )
            }
        };

        if !client.has_redirect_uri(&req.redirect_uri) {
            return AuthorizeOutcome::UntrustedRequest(
                "redirect_uri does not match any registered URI".to_string(),
            );
        }

        if req.response_type != "code" {
            return AuthorizeOutcome::RedirectError {
                redirect_uri: req.redirect_uri.clone(),
                error: "unsupported_response_type",
                description: "only response_type=code is supported".to_string(),
                state: req.state.clone(),
            };
        }

        if req.code_challenge_method != PKCE_METHOD_S256 {
            return AuthorizeOutcome::RedirectError {
                redirect_uri: req.redirect_uri.clone(),
                error: "invalid_request",
                description: "code_challenge_method must be S256".to_string(),
                state: req.state.clone(),
            };
        }

        if !validate_code_challenge(&req.code_challenge) {
            return AuthorizeOutcome::RedirectError {
                redirect_uri: req.redirect_uri.clone(),
                error: "invalid_request",
                description: "code_challenge must be a 43-character base64url string".to_string(),
                state: req.state.clone(),
            };
        }

        let flow_state_key = generate_opaque_token_base64(FLOW_STATE_LENGTH);
        let flow_state = FlowState {
            client_id: client.client_id.clone(),
            redirect_uri: req.redirect_uri.clone(),
            code_challenge: req.code_challenge.clone(),
            code_challenge_method: req.code_challenge_method.clone(),
            scope: req.scope.clone(),
            client_state: Some(req.state.clone()),
            created_at: unix_now(),
        };

        if let Err(_e) = self
            .store
            .put_if_absent(
                &FlowState::key(&flow_state_key),
                &flow_state,
                Duration::from_secs(FlowState::TTL_SECONDS as u64),
            )
            .await
        {
            return AuthorizeOutcome::RedirectError {
                redirect_uri: req.redirect_uri.clone(),
                error: "server_error",
                description: "could not start the authorization flow".to_string(),
                state: req.state.clone(),
            };
        }

        AuthorizeOutcome::RedirectToIdp(self.idp.begin(&flow_state_key))
    }

    pub async fn callback(&self, code: &str, state: &str) -> CallbackOutcome {
        let flow_state: Option<FlowState> = match self.store.take(&FlowState::key(state)).await {
            Ok(value) => value,
            Err(_) => return CallbackOutcome::BadRequest("state store unavailable".to_string()),
        };

        let flow_state = match flow_state {
            Some(fs) => fs,
            None => return CallbackOutcome::BadRequest("unknown or expired state".to_string()),
        };

        let profile: UserProfile = match self.idp.complete(code).await {
            Ok(profile) => profile,
            Err(_) => {
                return CallbackOutcome::RedirectError {
                    redirect_uri: flow_state.redirect_uri,
                    error: "access_denied",
                    description: "identity provider denied the request".to_string(),
                    state: flow_state.client_state,
                }
            }
        };

        let authz_code = generate_opaque_token_base64(AUTHZ_CODE_LENGTH);
        let record = AuthorizationCode {
            client_id: flow_state.client_id,
            redirect_uri: flow_state.redirect_uri.clone(),
            code_challenge: flow_state.code_challenge,
            scope: flow_state.scope,
            user_id: profile.user_id,
            user_name: profile.user_name,
            user_email: profile.user_email,
            created_at: unix_now(),
        };

        if self
            .store
            .put_if_absent(
                &AuthorizationCode::key(&authz_code),
                &record,
                Duration::from_secs(self.config.authz_code_lifetime_secs.max(1) as u64),
            )
            .await
            .is_err()
        {
            return CallbackOutcome::RedirectError {
                redirect_uri: flow_state.redirect_uri,
                error: "server_error",
                description: "could not issue an authorization code".to_string(),
                state: flow_state.client_state,
            };
        }

        let mut redirect_url = flow_state.redirect_uri;
        redirect_url.push_str(if redirect_url.contains('?') { "&" } else { "?" });
        redirect_url.push_str(&format!("code={}", urlencoding::encode(&authz_code)));
        if let Some(client_state) = flow_state.client_state {
            redirect_url.push_str(&format!("&state={}", urlencoding::encode(&client_state)));
        }

        CallbackOutcome::Redirect(redirect_url)
    }

    /// Resolve and authenticate the client making a `/token`, `/revoke`, or
    /// `/introspect` request.
    pub async fn authenticate_client(&self, auth: &ClientAuth) -> Result<Client, OAuthError> {
        let client = self
            .registry
            .get_live(&auth.client_id)
            .await
            .map_err(|_| OAuthError::InvalidClient)?;

        if client.is_public() {
            return Ok(client);
        }

        let secret = auth.client_secret.as_deref().ok_or(OAuthError::InvalidClient)?;
        let valid = self
            .registry
            .verify_secret(&client, secret)
            .map_err(|_| OAuthError::InvalidClient)?;
        if !valid {
            return Err(OAuthError::InvalidClient);
        }

        Ok(client)
    }

    pub async fn exchange_authorization_code(
        &self,
        client: &Client,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, OAuthError> {
        let record: Option<AuthorizationCode> = self
            .store
            .take(&AuthorizationCode::key(code))
            .await
            .map_err(OAuthError::from)?;
        let record = record.ok_or_else(|| OAuthError::InvalidGrant("unknown or expired authorization code".into()))?;

        if record.client_id != client.client_id {
            return Err(OAuthError::InvalidGrant("authorization code was not issued to this client".into()));
        }
        if record.redirect_uri != redirect_uri {
            return Err(OAuthError::InvalidGrant("redirect_uri does not match".into()));
        }
        if !verify_pkce(code_verifier, &record.code_challenge) {
            return Err(OAuthError::InvalidGrant("code_verifier does not match code_challenge".into()));
        }

        self.issue_tokens(client, &record.user_id, &record.user_name, &record.user_email, record.scope.as_deref())
            .await
    }

    pub async fn refresh(&self, client: &Client, refresh_token: &str) -> Result<TokenResponse, OAuthError> {
        let hash = hmac_token(refresh_token, self.keys.hmac_secret());
        let record: Option<RefreshTokenRecord> = self
            .store
            .take(&RefreshTokenRecord::key(&hash))
            .await
            .map_err(OAuthError::from)?;
        let record = record.ok_or_else(|| OAuthError::InvalidGrant("unknown or expired refresh token".into()))?;

        if record.client_id != client.client_id {
            return Err(OAuthError::InvalidGrant("refresh token was not issued to this client".into()));
        }

        self.store
            .delete(&TokenRecord::key(&record.parent_jti))
            .await
            .map_err(OAuthError::from)?;

        self.issue_tokens(
            client,
            &record.user_id,
            &record.user_name,
            "",
            Some(record.scope.as_str()),
        )
        .await
    }

    pub async fn revoke(&self, client: &Client, token: &str) -> Result<(), OAuthError> {
        if let Ok(claims) = self.keys.verify(token) {
            if claims.client_id == client.client_id {
                let _ = self.store.delete(&TokenRecord::key(&claims.jti)).await;
            }
            return Ok(());
        }

        let hash = hmac_token(token, self.keys.hmac_secret());
        let record: Option<RefreshTokenRecord> =
            self.store.get(&RefreshTokenRecord::key(&hash)).await.unwrap_or(None);
        if let Some(record) = record {
            if record.client_id == client.client_id {
                let _ = self.store.delete(&RefreshTokenRecord::key(&hash)).await;
            }
        }
        Ok(())
    }

    pub async fn introspect(&self, client: &Client, token: &str) -> IntrospectResponse {
        let claims = match self.keys.verify(token) {
            Ok(claims) => claims,
            Err(_) => return IntrospectResponse::inactive(),
        };

        if claims.client_id != client.client_id {
            return IntrospectResponse::inactive();
        }

        let record: Option<TokenRecord> = self.store.get(&TokenRecord::key(&claims.jti)).await.unwrap_or(None);
        if record.is_none() {
            return IntrospectResponse::inactive();
        }

        IntrospectResponse {
            active: true,
            sub: Some(claims.sub),
            aud: Some(claims.aud),
            client_id: Some(claims.client_id),
            scope: Some(claims.scope),
            exp: Some(claims.exp),
            iat: Some(claims.iat),
        }
    }

    async fn issue_tokens(
        &self,
        client: &Client,
        user_id: &str,
        user_name: &str,
        user_email: &str,
        scope: Option<&str>,
    ) -> Result<TokenResponse, OAuthError> {
        let now = unix_now();
        let jti = generate_opaque_token_base64(16);
        let scope = scope.unwrap_or("mcp:*").to_string();

        let claims = AccessClaims {
            iss: self.config.issuer_url.clone(),
            sub: user_id.to_string(),
            aud: AUDIENCE.to_string(),
            exp: now + self.config.access_token_lifetime_secs,
            iat: now,
            jti: jti.clone(),
            client_id: client.client_id.clone(),
            username: user_name.to_string(),
            email: user_email.to_string(),
            scope: scope.clone(),
        };

        let access_token = self.keys.sign(&claims)?;

        let token_record = TokenRecord {
            client_id: client.client_id.clone(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            scope: scope.clone(),
            issued_at: now,
            expires_at: claims.exp,
        };
        self.store
            .put(
                &TokenRecord::key(&jti),
                &token_record,
                Duration::from_secs(self.config.access_token_lifetime_secs.max(1) as u64),
            )
            .await
            .map_err(OAuthError::from)?;
        self.store
            .sadd(&TokenRecord::user_tokens_key(user_id), &jti)
            .await
            .map_err(OAuthError::from)?;

        let refresh_token = generate_opaque_token();
        let refresh_hash = hmac_token(&refresh_token, self.keys.hmac_secret());
        let refresh_record = RefreshTokenRecord {
            client_id: client.client_id.clone(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            scope: scope.clone(),
            issued_at: now,
            parent_jti: jti,
        };
        self.store
            .put(
                &RefreshTokenRecord::key(&refresh_hash),
                &refresh_record,
                Duration::from_secs(self.config.refresh_token_lifetime_secs.max(1) as u64),
            )
            .await
            .map_err(OAuthError::from)?;

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.config.access_token_lifetime_secs,
            scope,
        })
    }
}

fn generate_opaque_token_base64(len_bytes: usize) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use rand::RngCore;
    let mut bytes = vec![0u8; len_bytes];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
