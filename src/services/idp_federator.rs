//! Federates end-user identity to the upstream OAuth IdP (GitHub in the
//! reference deployment). Drives the upstream code exchange, fetches the
//! user profile, and enforces the user allowlist.

use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::error::OAuthError;

const IDP_TIMEOUT: Duration = Duration::from_secs(10);
const IDP_SCOPE: &str = "read:user user:email";

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
}

#[derive(Deserialize)]
struct IdpTokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct IdpUserResponse {
    id: serde_json::Value,
    login: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Clone)]
pub struct IdpFederator {
    client: reqwest::Client,
    config: std::sync::Arc<Config>,
}

impl IdpFederator {
    pub fn new(client: reqwest::Client, config: std::sync::Arc<Config>) -> Self {
        Self { client, config }
    }

    /// Build the upstream authorize URL that `/authorize` redirects the
    /// user-agent to. `state` is the key under which our own flow state is
    /// stored, reused as the upstream `state` parameter so `/callback` can
    /// look it back up.
    pub fn begin(&self, state: &str) -> String {
        let redirect_uri = format!("{}/callback", self.config.issuer_url);
        let mut url = url::Url::parse(&self.config.idp_authorize_url)
            .expect("IDP_AUTHORIZE_URL must be a valid URL");
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.idp_client_id)
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("scope", IDP_SCOPE)
            .append_pair("state", state);
        url.to_string()
    }

    /// Exchange the upstream authorization code for a user profile, enforcing
    /// the allowlist. Any failure — network, upstream rejection, or
    /// allowlist miss — collapses to `OAuthError::AccessDenied` since the
    /// caller always renders it as an `access_denied` redirect.
    pub async fn complete(&self, code: &str) -> Result<UserProfile, OAuthError> {
        let redirect_uri = format!("{}/callback", self.config.issuer_url);

        let token_response = tokio::time::timeout(
            IDP_TIMEOUT,
            self.client
                .post(&self.config.idp_token_url)
                .header("Accept", "application/json")
                .form(&[
                    ("client_id", self.config.idp_client_id.as_str()),
                    ("client_secret", self.config.idp_client_secret.as_str()),
                    ("code", code),
                    ("redirect_uri", redirect_uri.as_str()),
                ])
                .send(),
        )
        .await
        .map_err(|_| OAuthError::AccessDenied)?
        .map_err(|_| OAuthError::AccessDenied)?
        .json::<IdpTokenResponse>()
        .await
        .map_err(|_| OAuthError::AccessDenied)?;

        let user = tokio::time::timeout(
            IDP_TIMEOUT,
            self.client
                .get(&self.config.idp_userinfo_url)
                .bearer_auth(&token_response.access_token)
                .header("User-Agent", "mcp-gateway-auth")
                .send(),
        )
        .await
        .map_err(|_| OAuthError::AccessDenied)?
        .map_err(|_| OAuthError::AccessDenied)?
        .json::<IdpUserResponse>()
        .await
        .map_err(|_| OAuthError::AccessDenied)?;

        if !self.config.is_user_allowed(&user.login) {
            return Err(OAuthError::AccessDenied);
        }

        Ok(UserProfile {
            user_id: user.id.to_string().trim_matches('"').to_string(),
            user_name: user.login,
            user_email: user.email.unwrap_or_default(),
        })
    }
}
