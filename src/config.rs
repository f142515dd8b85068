use std::sync::Arc;

use crate::keys::KeyManager;
use crate::state_store::StateStore;

/// Application configuration loaded from environment variables. Secrets have
/// no in-code default — a missing `HMAC_SECRET` or IdP credential is a fatal
/// startup error, not a silently-insecure default.
#[derive(Clone)]
pub struct Config {
    pub issuer_url: String,
    pub base_domain: String,

    pub idp_client_id: String,
    pub idp_client_secret: String,
    pub idp_authorize_url: String,
    pub idp_token_url: String,
    pub idp_userinfo_url: String,

    pub allowed_users: String,

    pub jwt_signing_key_path: String,
    pub hmac_secret: String,
    pub store_url: String,

    pub client_lifetime_secs: i64,
    pub access_token_lifetime_secs: i64,
    pub refresh_token_lifetime_secs: i64,
    pub authz_code_lifetime_secs: i64,

    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            issuer_url: require_env("ISSUER_URL")?,
            base_domain: require_env("BASE_DOMAIN")?,

            idp_client_id: require_env("IDP_CLIENT_ID")?,
            idp_client_secret: require_env("IDP_CLIENT_SECRET")?,
            idp_authorize_url: require_env("IDP_AUTHORIZE_URL")?,
            idp_token_url: require_env("IDP_TOKEN_URL")?,
            idp_userinfo_url: require_env("IDP_USERINFO_URL")?,

            allowed_users: require_env("ALLOWED_USERS")?,

            jwt_signing_key_path: require_env("JWT_SIGNING_KEY_PATH")?,
            hmac_secret: require_env("HMAC_SECRET")?,
            store_url: require_env("STORE_URL")?,

            client_lifetime_secs: std::env::var("CLIENT_LIFETIME_SECONDS")
                .unwrap_or_else(|_| "7776000".to_string())
                .parse()?,
            access_token_lifetime_secs: std::env::var("ACCESS_TOKEN_LIFETIME_SECONDS")
                .unwrap_or_else(|_| "2592000".to_string())
                .parse()?,
            refresh_token_lifetime_secs: std::env::var("REFRESH_TOKEN_LIFETIME_SECONDS")
                .unwrap_or_else(|_| "31536000".to_string())
                .parse()?,
            authz_code_lifetime_secs: std::env::var("AUTHZ_CODE_LIFETIME_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()?,

            server_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: std::env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
        })
    }

    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.server_host, self.server_port)
            .parse()
            .expect("invalid socket address")
    }

    /// `*` disables the allowlist entirely; an empty string allows nobody.
    pub fn is_user_allowed(&self, username: &str) -> bool {
        if self.allowed_users.trim() == "*" {
            return true;
        }
        self.allowed_users
            .split(',')
            .map(str::trim)
            .any(|u| !u.is_empty() && u == username)
    }
}

fn require_env(key: &str) -> anyhow::Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("missing required environment variable {key}"))
}

/// Shared application state, built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: StateStore,
    pub keys: KeyManager,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = StateStore::connect(&config.store_url).await?;
        let keys = KeyManager::load_or_generate(&config.jwt_signing_key_path, config.hmac_secret.clone())?;
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            store,
            keys,
            http_client,
        })
    }

    pub fn registry(&self) -> crate::services::ClientRegistry {
        crate::services::ClientRegistry::new(self.store.clone(), self.keys.clone(), self.config.client_lifetime_secs)
    }

    pub fn idp(&self) -> crate::services::IdpFederator {
        crate::services::IdpFederator::new(self.http_client.clone(), self.config.clone())
    }

    pub fn engine(&self) -> crate::services::OAuthEngine {
        crate::services::OAuthEngine::new(
            self.store.clone(),
            self.keys.clone(),
            self.registry(),
            self.idp(),
            self.config.clone(),
        )
    }
}
