//! Typed wrapper over the Redis-backed state store: every persisted OAuth
//! record (clients, flow state, codes, tokens, refresh tokens) goes through
//! here. Defines the key schema's operation contract; callers never touch
//! `redis` directly.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::error::StoreError;

const OPERATION_TIMEOUT: Duration = Duration::from_secs(2);

/// Atomic get-and-delete: returns the value to exactly one caller even under
/// concurrent `take`s on the same key. Required for one-time code and
/// refresh-token redemption.
const TAKE_SCRIPT: &str = r#"
local value = redis.call('GET', KEYS[1])
if value then
    redis.call('DEL', KEYS[1])
end
return value
"#;

#[derive(Clone)]
pub struct StateStore {
    conn: ConnectionManager,
    take_script: redis::Script,
}

async fn with_timeout<T, E>(
    fut: impl std::future::Future<Output = Result<T, E>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(OPERATION_TIMEOUT, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(_)) => Err(StoreError::Unavailable),
        Err(_) => Err(StoreError::Unavailable),
    }
}

impl StateStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(|_| StoreError::Unavailable)?;
        let conn = with_timeout(client.get_connection_manager()).await?;
        Ok(Self {
            conn,
            take_script: redis::Script::new(TAKE_SCRIPT),
        })
    }

    /// Cheap liveness probe for `/ready`.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        with_timeout(redis::cmd("PING").query_async::<_, String>(&mut conn)).await?;
        Ok(())
    }

    pub async fn put<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut conn = self.conn.clone();
        with_timeout(conn.set_ex::<_, _, ()>(key, payload, ttl.as_secs().max(1))).await
    }

    /// Unconditional write with no expiry. Used for records whose lifetime is
    /// enforced at the application level (client registrations), not by the
    /// store's own TTL.
    pub async fn put_no_ttl<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut conn = self.conn.clone();
        with_timeout(conn.set::<_, _, ()>(key, payload)).await
    }

    /// Atomic create: succeeds (and writes) only if `key` did not already
    /// exist. Used for nonce-style entries (flow state, authorization code).
    pub async fn put_if_absent<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let payload =
            serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut conn = self.conn.clone();
        let opts = redis::SetOptions::default()
            .conditional_set(redis::ExistenceCheck::NX)
            .with_expiration(redis::SetExpiry::EX(ttl.as_secs().max(1) as usize));
        let result: Option<String> =
            with_timeout(conn.set_options(key, payload, opts)).await?;
        Ok(result.is_some())
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = with_timeout(conn.get(key)).await?;
        match raw {
            Some(payload) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Atomic get-and-delete.
    pub async fn take<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = with_timeout(
            self.take_script.key(key).invoke_async(&mut conn),
        )
        .await?;
        match raw {
            Some(payload) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        with_timeout(conn.del::<_, ()>(key)).await
    }

    pub async fn sadd(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        with_timeout(conn.sadd::<_, _, ()>(key, member)).await
    }

    pub async fn srem(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        with_timeout(conn.srem::<_, _, ()>(key, member)).await
    }

    pub async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        with_timeout(conn.smembers(key)).await
    }
}
