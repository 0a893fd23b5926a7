/// Redis cache backend
///
/// Records are stored as JSON strings under `<key_prefix><key>` with `SET EX`,
/// and read back in one `MGET` per lookup.
use super::{seconds_until, CacheConfig, CacheStore};
use crate::{
    discovery::DiscoveryRecord,
    error::{ResolverError, ResolverResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Redis cache client
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    key_prefix: String,
}

impl RedisCache {
    /// Connect to the configured Redis instance
    pub async fn connect(config: &CacheConfig) -> ResolverResult<Self> {
        info!("Connecting to Redis at {}", config.redis_url);

        let client = Client::open(config.redis_url.as_str()).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            ResolverError::Cache(format!("Redis client creation failed: {}", e))
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to connect to Redis: {}", e);
            ResolverError::Cache(format!("Redis connection failed: {}", e))
        })?;

        info!("Redis connection established");

        Ok(Self {
            connection,
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// Build a cache key with prefix
    fn build_key(&self, key: &str) -> String {
        prefixed(&self.key_prefix, key)
    }
}

fn prefixed(prefix: &str, key: &str) -> String {
    format!("{}{}", prefix, key)
}

/// Pair requested keys with raw `MGET` values, skipping misses and corrupt JSON
fn decode_values(keys: &[String], values: Vec<Option<String>>) -> HashMap<String, DiscoveryRecord> {
    keys.iter()
        .zip(values)
        .filter_map(|(key, value)| {
            let json = value?;
            match serde_json::from_str(&json) {
                Ok(record) => Some((key.clone(), record)),
                Err(e) => {
                    warn!(key = %key, "Skipping undecodable cached record: {}", e);
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get_many(&self, keys: &[String]) -> ResolverResult<HashMap<String, DiscoveryRecord>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let cache_keys: Vec<String> = keys.iter().map(|key| self.build_key(key)).collect();
        debug!("Cache MGET: {} keys", cache_keys.len());

        let mut conn = self.connection.clone();
        let values: Vec<Option<String>> = conn.mget(&cache_keys).await.map_err(|e| {
            warn!("Redis MGET failed: {}", e);
            ResolverError::Cache(format!("Cache get failed: {}", e))
        })?;

        let found = decode_values(keys, values);
        debug!("Cache MGET: {} hits", found.len());
        Ok(found)
    }

    async fn put(
        &self,
        key: &str,
        record: &DiscoveryRecord,
        expires_at: DateTime<Utc>,
    ) -> ResolverResult<()> {
        let cache_key = self.build_key(key);
        let ttl = seconds_until(expires_at, Utc::now());

        debug!("Cache SET: {} (TTL: {}s)", cache_key, ttl);

        let json = serde_json::to_string(record).map_err(|e| {
            error!("Failed to serialize record for cache: {}", e);
            ResolverError::Internal(format!("Cache serialization failed: {}", e))
        })?;

        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(&cache_key, json, ttl)
            .await
            .map_err(|e| {
                warn!("Redis SET failed for {}: {}", cache_key, e);
                ResolverError::Cache(format!("Cache set failed: {}", e))
            })?;

        Ok(())
    }

    async fn ping(&self) -> ResolverResult<()> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await.map_err(|e| {
            error!("Redis PING failed: {}", e);
            ResolverError::Cache(format!("Cache ping failed: {}", e))
        })?;

        if pong != "PONG" {
            return Err(ResolverError::Cache(
                "Unexpected Redis PING response".to_string(),
            ));
        }

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
