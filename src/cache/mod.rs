/// Caching layer for discovery records
///
/// The resolution engine only needs two things from a store:
/// - a batched read of every candidate key of a lookup
/// - a single write with an absolute expiry
///
/// Expiry is store-managed: nothing is ever deleted explicitly.

pub mod memory;
pub mod redis;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

use crate::{
    discovery::DiscoveryRecord,
    error::{ResolverError, ResolverResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Key-value store with per-key expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch all live entries among `keys`; missing or expired keys are absent from the map
    async fn get_many(&self, keys: &[String]) -> ResolverResult<HashMap<String, DiscoveryRecord>>;

    /// Store `record` under `key` until `expires_at`, overwriting any previous value
    async fn put(
        &self,
        key: &str,
        record: &DiscoveryRecord,
        expires_at: DateTime<Utc>,
    ) -> ResolverResult<()>;

    /// Check the backend is reachable
    async fn ping(&self) -> ResolverResult<()>;

    /// Backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}

/// Which store backs the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Redis,
}

impl std::str::FromStr for CacheBackend {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "redis" => Ok(CacheBackend::Redis),
            other => Err(ResolverError::Config(format!(
                "Unknown cache backend: {}",
                other
            ))),
        }
    }
}

/// Cache layer configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Store implementation (default: memory)
    pub backend: CacheBackend,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub redis_url: String,

    /// Key prefix for all cache entries (default: "opendiscovery:")
    pub key_prefix: String,

    /// How often the memory backend drops expired entries, in seconds (default: 300)
    pub sweep_interval: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "opendiscovery:".to_string(),
            sweep_interval: 300,
        }
    }
}

impl CacheConfig {
    /// Load from environment variables
    pub fn from_env() -> ResolverResult<Self> {
        Ok(Self {
            backend: std::env::var("CACHE_BACKEND")
                .unwrap_or_else(|_| "memory".to_string())
                .parse()?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            key_prefix: std::env::var("CACHE_KEY_PREFIX")
                .unwrap_or_else(|_| "opendiscovery:".to_string()),
            sweep_interval: std::env::var("CACHE_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),
        })
    }
}

/// Concrete store chosen at startup
///
/// The memory backend is kept typed so the sweep job can reach `purge_expired`.
#[derive(Clone)]
pub enum CacheHandle {
    Memory(Arc<MemoryCache>),
    Redis(Arc<RedisCache>),
    /// Store supplied by an embedding application
    External(Arc<dyn CacheStore>),
}

impl CacheHandle {
    /// Connect the configured backend
    pub async fn connect(config: &CacheConfig) -> ResolverResult<Self> {
        match config.backend {
            CacheBackend::Memory => {
                info!("Using in-memory discovery cache");
                Ok(CacheHandle::Memory(Arc::new(MemoryCache::new())))
            }
            CacheBackend::Redis => {
                let cache = RedisCache::connect(config).await?;
                Ok(CacheHandle::Redis(Arc::new(cache)))
            }
        }
    }

    pub fn store(&self) -> Arc<dyn CacheStore> {
        match self {
            CacheHandle::Memory(cache) => cache.clone(),
            CacheHandle::Redis(cache) => cache.clone(),
            CacheHandle::External(cache) => cache.clone(),
        }
    }
}

/// Seconds left until `expires_at`, never less than one
pub(crate) fn seconds_until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (expires_at - now).num_seconds().max(1) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.backend, CacheBackend::Memory);
        assert_eq!(config.key_prefix, "opendiscovery:");
        assert_eq!(config.sweep_interval, 300);
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("redis".parse::<CacheBackend>().unwrap(), CacheBackend::Redis);
        assert_eq!(" Memory ".parse::<CacheBackend>().unwrap(), CacheBackend::Memory);
        assert!("memcached".parse::<CacheBackend>().is_err());
    }

    #[test]
    fn test_seconds_until_floor() {
        let now = Utc::now();
        assert_eq!(seconds_until(now + Duration::seconds(90), now), 90);
        assert_eq!(seconds_until(now - Duration::seconds(5), now), 1);
    }
}
