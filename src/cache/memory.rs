/// In-process cache backend
use super::CacheStore;
use crate::{discovery::DiscoveryRecord, error::ResolverResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

struct Entry {
    record: DiscoveryRecord,
    expires_at: DateTime<Utc>,
}

/// HashMap-backed store; expired entries are invisible and dropped by `purge_expired`
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let removed = before - entries.len();

        if removed > 0 {
            debug!(removed, remaining = entries.len(), "Purged expired cache entries");
        }
        removed
    }

    /// Number of stored entries, expired ones included
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Expiry of a live entry
    pub async fn expiry_of(&self, key: &str) -> Option<DateTime<Utc>> {
        let now = Utc::now();
        self.entries
            .read()
            .await
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.expires_at)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get_many(&self, keys: &[String]) -> ResolverResult<HashMap<String, DiscoveryRecord>> {
        let now = Utc::now();
        let entries = self.entries.read().await;

        Ok(keys
            .iter()
            .filter_map(|key| {
                entries
                    .get(key)
                    .filter(|entry| entry.expires_at > now)
                    .map(|entry| (key.clone(), entry.record.clone()))
            })
            .collect())
    }

    async fn put(
        &self,
        key: &str,
        record: &DiscoveryRecord,
        expires_at: DateTime<Utc>,
    ) -> ResolverResult<()> {
        debug!(key, %expires_at, "Cache PUT");
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                record: record.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn ping(&self) -> ResolverResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
