/// Discovery Resolver - Orchestrates the official and voluntary tracks with caching
///
/// Resolution order for one identifier:
/// 1. Batch-read every candidate cache key
/// 2. Official track: cached record, or a chain starting at the longest cached
///    redirect prefix (falling back to the root providers)
/// 3. Voluntary track: only when the official record advertises voluntary providers
/// 4. Compose the lookup result

pub mod chain;
pub mod fetcher;
pub mod snapshot;

pub use chain::{ChainOutcome, ChainResolver, Track};
pub use fetcher::{FetcherConfig, HttpFetcher, ProviderFetcher};
pub use snapshot::CacheSnapshot;

use crate::{
    cache::CacheStore,
    discovery::{
        codes, CandidateKeys, DiscoveryRecord, Identifier, RecordKind, ResolutionResult,
        TtlPolicy, PRESENTATION_TTL,
    },
    metrics,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolution engine configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Bounds for provider-declared cache TTLs
    pub ttl: TtlPolicy,
    /// Providers asked when no cached redirect narrows the search
    pub root_providers: Vec<String>,
}

/// Main resolver - combines the cache with provider chains
pub struct DiscoveryResolver {
    chain: ChainResolver,
    cache: Arc<dyn CacheStore>,
    config: ResolverConfig,
}

impl DiscoveryResolver {
    pub fn new(
        config: ResolverConfig,
        fetcher: Arc<dyn ProviderFetcher>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            chain: ChainResolver::new(fetcher, cache.clone(), config.ttl),
            cache,
            config,
        }
    }

    /// Resolve a normalized identifier
    ///
    /// Always produces a result; provider failures are encoded in the records.
    pub async fn resolve_identifier(&self, id: &Identifier) -> ResolutionResult {
        let keys = CandidateKeys::for_identifier(id);
        let mut snapshot = self.prefetch(&keys).await;

        let official = self.resolve_official(id, &keys, &mut snapshot).await;
        let voluntary = self
            .resolve_voluntary(id, &keys, &official, &mut snapshot)
            .await;

        metrics::record_lookup(!official.has_error());
        info!(
            %id,
            official_error = official.error_code().unwrap_or("none"),
            voluntary_error = voluntary.error_code().unwrap_or("none"),
            "Lookup resolved"
        );

        ResolutionResult {
            id: id.to_string(),
            ttl: PRESENTATION_TTL,
            official,
            voluntary,
        }
    }

    /// One batched read of every candidate key
    ///
    /// A failing cache degrades to an empty snapshot; the lookup goes live.
    async fn prefetch(&self, keys: &CandidateKeys) -> CacheSnapshot {
        match self.cache.get_many(&keys.all()).await {
            Ok(entries) => {
                debug!(hits = entries.len(), "Cache prefetch");
                CacheSnapshot::new(entries)
            }
            Err(e) => {
                warn!("Cache prefetch failed, resolving live: {}", e);
                CacheSnapshot::default()
            }
        }
    }

    async fn resolve_official(
        &self,
        id: &Identifier,
        keys: &CandidateKeys,
        snapshot: &mut CacheSnapshot,
    ) -> DiscoveryRecord {
        if let Some(cached) = snapshot.get(&keys.official) {
            metrics::record_cache_access(Track::Official.as_str(), true);
            debug!(%id, "Official record served from cache");
            return cached.clone();
        }
        metrics::record_cache_access(Track::Official.as_str(), false);

        let providers = match snapshot.longest_redirect(keys) {
            Some((key, providers)) => {
                debug!(%id, key, "Starting from cached redirect");
                providers
            }
            None => self.config.root_providers.clone(),
        };

        let outcome = self
            .chain
            .resolve(Track::Official, providers, id, snapshot)
            .await;

        // Only successful answers are cached; error documents and synthetic
        // failures are asked again on the next lookup
        if let ChainOutcome::Resolved(record) = &outcome {
            if !record.has_error() {
                self.store(&keys.official, record).await;
            }
        }

        outcome.into_record()
    }

    async fn resolve_voluntary(
        &self,
        id: &Identifier,
        keys: &CandidateKeys,
        official: &DiscoveryRecord,
        snapshot: &mut CacheSnapshot,
    ) -> DiscoveryRecord {
        let providers = official.voluntary_provider_list();
        if official.has_error() || providers.is_empty() {
            return DiscoveryRecord::synthetic_error(
                RecordKind::Voluntary,
                codes::OFFICIAL_NOT_AVAILABLE,
                None,
            );
        }

        if let Some(cached) = snapshot.get(&keys.voluntary) {
            metrics::record_cache_access(Track::Voluntary.as_str(), true);
            debug!(%id, "Voluntary record served from cache");
            return cached.clone();
        }
        metrics::record_cache_access(Track::Voluntary.as_str(), false);

        let record = self
            .chain
            .resolve(Track::Voluntary, providers, id, snapshot)
            .await
            .into_record();

        // Failures too, so a down voluntary provider is not hit on every lookup
        self.store(&keys.voluntary, &record).await;

        record
    }

    async fn store(&self, key: &str, record: &DiscoveryRecord) {
        let expires_at = self.config.ttl.resolve_expiry(record.declared_ttl());
        if let Err(e) = self.cache.put(key, record, expires_at).await {
            warn!(key, "Failed to cache record: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::error::{FetchError, ResolverError, ResolverResult};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Provider network keyed by base URL, with a call log
    #[derive(Default)]
    struct FakeNetwork {
        answers: Mutex<HashMap<String, Value>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeNetwork {
        fn answer(&self, provider: &str, doc: Value) {
            self.answers
                .lock()
                .unwrap()
                .insert(provider.to_string(), doc);
        }

        fn take_down(&self, provider: &str) {
            self.answers.lock().unwrap().remove(provider);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn reset_calls(&self) {
            self.calls.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl ProviderFetcher for FakeNetwork {
        async fn fetch(
            &self,
            provider: &str,
            id: &Identifier,
        ) -> Result<DiscoveryRecord, FetchError> {
            self.calls.lock().unwrap().push(provider.to_string());
            let doc = self
                .answers
                .lock()
                .unwrap()
                .get(provider)
                .cloned()
                .ok_or_else(|| FetchError::Transport(format!("{} connection refused", provider)))?;
            fetcher::parse_document(id, &doc.to_string())
        }
    }

    /// Store whose reads and writes always fail
    struct BrokenCache;

    #[async_trait]
    impl CacheStore for BrokenCache {
        async fn get_many(
            &self,
            _keys: &[String],
        ) -> ResolverResult<HashMap<String, DiscoveryRecord>> {
            Err(ResolverError::Cache("connection reset".to_string()))
        }

        async fn put(
            &self,
            _key: &str,
            _record: &DiscoveryRecord,
            _expires_at: DateTime<Utc>,
        ) -> ResolverResult<()> {
            Err(ResolverError::Cache("connection reset".to_string()))
        }

        async fn ping(&self) -> ResolverResult<()> {
            Err(ResolverError::Cache("connection reset".to_string()))
        }

        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    const ROOT_A: &str = "https://root-a.example";
    const ROOT_B: &str = "https://root-b.example";

    fn config() -> ResolverConfig {
        ResolverConfig {
            ttl: TtlPolicy::new(60, 3600, 300),
            root_providers: vec![ROOT_A.to_string(), ROOT_B.to_string()],
        }
    }

    fn setup() -> (DiscoveryResolver, Arc<FakeNetwork>, Arc<MemoryCache>) {
        let network = Arc::new(FakeNetwork::default());
        let cache = Arc::new(MemoryCache::new());
        let resolver = DiscoveryResolver::new(config(), network.clone(), cache.clone());
        (resolver, network, cache)
    }

    fn id(raw: &str) -> Identifier {
        Identifier::normalize(raw).unwrap()
    }

    fn record(doc: Value) -> DiscoveryRecord {
        serde_json::from_value(doc).unwrap()
    }

    async fn cached(cache: &MemoryCache, key: &str) -> Option<DiscoveryRecord> {
        cache
            .get_many(&[key.to_string()])
            .await
            .unwrap()
            .remove(key)
    }

    #[tokio::test]
    async fn test_official_without_voluntary_providers() {
        let (resolver, network, cache) = setup();
        network.answer(
            ROOT_A,
            json!({"type": "official", "id": "DK1234", "name": "Example ApS"}),
        );

        let result = resolver.resolve_identifier(&id("DK1234")).await;

        assert_eq!(result.id, "DK1234");
        assert_eq!(result.ttl, PRESENTATION_TTL);
        assert_eq!(result.official.extra["name"], json!("Example ApS"));
        assert_eq!(
            result.voluntary.error_code(),
            Some(codes::OFFICIAL_NOT_AVAILABLE)
        );
        assert!(cached(&cache, "DK1234_official").await.is_some());
        // Derived, never cached
        assert!(cached(&cache, "DK1234_voluntary").await.is_none());
    }

    #[tokio::test]
    async fn test_resolving_twice_is_identical_and_cached() {
        let (resolver, network, _) = setup();
        network.answer(
            ROOT_A,
            json!({
                "type": "official",
                "id": "DK1234",
                "ttl": 900,
                "voluntaryProviders": ["https://vol.example"]
            }),
        );
        network.answer(
            "https://vol.example",
            json!({"type": "voluntary", "id": "DK1234", "email": "hello@example.com"}),
        );

        let first = resolver.resolve_identifier(&id("DK1234")).await;
        network.reset_calls();
        let second = resolver.resolve_identifier(&id("DK1234")).await;

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert!(network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_preseeded_official_skips_fetch() {
        let (resolver, network, cache) = setup();
        cache
            .put(
                "DK1234_official",
                &record(json!({"type": "official", "id": "DK1234", "name": "Cached"})),
                Utc::now() + Duration::seconds(60),
            )
            .await
            .unwrap();

        let result = resolver.resolve_identifier(&id("DK1234")).await;

        assert_eq!(result.official.extra["name"], json!("Cached"));
        assert!(network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cached_redirect_chain_short_circuits() {
        let (resolver, network, cache) = setup();
        network.answer(
            ROOT_A,
            json!({"type": "redirect", "id": "DK", "providers": ["https://a.example"]}),
        );
        network.answer(
            "https://a.example",
            json!({"type": "redirect", "id": "DK12", "providers": ["https://b.example"]}),
        );
        network.answer(
            "https://b.example",
            json!({"type": "official", "id": "DK12"}),
        );

        let first = resolver.resolve_identifier(&id("DK123456")).await;
        assert!(!first.official.has_error());
        assert_eq!(
            network.calls(),
            vec![ROOT_A, "https://a.example", "https://b.example"]
        );
        assert!(cached(&cache, "DK_redirect").await.is_some());
        assert!(cached(&cache, "DK12_redirect").await.is_some());

        // Sibling under DK12 goes straight to B
        network.reset_calls();
        let sibling = resolver.resolve_identifier(&id("DK129999")).await;
        assert!(!sibling.official.has_error());
        assert_eq!(network.calls(), vec!["https://b.example"]);
    }

    #[tokio::test]
    async fn test_more_specific_redirect_is_preferred() {
        let (resolver, network, _) = setup();
        network.answer(
            ROOT_A,
            json!({"type": "redirect", "id": "DK12", "providers": ["https://short.example"]}),
        );
        network.answer(
            "https://short.example",
            json!({"type": "redirect", "id": "DK1234", "providers": ["https://long.example"]}),
        );
        network.answer(
            "https://long.example",
            json!({"type": "official", "id": "DK1234"}),
        );

        resolver.resolve_identifier(&id("DK123456")).await;

        network.reset_calls();
        resolver.resolve_identifier(&id("DK123499")).await;
        assert_eq!(network.calls(), vec!["https://long.example"]);

        // DK12 still routes identifiers outside DK1234
        network.reset_calls();
        network.answer(
            "https://short.example",
            json!({"type": "official", "id": "DK12"}),
        );
        resolver.resolve_identifier(&id("DK129999")).await;
        assert_eq!(network.calls(), vec!["https://short.example"]);
    }

    #[tokio::test]
    async fn test_all_providers_down() {
        let (resolver, network, cache) = setup();

        let result = resolver.resolve_identifier(&id("DK1234")).await;

        assert_eq!(network.calls(), vec![ROOT_A, ROOT_B]);
        assert_eq!(result.official.record_type.as_deref(), Some("official"));
        assert_eq!(result.official.error_code(), Some(codes::UPSTREAM_DOWN));
        assert_eq!(
            result.voluntary.error_code(),
            Some(codes::OFFICIAL_NOT_AVAILABLE)
        );
        // Synthetic official failures are not cached
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_voluntary_chain_is_cached() {
        let (resolver, network, cache) = setup();
        network.answer(
            ROOT_A,
            json!({
                "type": "official",
                "id": "DK1234",
                "voluntaryProviders": ["https://vol-1.example", "https://vol-2.example"]
            }),
        );

        let first = resolver.resolve_identifier(&id("DK1234")).await;
        assert_eq!(first.voluntary.error_code(), Some(codes::UPSTREAM_DOWN));
        assert_eq!(
            first.voluntary.error_detailed.as_deref(),
            Some("voluntary providers down: https://vol-2.example connection refused")
        );
        assert!(cached(&cache, "DK1234_voluntary").await.is_some());

        network.reset_calls();
        let second = resolver.resolve_identifier(&id("DK1234")).await;
        assert_eq!(second.voluntary, first.voluntary);
        assert!(network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_document_blocks_voluntary() {
        let (resolver, network, _) = setup();
        network.answer(
            ROOT_A,
            json!({
                "type": "official",
                "error": "not_found",
                "voluntaryProviders": ["https://vol.example"]
            }),
        );

        let result = resolver.resolve_identifier(&id("DK1234")).await;

        assert_eq!(result.official.error_code(), Some("not_found"));
        assert_eq!(
            result.voluntary.error_code(),
            Some(codes::OFFICIAL_NOT_AVAILABLE)
        );
        assert!(!network.calls().contains(&"https://vol.example".to_string()));
    }

    #[tokio::test]
    async fn test_provider_error_document_is_not_cached() {
        let (resolver, network, cache) = setup();
        network.answer(ROOT_A, json!({"type": "official", "error": "not_found"}));

        let first = resolver.resolve_identifier(&id("DK1234")).await;
        assert_eq!(first.official.error_code(), Some("not_found"));
        assert!(cached(&cache, "DK1234_official").await.is_none());

        // Next lookup asks the provider again
        network.reset_calls();
        network.answer(ROOT_A, json!({"type": "official", "id": "DK1234"}));
        let second = resolver.resolve_identifier(&id("DK1234")).await;
        assert!(!second.official.has_error());
        assert_eq!(network.calls(), vec![ROOT_A]);
        assert!(cached(&cache, "DK1234_official").await.is_some());
    }

    #[tokio::test]
    async fn test_invalid_answer_falls_back_to_second_root() {
        let (resolver, network, _) = setup();
        network.answer(ROOT_A, json!({"type": "official", "id": "NO1234"}));
        network.answer(ROOT_B, json!({"type": "official", "id": "DK1234"}));

        let result = resolver.resolve_identifier(&id("DK1234")).await;

        assert!(!result.official.has_error());
        assert_eq!(result.official.id.as_deref(), Some("DK1234"));
    }

    #[tokio::test]
    async fn test_endless_redirects_end_in_upstream_down() {
        let (resolver, network, _) = setup();
        network.answer(
            ROOT_A,
            json!({"type": "redirect", "providers": [ROOT_A]}),
        );

        let result = resolver.resolve_identifier(&id("DK1234")).await;

        assert_eq!(result.official.error_code(), Some(codes::UPSTREAM_DOWN));
        assert_eq!(network.calls().len(), chain::MAX_HOPS);
    }

    #[tokio::test]
    async fn test_cache_ttl_follows_policy() {
        let (resolver, network, cache) = setup();
        network.answer(
            ROOT_A,
            json!({"type": "official", "id": "DK1234", "ttl": 99999}),
        );

        let before = Utc::now();
        resolver.resolve_identifier(&id("DK1234")).await;

        let lifetime = (cache.expiry_of("DK1234_official").await.unwrap() - before).num_seconds();
        assert!((3599..=3601).contains(&lifetime), "lifetime was {}", lifetime);
    }

    #[tokio::test]
    async fn test_broken_cache_still_resolves() {
        let network = Arc::new(FakeNetwork::default());
        network.answer(ROOT_A, json!({"type": "official", "id": "DK1234"}));
        let resolver = DiscoveryResolver::new(config(), network.clone(), Arc::new(BrokenCache));

        let result = resolver.resolve_identifier(&id("DK1234")).await;

        assert!(!result.official.has_error());
        assert_eq!(network.calls(), vec![ROOT_A]);
    }

    #[tokio::test]
    async fn test_root_going_down_after_seeding() {
        let (resolver, network, _) = setup();
        network.answer(
            ROOT_A,
            json!({"type": "redirect", "id": "DK", "providers": ["https://dk.example"]}),
        );
        network.answer(
            "https://dk.example",
            json!({"type": "official", "id": "DK"}),
        );
        resolver.resolve_identifier(&id("DK1111")).await;

        network.take_down(ROOT_A);
        network.reset_calls();
        let result = resolver.resolve_identifier(&id("DK2222")).await;

        assert!(!result.official.has_error());
        assert_eq!(network.calls(), vec!["https://dk.example"]);
    }
}
