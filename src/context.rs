/// Application context and dependency injection
use crate::{
    cache::{CacheHandle, CacheStore},
    config::ServerConfig,
    error::ResolverResult,
    resolver::{DiscoveryResolver, HttpFetcher, ProviderFetcher},
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub cache: CacheHandle,
    pub resolver: Arc<DiscoveryResolver>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ResolverResult<Self> {
        // Validate configuration
        config.validate()?;

        // Connect cache backend
        let cache = CacheHandle::connect(&config.cache).await?;

        // Provider transport
        let fetcher: Arc<dyn ProviderFetcher> =
            Arc::new(HttpFetcher::new(&config.resolver.fetcher_config())?);

        Ok(Self::with_parts(config, cache, fetcher))
    }

    /// Assemble a context from already-built parts
    pub fn with_parts(
        config: ServerConfig,
        cache: CacheHandle,
        fetcher: Arc<dyn ProviderFetcher>,
    ) -> Self {
        let resolver = Arc::new(DiscoveryResolver::new(
            config.resolver.engine_config(),
            fetcher,
            cache.store(),
        ));

        Self {
            config: Arc::new(config),
            cache,
            resolver,
        }
    }

    pub fn cache_store(&self) -> Arc<dyn CacheStore> {
        self.cache.store()
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
