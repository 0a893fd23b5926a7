/// Configuration management for the OpenDiscovery resolver
use crate::{
    cache::CacheConfig,
    discovery::{TtlPolicy, MAX_TTL_SECS},
    error::{ResolverError, ResolverResult},
    resolver::{fetcher::DEFAULT_USER_AGENT, FetcherConfig, ResolverConfig},
};
use std::env;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub resolver: ResolutionConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Where `GET /` sends visitors
    pub homepage_url: String,
}

/// Resolution engine settings
#[derive(Debug, Clone)]
pub struct ResolutionConfig {
    pub ttl_min: u64,
    pub ttl_max: u64,
    pub ttl_default: u64,
    pub root_providers: Vec<String>,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl ResolutionConfig {
    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy::new(self.ttl_min, self.ttl_max, self.ttl_default)
    }

    pub fn engine_config(&self) -> ResolverConfig {
        ResolverConfig {
            ttl: self.ttl_policy(),
            root_providers: self.root_providers.clone(),
        }
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }
}

/// Parse a comma-separated provider list, dropping blanks
pub fn parse_provider_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_u64(name: &str, default: u64) -> ResolverResult<u64> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ResolverError::Config(format!("{} must be a positive integer", name))),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ResolverResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("RESOLVER_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("RESOLVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ResolverError::Config("Invalid port number".to_string()))?;
        let homepage_url = env::var("RESOLVER_HOMEPAGE_URL")
            .unwrap_or_else(|_| "https://github.com/OpenDiscoveryBiz/resolver".to_string());

        let ttl_min = parse_u64("RESOLVER_TTL_MIN", 60)?;
        let ttl_max = parse_u64("RESOLVER_TTL_MAX", 86400)?;
        let ttl_default = parse_u64("RESOLVER_TTL_DEFAULT", 3600)?;

        let root_providers = env::var("PROVIDER_ROOT")
            .map(|raw| parse_provider_list(&raw))
            .map_err(|_| ResolverError::Config("PROVIDER_ROOT is required".to_string()))?;

        let fetch_timeout_secs = parse_u64("RESOLVER_FETCH_TIMEOUT_SECS", 5)?;
        let user_agent =
            env::var("RESOLVER_USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                homepage_url,
            },
            resolver: ResolutionConfig {
                ttl_min,
                ttl_max,
                ttl_default,
                root_providers,
                fetch_timeout_secs,
                user_agent,
            },
            cache: CacheConfig::from_env()?,
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ResolverResult<()> {
        let resolver = &self.resolver;

        if resolver.root_providers.is_empty() {
            return Err(ResolverError::Config(
                "At least one root provider is required".to_string(),
            ));
        }

        if resolver.ttl_min == 0 || resolver.ttl_max == 0 || resolver.ttl_default == 0 {
            return Err(ResolverError::Config(
                "TTL bounds must be positive".to_string(),
            ));
        }

        if resolver.ttl_min > resolver.ttl_max {
            return Err(ResolverError::Config(format!(
                "RESOLVER_TTL_MIN ({}) exceeds RESOLVER_TTL_MAX ({})",
                resolver.ttl_min, resolver.ttl_max
            )));
        }

        if resolver.ttl_max > MAX_TTL_SECS {
            return Err(ResolverError::Config(format!(
                "RESOLVER_TTL_MAX ({}) exceeds {} seconds",
                resolver.ttl_max, MAX_TTL_SECS
            )));
        }

        if resolver.ttl_default < resolver.ttl_min || resolver.ttl_default > resolver.ttl_max {
            return Err(ResolverError::Config(format!(
                "RESOLVER_TTL_DEFAULT ({}) must lie within [{}, {}]",
                resolver.ttl_default, resolver.ttl_min, resolver.ttl_max
            )));
        }

        if resolver.fetch_timeout_secs == 0 {
            return Err(ResolverError::Config(
                "Fetch timeout must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
