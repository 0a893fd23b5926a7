/// OpenDiscovery Resolver - HTTP entry point
use opendiscovery_resolver::{config::ServerConfig, jobs, server, AppContext, ResolverResult};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ResolverResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opendiscovery_resolver=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;
    tracing::info!(
        "OpenDiscovery resolver v{} (cache: {:?}, log level: {})",
        env!("CARGO_PKG_VERSION"),
        config.cache.backend,
        config.logging.level
    );

    // Create application context
    let ctx = Arc::new(AppContext::new(config).await?);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}
