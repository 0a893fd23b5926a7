use crate::{cache::CacheHandle, context::AppContext, metrics};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, info};

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        match &self.context.cache {
            CacheHandle::Memory(_) => {
                tokio::spawn(Self::cache_sweep_job(Arc::clone(&self)));
            }
            // Redis expires keys on its own; external stores manage their own expiry
            CacheHandle::Redis(_) | CacheHandle::External(_) => {}
        }

        info!("Background jobs started");
    }

    /// Drop expired in-memory cache entries (runs every `CACHE_SWEEP_INTERVAL_SECS`)
    async fn cache_sweep_job(scheduler: Arc<Self>) {
        let period = Duration::from_secs(scheduler.context.config.cache.sweep_interval.max(1));
        let mut interval = interval(period);

        loop {
            interval.tick().await;

            if let CacheHandle::Memory(cache) = &scheduler.context.cache {
                let removed = cache.purge_expired().await;
                debug!("Cache sweep removed {} expired entries", removed);
                metrics::record_background_job("cache_sweep", "success");
            }
        }
    }
}
