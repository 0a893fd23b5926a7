/// Chain resolver: follows provider redirects until a terminal record
use super::{fetcher::ProviderFetcher, snapshot::CacheSnapshot};
use crate::{
    cache::CacheStore,
    discovery::{codes, keys, DiscoveryRecord, Identifier, RecordKind, TtlPolicy},
    metrics,
};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Redirect hops before a chain is abandoned
pub const MAX_HOPS: usize = 5;

/// Providers tried per hop, in order
pub const PROVIDERS_PER_HOP: usize = 2;

/// Resolution track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Track {
    Official,
    Voluntary,
}

impl Track {
    /// Record type that ends a chain on this track
    pub fn terminal_kind(&self) -> RecordKind {
        match self {
            Track::Official => RecordKind::Official,
            Track::Voluntary => RecordKind::Voluntary,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.terminal_kind().as_str()
    }

    /// Only official redirects are shared through `<prefix>_redirect` entries
    fn seeds_redirects(&self) -> bool {
        matches!(self, Track::Official)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a chain stopped before reaching a terminal record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainAbort {
    #[error("{track} providers down: {detail}")]
    ProvidersDown { track: Track, detail: String },

    #[error("Got unsupported type from {0} providers")]
    UnsupportedType(Track),

    #[error("No providers in redirect from {0} provider")]
    NoProviders(Track),

    #[error("Too many redirects from {0} providers")]
    TooManyRedirects(Track),
}

/// Result of running one chain
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    /// A record of the track's terminal type, as the provider sent it
    Resolved(DiscoveryRecord),
    /// A synthetic `upstream_down` record
    Failed(DiscoveryRecord),
}

impl ChainOutcome {
    pub fn record(&self) -> &DiscoveryRecord {
        match self {
            ChainOutcome::Resolved(record) | ChainOutcome::Failed(record) => record,
        }
    }

    pub fn into_record(self) -> DiscoveryRecord {
        match self {
            ChainOutcome::Resolved(record) | ChainOutcome::Failed(record) => record,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ChainOutcome::Resolved(_))
    }
}

/// Walks provider lists, seeding redirect entries on the way
pub struct ChainResolver {
    fetcher: Arc<dyn ProviderFetcher>,
    cache: Arc<dyn CacheStore>,
    ttl: TtlPolicy,
}

impl ChainResolver {
    pub fn new(fetcher: Arc<dyn ProviderFetcher>, cache: Arc<dyn CacheStore>, ttl: TtlPolicy) -> Self {
        Self { fetcher, cache, ttl }
    }

    /// Resolve `id` on `track` starting from `providers`
    ///
    /// Never fails: an aborted chain yields a synthetic error record of the
    /// track's type.
    pub async fn resolve(
        &self,
        track: Track,
        providers: Vec<String>,
        id: &Identifier,
        snapshot: &mut CacheSnapshot,
    ) -> ChainOutcome {
        match self.follow(track, providers, id, snapshot).await {
            Ok(record) => ChainOutcome::Resolved(record),
            Err(abort) => {
                warn!(%id, %track, "Resolution chain aborted: {}", abort);
                metrics::record_chain_failure(track.as_str());
                ChainOutcome::Failed(DiscoveryRecord::synthetic_error(
                    track.terminal_kind(),
                    codes::UPSTREAM_DOWN,
                    Some(abort.to_string()),
                ))
            }
        }
    }

    async fn follow(
        &self,
        track: Track,
        mut providers: Vec<String>,
        id: &Identifier,
        snapshot: &mut CacheSnapshot,
    ) -> Result<DiscoveryRecord, ChainAbort> {
        for hop in 0..MAX_HOPS {
            let record = self.fetch_first_available(track, &providers, id).await?;

            let kind = record.kind();
            if kind == track.terminal_kind() {
                debug!(%id, %track, hop, "Reached terminal record");
                return Ok(record);
            }
            if kind != RecordKind::Redirect {
                return Err(ChainAbort::UnsupportedType(track));
            }

            let next = record.provider_list();
            if next.is_empty() {
                return Err(ChainAbort::NoProviders(track));
            }

            if track.seeds_redirects() {
                self.seed_redirect(id, &record, snapshot).await;
            }

            debug!(%id, %track, hop, next = ?next, "Following redirect");
            providers = next;
        }

        Err(ChainAbort::TooManyRedirects(track))
    }

    /// Try the first provider, then the second; the first answer wins
    async fn fetch_first_available(
        &self,
        track: Track,
        providers: &[String],
        id: &Identifier,
    ) -> Result<DiscoveryRecord, ChainAbort> {
        let mut last_error = None;

        for provider in providers.iter().take(PROVIDERS_PER_HOP) {
            match self.fetcher.fetch(provider, id).await {
                Ok(record) => {
                    metrics::record_provider_fetch(track.as_str(), true);
                    return Ok(record);
                }
                Err(e) => {
                    warn!(%id, %track, provider = %provider, "Provider fetch failed: {}", e);
                    metrics::record_provider_fetch(track.as_str(), false);
                    last_error = Some(e);
                }
            }
        }

        Err(ChainAbort::ProvidersDown {
            track,
            detail: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no providers configured".to_string()),
        })
    }

    /// Cache a redirect under its advertised prefix, unless this lookup already
    /// knows an entry for that prefix
    async fn seed_redirect(
        &self,
        id: &Identifier,
        record: &DiscoveryRecord,
        snapshot: &mut CacheSnapshot,
    ) {
        let prefix = match record.id.as_deref() {
            Some(prefix) if !prefix.is_empty() => prefix.to_uppercase(),
            _ => return,
        };

        if !keys::is_redirect_prefix_of(&prefix, id.as_str()) {
            debug!(%id, prefix = %prefix, "Redirect id is not a strict prefix, not seeding");
            return;
        }

        let key = keys::redirect_key(&prefix);
        if !snapshot.insert_if_absent(&key, record) {
            debug!(%id, key = %key, "Redirect already known for this prefix");
            return;
        }

        let expires_at = self.ttl.resolve_expiry(record.declared_ttl());
        match self.cache.put(&key, record, expires_at).await {
            Ok(()) => {
                debug!(%id, key = %key, %expires_at, "Seeded redirect");
                metrics::record_redirect_seeded();
            }
            Err(e) => warn!(%id, key = %key, "Failed to seed redirect: {}", e),
        }
    }
}
