/// OpenDiscovery Resolver
///
/// Resolves business identifiers into discovery records by chasing a federation
/// of HTTP providers, caching official, voluntary and redirect records.

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod discovery;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod resolver;
pub mod server;

pub use context::AppContext;
pub use discovery::{DiscoveryRecord, Identifier, ResolutionResult};
pub use error::{ResolverError, ResolverResult};
pub use resolver::DiscoveryResolver;
