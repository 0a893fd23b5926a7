/// Provider fetcher
///
/// One GET per provider per hop:
/// `<base>/.well-known/opendiscovery/<urlencoded id>.json`
use crate::{
    discovery::{DiscoveryRecord, Identifier},
    error::{FetchError, ResolverError, ResolverResult},
};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Product string sent to every provider
pub const DEFAULT_USER_AGENT: &str = "OpenDiscoveryResolver (+https://www.opendiscovery.biz/)";

/// Fetches a single discovery document from a single provider
#[async_trait]
pub trait ProviderFetcher: Send + Sync {
    async fn fetch(&self, provider: &str, id: &Identifier) -> Result<DiscoveryRecord, FetchError>;
}

/// Fetcher configuration
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// User-Agent header for provider requests
    pub user_agent: String,
    /// Connect timeout, and also the overall request timeout
    pub timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// reqwest-backed fetcher
#[derive(Clone)]
pub struct HttpFetcher {
    http_client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> ResolverResult<Self> {
        // Redirect records are the protocol's delegation mechanism; HTTP 3xx is not followed
        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| ResolverError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }
}

/// Document URL for `id` at `provider`
pub fn document_url(provider: &str, id: &Identifier) -> String {
    format!(
        "{}/.well-known/opendiscovery/{}.json",
        provider.trim_end_matches('/'),
        urlencoding::encode(id.as_str())
    )
}

/// Statuses whose body is still a discovery document
fn is_parseable_status(status: StatusCode) -> bool {
    status.is_success() || status.is_client_error()
}

/// Parse a provider body and check it answers for `id`
///
/// A document carrying `error` is a valid answer and skips the id checks.
pub fn parse_document(id: &Identifier, body: &str) -> Result<DiscoveryRecord, FetchError> {
    let record: DiscoveryRecord = serde_json::from_str(body)
        .map_err(|e| FetchError::Protocol(format!("invalid document: {}", e)))?;

    if record.has_error() {
        return Ok(record);
    }

    let returned = match record.id.as_deref() {
        Some(returned) if !returned.is_empty() => returned.to_uppercase(),
        _ => return Err(FetchError::Protocol("missing id".to_string())),
    };

    if !id.as_str().starts_with(&returned) {
        return Err(FetchError::Protocol("unknown id returned".to_string()));
    }

    Ok(record)
}

#[async_trait]
impl ProviderFetcher for HttpFetcher {
    async fn fetch(&self, provider: &str, id: &Identifier) -> Result<DiscoveryRecord, FetchError> {
        let url = document_url(provider, id);
        debug!(%url, "Fetching discovery document");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("request to {} failed: {}", provider, e)))?;

        let status = response.status();
        if !is_parseable_status(status) {
            return Err(FetchError::Transport(format!(
                "{} returned status {}",
                provider, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(format!("reading body from {} failed: {}", provider, e)))?;

        parse_document(id, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> Identifier {
        Identifier::normalize(raw).unwrap()
    }

    #[test]
    fn test_document_url() {
        assert_eq!(
            document_url("https://root.example/", &id("DK12345678")),
            "https://root.example/.well-known/opendiscovery/DK12345678.json"
        );
        assert_eq!(
            document_url("https://root.example/base", &id("no999")),
            "https://root.example/base/.well-known/opendiscovery/NO999.json"
        );
    }

    #[test]
    fn test_parseable_statuses() {
        assert!(is_parseable_status(StatusCode::OK));
        assert!(is_parseable_status(StatusCode::NOT_FOUND));
        assert!(is_parseable_status(StatusCode::GONE));
        assert!(!is_parseable_status(StatusCode::MOVED_PERMANENTLY));
        assert!(!is_parseable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_parseable_status(StatusCode::BAD_GATEWAY));
    }

    #[test]
    fn test_prefix_answer_is_accepted() {
        // A country-level provider answering for a company-level identifier
        let record = parse_document(
            &id("DK12345678"),
            r#"{"type":"redirect","id":"dk12","providers":["https://dk.example"]}"#,
        )
        .unwrap();
        assert_eq!(record.id.as_deref(), Some("dk12"));
    }

    #[test]
    fn test_error_document_is_returned_as_is() {
        let record = parse_document(&id("DK1234"), r#"{"type":"official","error":"not_found"}"#)
            .unwrap();
        assert_eq!(record.error_code(), Some("not_found"));
    }

    #[test]
    fn test_missing_id_is_protocol_error() {
        let err = parse_document(&id("DK1234"), r#"{"type":"official"}"#).unwrap_err();
        assert_eq!(err, FetchError::Protocol("missing id".to_string()));

        let err = parse_document(&id("DK1234"), r#"{"type":"official","id":""}"#).unwrap_err();
        assert_eq!(err, FetchError::Protocol("missing id".to_string()));
    }

    #[test]
    fn test_foreign_id_is_protocol_error() {
        let err = parse_document(&id("DK1234"), r#"{"type":"official","id":"NO1234"}"#)
            .unwrap_err();
        assert_eq!(err, FetchError::Protocol("unknown id returned".to_string()));

        // Longer than the query is not a prefix either
        let err = parse_document(&id("DK1234"), r#"{"type":"official","id":"DK12345"}"#)
            .unwrap_err();
        assert_eq!(err, FetchError::Protocol("unknown id returned".to_string()));
    }

    #[test]
    fn test_garbage_body_is_protocol_error() {
        let err = parse_document(&id("DK1234"), "<html>oops</html>").unwrap_err();
        assert!(matches!(err, FetchError::Protocol(msg) if msg.starts_with("invalid document")));
    }
}
