/// Unified error types for the OpenDiscovery resolver
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the resolver service
///
/// Provider-side failures never show up here: the resolution engine turns them
/// into synthetic discovery records. These variants cover the service itself.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// The lookup request carried no identifier
    #[error("Missing identifier")]
    MissingId,

    /// The identifier failed normalization
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cache backend errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure talking to a single provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection refused, timeout, or a non-2xx/4xx status
    #[error("{0}")]
    Transport(String),

    /// The provider answered, but with a malformed or inconsistent document
    #[error("{0}")]
    Protocol(String),
}

/// JSON error body returned to lookup clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl IntoResponse for ResolverError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ResolverError::MissingId => (StatusCode::BAD_REQUEST, "missing_id", None),
            ResolverError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id", None),
            ResolverError::Config(_) | ResolverError::Cache(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                Some(self.to_string()),
            ),
            ResolverError::Internal(_) | ResolverError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                None, // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for resolver operations
pub type ResolverResult<T> = Result<T, ResolverError>;
