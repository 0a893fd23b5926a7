/// Lookup endpoint
///
/// `GET /lookup?id=<identifier>&pretty=1` resolves one identifier. Provider
/// trouble never turns into an HTTP error here; only a missing or malformed
/// identifier does.
use crate::{
    context::AppContext,
    discovery::Identifier,
    error::{ResolverError, ResolverResult},
};
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

/// Build lookup routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/", get(frontpage))
        .route("/lookup", get(lookup))
}

#[derive(Debug, Deserialize)]
pub struct LookupParams {
    /// Raw identifier, normalized before resolution
    pub id: Option<String>,
    /// Any non-empty value other than "0" pretty-prints the response
    pub pretty: Option<String>,
}

pub async fn lookup(
    State(ctx): State<AppContext>,
    Query(params): Query<LookupParams>,
) -> ResolverResult<Response> {
    let raw = params
        .id
        .as_deref()
        .filter(|raw| is_present(raw))
        .ok_or(ResolverError::MissingId)?;

    let id = Identifier::normalize(raw)?;
    let result = ctx.resolver.resolve_identifier(&id).await;

    render_json(&result, params.pretty.as_deref().map(is_present).unwrap_or(false))
}

/// Send visitors of the bare host to the project homepage
pub async fn frontpage(State(ctx): State<AppContext>) -> Redirect {
    Redirect::temporary(&ctx.config.service.homepage_url)
}

fn is_present(value: &str) -> bool {
    !value.is_empty() && value != "0"
}

fn render_json<T: Serialize>(value: &T, pretty: bool) -> ResolverResult<Response> {
    let body = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| ResolverError::Internal(format!("Failed to encode lookup result: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}
