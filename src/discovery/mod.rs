/// Discovery record model
///
/// Providers answer with loosely-shaped JSON documents. Only the fields the
/// resolution engine acts on are typed; everything else a provider sends is
/// kept in `extra` and re-emitted untouched.

pub mod identifier;
pub mod keys;
pub mod ttl;

pub use identifier::Identifier;
pub use keys::CandidateKeys;
pub use ttl::{TtlPolicy, MAX_TTL_SECS};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// TTL advertised on every lookup response, independent of per-record cache TTLs
pub const PRESENTATION_TTL: u64 = 3600;

/// Error codes carried by synthetic records
pub mod codes {
    pub const UPSTREAM_DOWN: &str = "upstream_down";
    pub const OFFICIAL_NOT_AVAILABLE: &str = "official_not_available";
}

/// The `type` discriminator of a discovery record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Official,
    Voluntary,
    Redirect,
    /// Missing or unrecognised `type`
    Unsupported,
}

impl RecordKind {
    pub fn from_type(value: Option<&str>) -> Self {
        match value {
            Some("official") => RecordKind::Official,
            Some("voluntary") => RecordKind::Voluntary,
            Some("redirect") => RecordKind::Redirect,
            _ => RecordKind::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Official => "official",
            RecordKind::Voluntary => "voluntary",
            RecordKind::Redirect => "redirect",
            RecordKind::Unsupported => "unsupported",
        }
    }
}

/// A discovery document, either fetched from a provider or synthesized by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryRecord {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Value>,

    /// Delegation targets of a `redirect` record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<Value>,

    /// Providers of the voluntary track, advertised by an `official` record
    #[serde(
        rename = "voluntaryProviders",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub voluntary_providers: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detailed: Option<String>,

    /// Provider-specific payload (name, address, contact points, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DiscoveryRecord {
    /// Build an engine-produced error record for the given track type
    pub fn synthetic_error(kind: RecordKind, code: &str, detail: Option<String>) -> Self {
        Self {
            record_type: Some(kind.as_str().to_string()),
            id: None,
            ttl: None,
            providers: None,
            voluntary_providers: None,
            error: Some(Value::String(code.to_string())),
            error_detailed: detail,
            extra: Map::new(),
        }
    }

    pub fn kind(&self) -> RecordKind {
        RecordKind::from_type(self.record_type.as_deref())
    }

    /// Whether the document carries a non-empty `error` field
    pub fn has_error(&self) -> bool {
        self.error.as_ref().map(is_truthy).unwrap_or(false)
    }

    /// The error code, when `error` is a string
    pub fn error_code(&self) -> Option<&str> {
        match &self.error {
            Some(Value::String(code)) if !code.is_empty() => Some(code),
            _ => None,
        }
    }

    /// Redirect targets; non-string entries are ignored
    pub fn provider_list(&self) -> Vec<String> {
        string_list(self.providers.as_ref())
    }

    pub fn voluntary_provider_list(&self) -> Vec<String> {
        string_list(self.voluntary_providers.as_ref())
    }

    /// The TTL the provider declared, read the way a lenient integer cast would
    ///
    /// Numbers are truncated, numeric strings use their leading integer part,
    /// anything else counts as not declared.
    pub fn declared_ttl(&self) -> Option<i64> {
        match self.ttl.as_ref()? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => leading_integer(s),
            Value::Bool(true) => Some(1),
            _ => None,
        }
    }
}

/// Composite answer of one lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub id: String,
    pub ttl: u64,
    pub official: DiscoveryRecord,
    pub voluntary: DiscoveryRecord,
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }

    // Digits only, so a parse failure is an overflow; saturate like numbers do
    let literal = &s[..s.len() - rest.len() + end];
    Some(match literal.parse::<i64>() {
        Ok(n) => n,
        Err(_) if negative => i64::MIN,
        Err(_) => i64::MAX,
    })
}
