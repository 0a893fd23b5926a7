/// Cache key derivation
///
/// Terminal results live under `<ID>_official` / `<ID>_voluntary`, delegations
/// under `<PREFIX>_redirect` where the prefix is a strict prefix of at least
/// two characters.
use super::Identifier;

const SHORTEST_REDIRECT_PREFIX: usize = 2;

pub fn official_key(id: &str) -> String {
    format!("{}_official", id)
}

pub fn voluntary_key(id: &str) -> String {
    format!("{}_voluntary", id)
}

pub fn redirect_key(prefix: &str) -> String {
    format!("{}_redirect", prefix)
}

/// Strict prefixes of `id` eligible for redirect entries, longest first
pub fn redirect_prefixes(id: &str) -> impl Iterator<Item = &str> {
    (SHORTEST_REDIRECT_PREFIX..id.len()).rev().map(move |len| &id[..len])
}

/// Whether `prefix` may key a redirect entry discovered while resolving `id`
pub fn is_redirect_prefix_of(prefix: &str, id: &str) -> bool {
    prefix.len() >= SHORTEST_REDIRECT_PREFIX && prefix.len() < id.len() && id.starts_with(prefix)
}

/// Every key one lookup may read, derived once per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateKeys {
    pub official: String,
    pub voluntary: String,
    /// Redirect keys, longest prefix first
    pub redirects: Vec<String>,
}

impl CandidateKeys {
    pub fn for_identifier(id: &Identifier) -> Self {
        Self {
            official: official_key(id.as_str()),
            voluntary: voluntary_key(id.as_str()),
            redirects: redirect_prefixes(id.as_str()).map(redirect_key).collect(),
        }
    }

    /// All keys in batch-read order
    pub fn all(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.redirects.len() + 2);
        keys.push(self.official.clone());
        keys.push(self.voluntary.clone());
        keys.extend(self.redirects.iter().cloned());
        keys
    }
}
