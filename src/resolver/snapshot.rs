/// Request-scoped view of the cache
///
/// Taken once per lookup with a single batched read. Redirects seeded during
/// the lookup are added to it, so a key is written at most once per lookup and
/// the first (most specific) redirect for a prefix wins.
use crate::discovery::{CandidateKeys, DiscoveryRecord};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct CacheSnapshot {
    entries: HashMap<String, DiscoveryRecord>,
}

impl CacheSnapshot {
    pub fn new(entries: HashMap<String, DiscoveryRecord>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&DiscoveryRecord> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Record `record` under `key` unless the key is already known.
    /// Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, key: &str, record: &DiscoveryRecord) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(key.to_string(), record.clone());
        true
    }

    /// Providers of the cached redirect with the longest matching prefix
    ///
    /// Entries without a usable provider list are skipped.
    pub fn longest_redirect<'a>(&self, keys: &'a CandidateKeys) -> Option<(&'a str, Vec<String>)> {
        keys.redirects.iter().find_map(|key| {
            let providers = self.entries.get(key)?.provider_list();
            if providers.is_empty() {
                None
            } else {
                Some((key.as_str(), providers))
            }
        })
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
