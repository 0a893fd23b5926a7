/// Cache TTL policy
use chrono::{DateTime, Duration, Utc};

/// Largest accepted `RESOLVER_TTL_MAX`: one year
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Operator bounds applied to provider-declared TTLs, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub min: u64,
    pub max: u64,
    pub default: u64,
}

impl TtlPolicy {
    pub fn new(min: u64, max: u64, default: u64) -> Self {
        Self { min, max, default }
    }

    /// Effective TTL in seconds
    ///
    /// Anything that is not a positive integer gets the default; everything
    /// else is clamped into `[min, max]`.
    pub fn clamp(&self, declared: Option<i64>) -> u64 {
        match declared {
            Some(ttl) if ttl > 0 => (ttl as u64).min(self.max).max(self.min),
            _ => self.default,
        }
    }

    /// Absolute expiry for a record declaring `declared`
    pub fn resolve_expiry(&self, declared: Option<i64>) -> DateTime<Utc> {
        self.expiry_from(Utc::now(), declared)
    }

    /// Saturates at the latest representable instant instead of overflowing
    pub fn expiry_from(&self, now: DateTime<Utc>, declared: Option<i64>) -> DateTime<Utc> {
        i64::try_from(self.clamp(declared))
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
