/// Business identifier normalization
use crate::error::{ResolverError, ResolverResult};
use std::fmt;

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 16;

/// A normalized business identifier
///
/// Always 3 to 16 characters of `[A-Z0-9]` with an alphabetic two-letter
/// namespace (country) prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Normalize raw user input: upper-case it, drop everything outside
    /// `[A-Z0-9]`, then check the shape.
    pub fn normalize(raw: &str) -> ResolverResult<Self> {
        let normalized: String = raw
            .to_uppercase()
            .chars()
            .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            .collect();

        if normalized.len() < MIN_LEN || normalized.len() > MAX_LEN {
            return Err(ResolverError::InvalidId(raw.to_string()));
        }

        if !normalized.chars().take(2).all(|c| c.is_ascii_uppercase()) {
            return Err(ResolverError::InvalidId(raw.to_string()));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
