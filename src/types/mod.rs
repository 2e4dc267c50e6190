//! Core identifier types shared across the registry and CLI.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum zero-padded width of a category id ("001", "002", ...).
const MIN_ID_WIDTH: usize = 3;

/// Maximum character length of a derived category key.
const MAX_KEY_CHARS: usize = 48;

/// Key used when a title normalizes to nothing (e.g. all punctuation).
const FALLBACK_KEY: &str = "uncategorized";

/// A stable category identifier: a zero-padded numeric string.
///
/// Ids are allocated sequentially starting at `"001"` and never reassigned.
/// The padded width is preserved when advancing; past `"999"` the width
/// grows naturally (`"1000"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    /// The first id handed out by a fresh registry.
    pub fn first() -> Self {
        Self::from_number(1)
    }

    /// Build an id from a raw number, zero-padded to the minimum width.
    pub fn from_number(n: u64) -> Self {
        Self(format!("{n:0width$}", width = MIN_ID_WIDTH))
    }

    /// Parse an id from its string form. Returns `None` unless the input
    /// is a non-empty run of ASCII digits.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self(s.to_string()))
    }

    /// Whether this id is a non-empty run of ASCII digits.
    ///
    /// Deserialized registries can carry arbitrary strings; validation
    /// uses this to fail closed on malformed ids.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }

    /// Numeric value of the id. Malformed ids count as zero.
    pub fn number(&self) -> u64 {
        self.0.parse().unwrap_or(0)
    }

    /// The next id in sequence, preserving at least the current width.
    pub fn succ(&self) -> Self {
        let width = self.0.len().max(MIN_ID_WIDTH);
        Self(format!("{:0width$}", self.number() + 1))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialOrd for CategoryId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CategoryId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.number()
            .cmp(&other.number())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized map key derived from a request title.
///
/// Derivation: lowercase, drop punctuation (alphanumerics of any script are
/// kept), collapse whitespace runs to a single hyphen, truncate to a bounded
/// length. Two titles that normalize identically share one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryKey(String);

impl CategoryKey {
    /// Derive a key from a free-form title.
    pub fn derive(title: &str) -> Self {
        let mut key = String::new();
        let mut pending_sep = false;

        for c in title.to_lowercase().chars() {
            if c.is_whitespace() {
                pending_sep = !key.is_empty();
            } else if c.is_alphanumeric() {
                if pending_sep {
                    key.push('-');
                    pending_sep = false;
                }
                key.push(c);
            }
            // Punctuation and symbols are dropped without acting as
            // separators, so "time-management" and "time management"
            // both normalize to "time-management".
        }

        let key: String = key.chars().take(MAX_KEY_CHARS).collect();
        let key = key.trim_end_matches('-').to_string();

        if key.is_empty() {
            Self(FALLBACK_KEY.to_string())
        } else {
            Self(key)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An incoming free-form work request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkRequest {
    pub title: String,
    pub description: String,
}

impl WorkRequest {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Title and description joined the way the matcher sees them.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}
