//! Post identity and the all-posts index.
//!
//! Posts are addressed by a date-encoded filename key (`YYYYMMDDHHMM`). The
//! key doubles as the natural sort order: comparing two keys as strings
//! orders them chronologically, so "newest first" is plain descending order.

use std::fmt;

use time::OffsetDateTime;

use crate::domain::error::DomainError;

/// Number of digits in a well-formed post key.
pub const POST_KEY_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostKey(String);

impl PostKey {
    /// Parse a key supplied by a client. Only `YYYYMMDDHHMM` digit strings are accepted.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.len() == POST_KEY_LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(DomainError::invalid_post_key(raw))
        }
    }

    /// Wrap a key read back from storage without re-validating it.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn year(&self) -> Option<&str> {
        self.0.get(0..4)
    }

    pub fn month(&self) -> Option<&str> {
        self.0.get(4..6)
    }

    /// Everything after the year and month digits (`DDHHMM` for well-formed keys).
    pub fn fragment(&self) -> &str {
        self.0.get(6..).unwrap_or("")
    }
}

impl fmt::Display for PostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Short-form description of a post as held by the all-posts index.
#[derive(Debug, Clone, PartialEq)]
pub struct PostSummary {
    pub key: PostKey,
    pub title: String,
    pub description: String,
    pub image_alt: String,
    pub published: OffsetDateTime,
    pub modified: OffsetDateTime,
}

/// Every post, ordered by key descending.
#[derive(Debug, Clone, Default)]
pub struct PostIndex {
    entries: Vec<PostSummary>,
}

impl PostIndex {
    pub fn new(mut entries: Vec<PostSummary>) -> Self {
        entries.sort_by(|a, b| b.key.cmp(&a.key));
        entries.dedup_by(|later, earlier| later.key == earlier.key);
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&PostSummary> {
        self.entries
            .binary_search_by(|probe| key.cmp(probe.key.as_str()))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn newest(&self) -> Option<&PostSummary> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PostSummary> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
