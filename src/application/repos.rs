//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::error::ServiceFailure;
use crate::domain::entities::{ListingRecord, PostRecord};
use crate::domain::posts::{PostKey, PostSummary};

#[derive(Debug, Error)]
pub enum RepoError {
    /// The store could not be reached, or the connection dropped twice in a row.
    #[error("database unavailable: {message}")]
    Unavailable { message: String },
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: err.to_string(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl ServiceFailure for RepoError {
    fn is_unavailable(&self) -> bool {
        RepoError::is_unavailable(self)
    }
}

/// Case-insensitive tag substring filter, already escaped for `LIKE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    raw: String,
    pattern: String,
}

impl TagFilter {
    /// Returns `None` for an empty filter, which means "all posts".
    pub fn new(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }

        let lowered = raw.to_lowercase();
        let mut pattern = String::with_capacity(lowered.len() + 2);
        pattern.push('%');
        for ch in lowered.chars() {
            if matches!(ch, '\\' | '%' | '_') {
                pattern.push('\\');
            }
            pattern.push(ch);
        }
        pattern.push('%');

        Some(Self {
            raw: raw.to_string(),
            pattern,
        })
    }

    /// The filter exactly as the visitor typed it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// `LIKE` pattern matching the lower-cased filter anywhere in a tag name.
    pub fn like_pattern(&self) -> &str {
        &self.pattern
    }

    /// In-memory equivalent of the `LIKE` pattern.
    pub fn matches(&self, tag: &str) -> bool {
        tag.to_lowercase().contains(&self.raw.to_lowercase())
    }
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Every post, newest key first.
    async fn list_index(&self) -> Result<Vec<PostSummary>, RepoError>;

    async fn count_posts(&self) -> Result<u64, RepoError>;

    /// Number of distinct posts carrying at least one tag matched by `filter`.
    async fn count_tagged(&self, filter: &TagFilter) -> Result<u64, RepoError>;

    async fn list_page(
        &self,
        filter: Option<&TagFilter>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<ListingRecord>, RepoError>;

    async fn find_by_key(&self, key: &PostKey) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    /// Tag names ordered by how many distinct posts use them.
    async fn top_tags(&self, limit: u64) -> Result<Vec<String>, RepoError>;

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<String>, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_name(&self, user_id: i64) -> Result<Option<String>, RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_means_all_posts() {
        assert!(TagFilter::new("").is_none());
    }

    #[test]
    fn like_pattern_is_lowercased_and_escaped() {
        let filter = TagFilter::new("Rust_100%").expect("filter");
        assert_eq!(filter.raw(), "Rust_100%");
        assert_eq!(filter.like_pattern(), "%rust\\_100\\%%");
    }

    #[test]
    fn matches_is_case_insensitive_substring() {
        let filter = TagFilter::new("PROG").expect("filter");
        assert!(filter.matches("programming"));
        assert!(filter.matches("Deprogrammed"));
        assert!(!filter.matches("rust"));
    }
}
