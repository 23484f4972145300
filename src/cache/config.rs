//! Cache configuration.

use std::time::Duration;

const DEFAULT_TTL_SECS: u64 = 2 * 60 * 60;
const DEFAULT_TOP_TAGS_LIMIT: u64 = 15;
const DEFAULT_POPULAR_LIMIT: usize = 3;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Staleness window shared by every cached view.
    pub ttl: Duration,
    /// Number of tags kept by the top-tags view.
    pub top_tags_limit: u64,
    /// Number of keys kept by the popular-posts view.
    pub popular_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            top_tags_limit: DEFAULT_TOP_TAGS_LIMIT,
            popular_limit: DEFAULT_POPULAR_LIMIT,
        }
    }
}

impl From<&crate::config::Settings> for CacheConfig {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            ttl: settings.cache.ttl,
            top_tags_limit: u64::from(settings.cache.top_tags_limit.get()),
            popular_limit: settings.popularity.limit.get() as usize,
        }
    }
}
