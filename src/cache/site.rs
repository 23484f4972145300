//! Process-wide cached views shared by every page.

use std::io;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use crate::application::popularity::{RequestLogSource, rank_popular};
use crate::application::repos::{PostsRepo, RepoError, TagsRepo, UsersRepo};
use crate::domain::posts::PostIndex;

use super::clock::Clock;
use super::config::CacheConfig;
use super::read_through::ReadThrough;

const SOURCE: &str = "inkwell::cache::site";

/// The sidebar, tag, count and popularity views, each refreshed on its own schedule.
///
/// Views are independent: refreshing one never touches another, and there is no
/// cross-view consistency. User names are loaded lazily and kept for the process lifetime.
pub struct SiteCache {
    posts: Arc<dyn PostsRepo>,
    tags: Arc<dyn TagsRepo>,
    users: Arc<dyn UsersRepo>,
    request_log: Arc<dyn RequestLogSource>,
    config: CacheConfig,
    all_posts: ReadThrough<Arc<PostIndex>>,
    top_tags: ReadThrough<Arc<Vec<String>>>,
    post_count: ReadThrough<u64>,
    popular: ReadThrough<Arc<Vec<String>>>,
    user_names: DashMap<i64, String>,
}

impl SiteCache {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        tags: Arc<dyn TagsRepo>,
        users: Arc<dyn UsersRepo>,
        request_log: Arc<dyn RequestLogSource>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ttl = config.ttl;
        Self {
            posts,
            tags,
            users,
            request_log,
            all_posts: ReadThrough::new("all_posts", ttl, clock.clone()),
            top_tags: ReadThrough::new("top_tags", ttl, clock.clone()),
            post_count: ReadThrough::new("post_count", ttl, clock.clone()),
            popular: ReadThrough::new("popular_posts", ttl, clock),
            user_names: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Every post keyed by filename, newest first.
    pub async fn all_posts(&self) -> Result<Arc<PostIndex>, RepoError> {
        self.all_posts
            .get_or_refresh(|| async {
                let entries = self.posts.list_index().await?;
                Ok(Arc::new(PostIndex::new(entries)))
            })
            .await
    }

    pub async fn top_tags(&self) -> Result<Arc<Vec<String>>, RepoError> {
        let limit = self.config.top_tags_limit;
        self.top_tags
            .get_or_refresh(|| async move { self.tags.top_tags(limit).await.map(Arc::new) })
            .await
    }

    pub async fn post_count(&self) -> Result<u64, RepoError> {
        self.post_count
            .get_or_refresh(|| self.posts.count_posts())
            .await
    }

    /// Display name for a user, loaded once and then served from memory.
    pub async fn user_name(&self, user_id: i64) -> Result<Option<String>, RepoError> {
        if let Some(name) = self.user_names.get(&user_id) {
            return Ok(Some(name.value().clone()));
        }

        let name = self.users.find_name(user_id).await?;
        if let Some(name) = name.as_ref() {
            self.user_names.insert(user_id, name.clone());
        }
        Ok(name)
    }

    /// Most requested post keys according to the request log.
    ///
    /// A missing log is not an error: it yields an empty ranking until the next refresh.
    pub async fn popular(&self) -> Result<Arc<Vec<String>>, io::Error> {
        let limit = self.config.popular_limit;
        self.popular
            .get_or_refresh(|| async move {
                match self.request_log.read_log().await {
                    Ok(log) => Ok(Arc::new(rank_popular(&log, limit))),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {
                        warn!(
                            target = SOURCE,
                            error = %err,
                            "request log missing; create it (even empty) to avoid repeated lookups"
                        );
                        Ok(Arc::new(Vec::new()))
                    }
                    Err(err) => Err(err),
                }
            })
            .await
    }
}
