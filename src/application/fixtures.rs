//! In-memory repositories for unit tests.

use std::{
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use time::{Duration, macros::datetime};

use crate::application::popularity::RequestLogSource;
use crate::application::repos::{PostsRepo, RepoError, TagFilter, TagsRepo, UsersRepo};
use crate::domain::entities::{ListingRecord, PostRecord};
use crate::domain::posts::{PostKey, PostSummary};

#[derive(Clone)]
pub(crate) struct StoredPost {
    pub record: PostRecord,
    pub tags: Vec<String>,
}

pub(crate) fn stored_post(id: i64, key: &str, title: &str, tags: &[&str]) -> StoredPost {
    let published = datetime!(2020-01-01 00:00 UTC) + Duration::days(id);
    StoredPost {
        record: PostRecord {
            id,
            user_id: 1,
            key: PostKey::from_stored(key),
            title: title.to_string(),
            description: format!("About {title}"),
            preview: format!("Preview of {title}"),
            content_markdown: format!("# {title}\n\nBody of {title}.\n"),
            image_alt: format!("Image for {title}"),
            published,
            modified: published,
        },
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    pub posts: Mutex<Vec<StoredPost>>,
    pub users: Mutex<Vec<(i64, String)>>,
    pub unavailable: AtomicBool,
    pub index_queries: AtomicUsize,
    pub count_queries: AtomicUsize,
    pub tag_queries: AtomicUsize,
    pub user_queries: AtomicUsize,
}

impl MemoryStore {
    pub fn with_posts(posts: Vec<StoredPost>) -> Arc<Self> {
        let store = Self::default();
        *store.posts.lock().expect("posts lock") = posts;
        store
            .users
            .lock()
            .expect("users lock")
            .push((1, "Matthew Rease".to_string()));
        Arc::new(store)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(RepoError::unavailable("connection refused"))
        } else {
            Ok(())
        }
    }

    fn sorted(&self) -> Vec<StoredPost> {
        let mut posts = self.posts.lock().expect("posts lock").clone();
        posts.sort_by(|a, b| b.record.key.cmp(&a.record.key));
        posts
    }

    fn author(&self, user_id: i64) -> String {
        self.users
            .lock()
            .expect("users lock")
            .iter()
            .find(|(id, _)| *id == user_id)
            .map(|(_, name)| name.clone())
            .unwrap_or_default()
    }
}

fn tagged(post: &StoredPost, filter: &TagFilter) -> bool {
    post.tags.iter().any(|tag| filter.matches(tag))
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn list_index(&self) -> Result<Vec<PostSummary>, RepoError> {
        self.check()?;
        self.index_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .sorted()
            .into_iter()
            .map(|post| PostSummary {
                key: post.record.key,
                title: post.record.title,
                description: post.record.description,
                image_alt: post.record.image_alt,
                published: post.record.published,
                modified: post.record.modified,
            })
            .collect())
    }

    async fn count_posts(&self) -> Result<u64, RepoError> {
        self.check()?;
        self.count_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.posts.lock().expect("posts lock").len() as u64)
    }

    async fn count_tagged(&self, filter: &TagFilter) -> Result<u64, RepoError> {
        self.check()?;
        Ok(self
            .sorted()
            .iter()
            .filter(|post| tagged(post, filter))
            .count() as u64)
    }

    async fn list_page(
        &self,
        filter: Option<&TagFilter>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<ListingRecord>, RepoError> {
        self.check()?;
        Ok(self
            .sorted()
            .into_iter()
            .filter(|post| filter.is_none_or(|filter| tagged(post, filter)))
            .skip(offset as usize)
            .take(limit as usize)
            .map(|post| ListingRecord {
                author: self.author(post.record.user_id),
                key: post.record.key,
                title: post.record.title,
                description: post.record.description,
                preview: post.record.preview,
                image_alt: post.record.image_alt,
                published: post.record.published,
                modified: post.record.modified,
            })
            .collect())
    }

    async fn find_by_key(&self, key: &PostKey) -> Result<Option<PostRecord>, RepoError> {
        self.check()?;
        Ok(self
            .sorted()
            .into_iter()
            .find(|post| &post.record.key == key)
            .map(|post| post.record))
    }
}

#[async_trait]
impl TagsRepo for MemoryStore {
    async fn top_tags(&self, limit: u64) -> Result<Vec<String>, RepoError> {
        self.check()?;
        self.tag_queries.fetch_add(1, Ordering::SeqCst);
        let mut counts: Vec<(String, usize)> = Vec::new();
        for post in self.sorted() {
            for tag in post.tags {
                match counts.iter_mut().find(|(name, _)| *name == tag) {
                    Some((_, count)) => *count += 1,
                    None => counts.push((tag, 1)),
                }
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(counts
            .into_iter()
            .take(limit as usize)
            .map(|(name, _)| name)
            .collect())
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<String>, RepoError> {
        self.check()?;
        Ok(self
            .posts
            .lock()
            .expect("posts lock")
            .iter()
            .find(|post| post.record.id == post_id)
            .map(|post| post.tags.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn find_name(&self, user_id: i64) -> Result<Option<String>, RepoError> {
        self.check()?;
        self.user_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .users
            .lock()
            .expect("users lock")
            .iter()
            .find(|(id, _)| *id == user_id)
            .map(|(_, name)| name.clone()))
    }
}

/// Request log held in memory; `None` behaves like a missing file.
#[derive(Default)]
pub(crate) struct MemoryLog {
    pub contents: Mutex<Option<String>>,
    pub reads: AtomicUsize,
}

impl MemoryLog {
    pub fn with(contents: Option<&str>) -> Arc<Self> {
        let log = Self::default();
        *log.contents.lock().expect("log lock") = contents.map(str::to_string);
        Arc::new(log)
    }
}

#[async_trait]
impl RequestLogSource for MemoryLog {
    async fn read_log(&self) -> io::Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.contents
            .lock()
            .expect("log lock")
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "request log missing"))
    }
}
