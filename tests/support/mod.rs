#![allow(dead_code)]

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use inkwell::application::chrome::ChromeService;
use inkwell::application::listing::ListingService;
use inkwell::application::popularity::RequestLogSource;
use inkwell::application::post::PostService;
use inkwell::application::render::MarkdownRenderer;
use inkwell::application::repos::{PostsRepo, RepoError, TagFilter, TagsRepo, UsersRepo};
use inkwell::application::sitemap::SitemapService;
use inkwell::application::syndication::SyndicationService;
use inkwell::cache::{CacheConfig, ManualClock, SiteCache};
use inkwell::config::Settings;
use inkwell::domain::entities::{ListingRecord, PostRecord};
use inkwell::domain::posts::{PostKey, PostSummary};
use inkwell::infra::assets::StaticFiles;
use inkwell::infra::http::{ContentSecurityPolicy, DatabaseProbe, HttpState, build_router};
use time::{Duration, OffsetDateTime, macros::datetime};
use tower::ServiceExt;

#[derive(Clone)]
pub struct Post {
    pub record: PostRecord,
    pub tags: Vec<String>,
}

pub fn post(id: i64, key: &str, title: &str, tags: &[&str]) -> Post {
    let published: OffsetDateTime = datetime!(2021-01-01 09:00 UTC) + Duration::days(id);
    Post {
        record: PostRecord {
            id,
            user_id: 1,
            key: PostKey::from_stored(key),
            title: title.to_string(),
            description: format!("{title} in brief"),
            preview: format!("{title} preview"),
            content_markdown: format!("# {title}\n\nSome words about {title}.\n"),
            image_alt: format!("{title} cover"),
            published,
            modified: published,
        },
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}

/// In-memory store standing in for PostgreSQL.
pub struct Store {
    posts: Mutex<Vec<Post>>,
    down: AtomicBool,
}

impl Store {
    pub fn new(mut posts: Vec<Post>) -> Arc<Self> {
        posts.sort_by(|a, b| b.record.key.cmp(&a.record.key));
        Arc::new(Self {
            posts: Mutex::new(posts),
            down: AtomicBool::new(false),
        })
    }

    pub fn take_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    fn posts(&self) -> Result<Vec<Post>, RepoError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(RepoError::unavailable("connection refused"));
        }
        Ok(self.posts.lock().expect("posts lock").clone())
    }
}

fn has_tag(post: &Post, filter: &TagFilter) -> bool {
    post.tags.iter().any(|tag| filter.matches(tag))
}

#[async_trait]
impl PostsRepo for Store {
    async fn list_index(&self) -> Result<Vec<PostSummary>, RepoError> {
        Ok(self
            .posts()?
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
        Ok(self.posts()?.len() as u64)
    }

    async fn count_tagged(&self, filter: &TagFilter) -> Result<u64, RepoError> {
        Ok(self
            .posts()?
            .iter()
            .filter(|post| has_tag(post, filter))
            .count() as u64)
    }

    async fn list_page(
        &self,
        filter: Option<&TagFilter>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<ListingRecord>, RepoError> {
        Ok(self
            .posts()?
            .into_iter()
            .filter(|post| filter.is_none_or(|filter| has_tag(post, filter)))
            .skip(offset as usize)
            .take(limit as usize)
            .map(|post| ListingRecord {
                key: post.record.key,
                author: "Matthew Rease".to_string(),
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
        Ok(self
            .posts()?
            .into_iter()
            .find(|post| &post.record.key == key)
            .map(|post| post.record))
    }
}

#[async_trait]
impl TagsRepo for Store {
    async fn top_tags(&self, limit: u64) -> Result<Vec<String>, RepoError> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for post in self.posts()? {
            for tag in post.tags {
                match counts.iter_mut().find(|(name, _)| *name == tag) {
                    Some((_, count)) => *count += 1,
                    None => counts.push((tag, 1)),
                }
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(counts
            .into_iter()
            .take(limit as usize)
            .map(|(name, _)| name)
            .collect())
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<String>, RepoError> {
        Ok(self
            .posts()?
            .into_iter()
            .find(|post| post.record.id == post_id)
            .map(|post| post.tags)
            .unwrap_or_default())
    }
}

#[async_trait]
impl UsersRepo for Store {
    async fn find_name(&self, user_id: i64) -> Result<Option<String>, RepoError> {
        self.posts()?;
        Ok((user_id == 1).then(|| "Matthew Rease".to_string()))
    }
}

#[async_trait]
impl DatabaseProbe for Store {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        if self.down.load(Ordering::SeqCst) {
            Err(sqlx::Error::PoolClosed)
        } else {
            Ok(())
        }
    }
}

pub struct StaticLog(pub Option<String>);

#[async_trait]
impl RequestLogSource for StaticLog {
    async fn read_log(&self) -> io::Result<String> {
        self.0
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no request log"))
    }
}

pub struct App {
    pub router: Router,
    pub store: Arc<Store>,
    pub clock: Arc<ManualClock>,
}

pub struct AppOptions {
    pub posts: Vec<Post>,
    pub request_log: Option<String>,
    pub csp: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            posts: Vec::new(),
            request_log: Some(String::new()),
            csp: false,
        }
    }
}

pub fn app(options: AppOptions, static_dir: &Path) -> App {
    let mut settings = Settings::defaults().expect("default settings");
    settings.site.url = "https://blog.example.com".to_string();
    settings.content.static_dir = static_dir.to_path_buf();
    settings.server.content_security_policy = options.csp;

    let store = Store::new(options.posts);
    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(SiteCache::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(StaticLog(options.request_log)),
        CacheConfig::from(&settings),
        clock.clone(),
    ));
    let site = Arc::new(settings.site.clone());
    let timezone = settings.content.timezone;

    let state = HttpState {
        chrome: Arc::new(ChromeService::new(cache.clone(), &settings)),
        listing: Arc::new(ListingService::new(cache.clone(), store.clone())),
        posts: Arc::new(PostService::new(
            store.clone(),
            store.clone(),
            cache.clone(),
            static_dir.to_path_buf(),
            Arc::new(MarkdownRenderer::new()),
        )),
        syndication: Arc::new(SyndicationService::new(
            cache.clone(),
            site.clone(),
            timezone,
        )),
        sitemap: Arc::new(SitemapService::new(cache, site, timezone)),
        assets: Arc::new(StaticFiles::new(static_dir)),
        db: store.clone(),
        csp: if options.csp {
            ContentSecurityPolicy::build(settings.site.csp_img_src.as_deref())
        } else {
            None
        },
    };

    App {
        router: build_router(state),
        store,
        clock,
    }
}

pub async fn get(router: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

pub async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn get_text(router: &Router, uri: &str) -> (StatusCode, String) {
    let response = get(router, uri).await;
    let status = response.status();
    (status, body_text(response).await)
}
