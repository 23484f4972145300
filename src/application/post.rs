use std::path::PathBuf;
use std::sync::Arc;

use chrono_tz::Tz;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::application::chrome::canonical_url;
use crate::application::error::ServiceFailure;
use crate::application::metadata::{
    ImageDimensions, image_dimensions, post_image_path, post_image_url,
};
use crate::application::render::{MarkdownRenderer, RenderError};
use crate::application::repos::{PostsRepo, RepoError, TagsRepo};
use crate::cache::SiteCache;
use crate::config::SiteSettings;
use crate::domain::entities::PostRecord;
use crate::domain::posts::PostKey;
use crate::presentation::views::{ImageView, PostDetailView, build_tag_links, post_href};
use crate::util::timezone;

const SOURCE: &str = "application::post::PostService";

#[derive(Debug, Error)]
pub enum PostError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("failed to render post body: {0}")]
    Render(#[from] RenderError),
}

impl ServiceFailure for PostError {
    fn is_unavailable(&self) -> bool {
        match self {
            PostError::Repo(err) => err.is_unavailable(),
            PostError::Render(_) => false,
        }
    }
}

/// A single post with everything its page shows.
#[derive(Debug, Clone)]
pub struct PostPage {
    pub record: PostRecord,
    pub author: String,
    pub tags: Vec<String>,
    pub content_html: String,
    /// `None` when the image is missing or unreadable.
    pub image_dimensions: Option<ImageDimensions>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    tags: Arc<dyn TagsRepo>,
    cache: Arc<SiteCache>,
    static_dir: PathBuf,
    renderer: Arc<MarkdownRenderer>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        tags: Arc<dyn TagsRepo>,
        cache: Arc<SiteCache>,
        static_dir: PathBuf,
        renderer: Arc<MarkdownRenderer>,
    ) -> Self {
        Self {
            posts,
            tags,
            cache,
            static_dir,
            renderer,
        }
    }

    /// Load the post stored under `key`, or `None` when there is no such post.
    pub async fn load(&self, key: &PostKey) -> Result<Option<PostPage>, PostError> {
        let Some(record) = self.posts.find_by_key(key).await? else {
            return Ok(None);
        };

        let author = self
            .cache
            .user_name(record.user_id)
            .await?
            .unwrap_or_default();
        let tags = self.tags.list_for_post(record.id).await?;
        let content_html = self.renderer.render(&record.content_markdown)?;
        let image_dimensions = self.read_image_dimensions(&record.key);

        Ok(Some(PostPage {
            record,
            author,
            tags,
            content_html,
            image_dimensions,
        }))
    }

    fn read_image_dimensions(&self, key: &PostKey) -> Option<ImageDimensions> {
        let path = post_image_path(&self.static_dir, key);
        match image_dimensions(&path) {
            Ok(dimensions) => Some(dimensions),
            Err(err) => {
                warn!(
                    target = SOURCE,
                    post = %key,
                    path = %path.display(),
                    error = %err,
                    "post image unavailable; rendering without dimensions"
                );
                None
            }
        }
    }
}

impl PostPage {
    pub fn path(&self) -> String {
        post_href(self.record.key.as_str())
    }

    pub fn to_view(&self, tz: Tz, site: &SiteSettings) -> PostDetailView {
        let record = &self.record;
        let published = timezone::iso_seconds(record.published, tz);
        let modified = timezone::iso_seconds(record.modified, tz);
        let image = ImageView {
            url: post_image_url(&record.key),
            width: self.image_dimensions.map(|dims| dims.width),
            height: self.image_dimensions.map(|dims| dims.height),
            alt: record.image_alt.clone(),
        };

        let json_ld = json!({
            "@context": "https://schema.org",
            "@type": "BlogPosting",
            "headline": record.title,
            "description": record.description,
            "image": canonical_url(&site.url, &image.url),
            "url": canonical_url(&site.url, &self.path()),
            "datePublished": published,
            "dateModified": modified,
            "author": {
                "@type": "Person",
                "name": self.author,
            },
            "keywords": self.tags.join(", "),
        })
        .to_string()
        .replace("</", "<\\/");

        PostDetailView {
            title: record.title.clone(),
            description: record.description.clone(),
            preview: record.preview.clone(),
            author: self.author.clone(),
            image,
            date_label: timezone::date_label(record.published, tz),
            published,
            modified,
            tags: build_tag_links(&self.tags, ""),
            content_html: self.content_html.clone(),
            json_ld,
        }
    }
}
