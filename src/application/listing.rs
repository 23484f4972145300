use std::sync::Arc;

use chrono_tz::Tz;
use futures::future::try_join;
use thiserror::Error;

use crate::application::error::ServiceFailure;
use crate::application::metadata::post_image_url;
use crate::application::pagination::Pagination;
use crate::application::repos::{PostsRepo, RepoError, TagFilter};
use crate::cache::SiteCache;
use crate::domain::entities::ListingRecord;
use crate::presentation::views::{ListingView, PageLink, PostCard, listing_href, post_href};
use crate::util::timezone;

#[derive(Debug, Error)]
pub enum ListingError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl ServiceFailure for ListingError {
    fn is_unavailable(&self) -> bool {
        match self {
            ListingError::Repo(err) => err.is_unavailable(),
        }
    }
}

/// One page of the post listing, optionally restricted by a tag filter.
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub filter: String,
    pub pagination: Pagination,
    pub posts: Vec<ListingRecord>,
    /// Sidebar tag menu: "all" (the empty tag), the active filter, then the top tags.
    pub tag_menu: Vec<String>,
}

#[derive(Clone)]
pub struct ListingService {
    cache: Arc<SiteCache>,
    posts: Arc<dyn PostsRepo>,
}

impl ListingService {
    pub fn new(cache: Arc<SiteCache>, posts: Arc<dyn PostsRepo>) -> Self {
        Self { cache, posts }
    }

    pub async fn load(&self, filter: &str, page: u64) -> Result<ListingPage, ListingError> {
        let tag_filter = TagFilter::new(filter);

        let total = async {
            match tag_filter.as_ref() {
                Some(tag_filter) => self.posts.count_tagged(tag_filter).await,
                None => self.cache.post_count().await,
            }
        };
        let (total, top_tags) = try_join(total, self.cache.top_tags()).await?;
        let pagination = Pagination::new(page, total);

        let posts = self
            .posts
            .list_page(
                tag_filter.as_ref(),
                pagination.limit(),
                pagination.offset(),
            )
            .await?;

        Ok(ListingPage {
            filter: filter.to_string(),
            pagination,
            posts,
            tag_menu: tag_menu(&top_tags, filter),
        })
    }
}

/// Sidebar tag menu for a listing filtered by `filter`.
pub fn tag_menu(top_tags: &[String], filter: &str) -> Vec<String> {
    let mut menu = Vec::with_capacity(top_tags.len() + 2);
    menu.push(String::new());
    if !filter.is_empty() {
        menu.push(filter.to_string());
    }
    menu.extend(top_tags.iter().filter(|tag| *tag != filter).cloned());
    menu
}

impl ListingPage {
    /// Path of this page, used for the canonical URL.
    pub fn path(&self) -> String {
        listing_href(&self.filter, self.pagination.page)
    }

    pub fn to_view(&self, tz: Tz) -> ListingView {
        let pagination = &self.pagination;
        let posts = self
            .posts
            .iter()
            .map(|post| PostCard {
                href: post_href(post.key.as_str()),
                image: post_image_url(&post.key),
                image_alt: post.image_alt.clone(),
                title: post.title.clone(),
                description: post.description.clone(),
                preview: post.preview.clone(),
                author: post.author.clone(),
                published: timezone::iso_seconds(post.published, tz),
                modified: timezone::iso_seconds(post.modified, tz),
                date_label: timezone::date_label(post.published, tz),
            })
            .collect();

        let pages = pagination
            .window
            .iter()
            .map(|&number| PageLink {
                number,
                href: listing_href(&self.filter, number),
                is_current: number == pagination.page,
            })
            .collect();

        ListingView {
            posts,
            filter: self.filter.clone(),
            page: pagination.page,
            last_page: pagination.last_page,
            pages,
            previous_href: pagination
                .previous_page()
                .map(|page| listing_href(&self.filter, page)),
            next_href: pagination
                .next_page()
                .map(|page| listing_href(&self.filter, page)),
        }
    }
}
