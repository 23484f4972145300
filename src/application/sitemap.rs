//! Sitemap service for sitemap.xml and robots.txt generation.

use std::sync::Arc;

use chrono_tz::Tz;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::chrome::{canonical_url, normalize_public_site_url};
use crate::application::error::ServiceFailure;
use crate::application::repos::RepoError;
use crate::application::syndication::xml_escape;
use crate::cache::SiteCache;
use crate::config::SiteSettings;
use crate::domain::posts::PostIndex;
use crate::presentation::views::post_href;
use crate::util::timezone;

#[derive(Clone)]
pub struct SitemapService {
    cache: Arc<SiteCache>,
    site: Arc<SiteSettings>,
    timezone: Tz,
}

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("failed to load posts: {0}")]
    Posts(#[from] RepoError),
}

impl ServiceFailure for SitemapError {
    fn is_unavailable(&self) -> bool {
        match self {
            SitemapError::Posts(err) => err.is_unavailable(),
        }
    }
}

impl SitemapService {
    pub fn new(cache: Arc<SiteCache>, site: Arc<SiteSettings>, timezone: Tz) -> Self {
        Self {
            cache,
            site,
            timezone,
        }
    }

    /// The home page followed by every post, newest first.
    pub async fn sitemap_xml(&self) -> Result<String, SitemapError> {
        let index = self.cache.all_posts().await?;
        Ok(render_sitemap(&index, &self.site.url, self.timezone))
    }

    pub fn robots_txt(&self) -> String {
        let base = normalize_public_site_url(&self.site.url);
        format!("User-agent: *\nAllow: /\nSitemap: {base}sitemap.xml\n")
    }
}

fn render_sitemap(index: &PostIndex, site_url: &str, tz: Tz) -> String {
    let base = normalize_public_site_url(site_url);

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    // The home page changes whenever the newest post does.
    let home_lastmod = index.iter().map(|post| post.modified).max();
    xml.push_str(&sitemap_entry(&base, "/", home_lastmod, tz));

    for post in index.iter() {
        xml.push_str(&sitemap_entry(
            &base,
            &post_href(post.key.as_str()),
            Some(post.modified),
            tz,
        ));
    }

    xml.push_str("</urlset>\n");
    xml
}

fn sitemap_entry(base: &str, path: &str, lastmod: Option<OffsetDateTime>, tz: Tz) -> String {
    let loc = xml_escape(&canonical_url(base, path));
    match lastmod {
        Some(lastmod) => format!(
            "  <url><loc>{loc}</loc><lastmod>{}</lastmod></url>\n",
            timezone::iso_seconds(lastmod, tz)
        ),
        None => format!("  <url><loc>{loc}</loc></url>\n"),
    }
}
