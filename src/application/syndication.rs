//! RSS 2.0 feed generated from the cached all-posts index.

use std::sync::Arc;

use chrono_tz::Tz;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::chrome::{canonical_url, normalize_public_site_url};
use crate::application::error::ServiceFailure;
use crate::application::metadata::post_image_url;
use crate::application::repos::RepoError;
use crate::cache::SiteCache;
use crate::config::SiteSettings;
use crate::domain::posts::PostIndex;
use crate::presentation::views::post_href;
use crate::util::timezone;

const CHANNEL_IMAGE_PATH: &str = "/static/icon.webp";

#[derive(Clone)]
pub struct SyndicationService {
    cache: Arc<SiteCache>,
    site: Arc<SiteSettings>,
    timezone: Tz,
}

#[derive(Debug, Error)]
pub enum SyndicationError {
    #[error("failed to load posts: {0}")]
    Posts(#[from] RepoError),
}

impl ServiceFailure for SyndicationError {
    fn is_unavailable(&self) -> bool {
        match self {
            SyndicationError::Posts(err) => err.is_unavailable(),
        }
    }
}

impl SyndicationService {
    pub fn new(cache: Arc<SiteCache>, site: Arc<SiteSettings>, timezone: Tz) -> Self {
        Self {
            cache,
            site,
            timezone,
        }
    }

    /// Generate RSS 2.0 feed XML, newest post first.
    pub async fn rss_feed(&self) -> Result<String, SyndicationError> {
        let index = self.cache.all_posts().await?;
        Ok(render_rss(
            &index,
            &self.site,
            self.timezone,
            OffsetDateTime::now_utc(),
        ))
    }
}

fn render_rss(index: &PostIndex, site: &SiteSettings, tz: Tz, now: OffsetDateTime) -> String {
    let base = normalize_public_site_url(&site.url);

    let mut items = String::new();
    for post in index.iter() {
        let link = canonical_url(&base, &post_href(post.key.as_str()));
        let image = canonical_url(&base, &post_image_url(&post.key));
        items.push_str(&format!(
            "    <item>\n      <title>{}</title>\n      <link>{link}</link>\n      <guid>{link}</guid>\n      <description>{}</description>\n      <pubDate>{}</pubDate>\n      <enclosure url=\"{}\" length=\"0\" type=\"image/webp\"/>\n    </item>\n",
            xml_escape(&post.title),
            xml_escape(&post.description),
            timezone::rfc2822(post.published, tz),
            xml_escape(&image),
        ));
    }

    let pub_date = index
        .newest()
        .map(|post| {
            format!(
                "    <pubDate>{}</pubDate>\n",
                timezone::rfc2822(post.published, tz)
            )
        })
        .unwrap_or_default();

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n  <channel>\n    <title>{title}</title>\n    <link>{base}</link>\n    <description>{description}</description>\n    <language>en-us</language>\n    <copyright>{copyright}</copyright>\n    <lastBuildDate>{built}</lastBuildDate>\n{pub_date}    <image>\n      <url>{icon}</url>\n      <title>{title}</title>\n      <link>{base}</link>\n    </image>\n{items}  </channel>\n</rss>\n",
        title = xml_escape(&site.title),
        description = xml_escape(&site.rss_description),
        copyright = xml_escape(&site.rss_license),
        built = timezone::rfc2822(now, tz),
        icon = canonical_url(&base, CHANNEL_IMAGE_PATH),
    )
}

pub(crate) fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
