use std::sync::Arc;

use chrono_tz::Tz;
use time::OffsetDateTime;
use tracing::warn;

use crate::application::metadata::post_image_url;
use crate::application::repos::RepoError;
use crate::cache::SiteCache;
use crate::config::{Settings, SiteSettings};
use crate::domain::archive::{ArchiveYear, build_archive};
use crate::domain::posts::PostIndex;
use crate::presentation::views::{
    ArchiveEntryView, ArchiveMonthView, ArchiveYearView, ExternalLinkView, LayoutChrome,
    PageMetaView, PopularCard, SidebarView, SiteView, build_tag_links, post_href,
};
use crate::util::timezone::current_year;

const SOURCE: &str = "application::chrome::ChromeService";

/// Builds the layout shared by every HTML page: branding, page metadata and the sidebar.
#[derive(Clone)]
pub struct ChromeService {
    cache: Arc<SiteCache>,
    site: Arc<SiteSettings>,
    timezone: Tz,
    csp: bool,
}

impl ChromeService {
    pub fn new(cache: Arc<SiteCache>, settings: &Settings) -> Self {
        Self {
            cache,
            site: Arc::new(settings.site.clone()),
            timezone: settings.content.timezone,
            csp: settings.server.content_security_policy,
        }
    }

    /// Layout with a populated sidebar: popular posts, the given tag menu and the archive.
    pub async fn load(
        &self,
        path: &str,
        tags: &[String],
        filter: &str,
    ) -> Result<LayoutChrome, RepoError> {
        let index = self.cache.all_posts().await?;
        let popular = self.popular_cards(&index).await;
        let archive = build_archive(&index, current_year(OffsetDateTime::now_utc(), self.timezone));

        let sidebar = SidebarView {
            popular,
            tags: build_tag_links(tags, filter),
            filter: filter.to_string(),
            archive: archive_views(archive),
        };

        Ok(self.layout(path, sidebar))
    }

    /// Layout with an empty sidebar. Never touches the database.
    pub fn bare(&self, path: &str) -> LayoutChrome {
        self.layout(path, SidebarView::default())
    }

    pub fn site(&self) -> &SiteSettings {
        &self.site
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    fn layout(&self, path: &str, sidebar: SidebarView) -> LayoutChrome {
        let base = path.trim_start_matches('/').to_string();
        LayoutChrome {
            site: self.site_view(),
            meta: PageMetaView {
                title: self.site.title.clone(),
                description: self.site.description.clone(),
                canonical: canonical_url(&self.site.url, path),
                base,
                csp: self.csp,
                csp_img_src: self.site.csp_img_src.clone(),
            },
            sidebar,
        }
    }

    fn site_view(&self) -> SiteView {
        let site = &self.site;
        SiteView {
            title: site.title.clone(),
            author: site.author.clone(),
            keywords: site.keywords.join(", "),
            icon_width: site.icon_width,
            icon_height: site.icon_height,
            icon_alt: site.icon_alt.clone(),
            profile_image_url: site.profile_image_url.clone(),
            profile_image_alt: site.profile_image_alt.clone(),
            profile_html: site.profile_html.clone(),
            license: site.license.clone(),
            license_url: site.license_url.clone(),
            external_link: site.external_link.as_ref().map(|link| ExternalLinkView {
                url: link.url.clone(),
                text: link.text.clone(),
            }),
        }
    }

    async fn popular_cards(&self, index: &PostIndex) -> Vec<PopularCard> {
        let keys = match self.cache.popular().await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(
                    target = SOURCE,
                    error = %err,
                    "failed to read request log; showing no popular posts"
                );
                return Vec::new();
            }
        };

        keys.iter()
            .filter_map(|key| index.get(key))
            .map(|post| PopularCard {
                href: post_href(post.key.as_str()),
                image: post_image_url(&post.key),
                image_alt: post.image_alt.clone(),
                title: post.title.clone(),
                description: post.description.clone(),
            })
            .collect()
    }
}

fn archive_views(archive: Vec<ArchiveYear>) -> Vec<ArchiveYearView> {
    archive
        .into_iter()
        .map(|year| ArchiveYearView {
            year: year.year,
            months: year
                .months
                .into_iter()
                .map(|month| ArchiveMonthView {
                    month: month.month.to_string(),
                    name: month.name.to_string(),
                    entries: month
                        .days
                        .into_iter()
                        .map(|day| ArchiveEntryView {
                            href: post_href(day.post.key.as_str()),
                            fragment: day.fragment,
                            title: day.post.title,
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect()
}

/// Absolute URL for a site-relative `path`.
pub fn canonical_url(base: &str, path: &str) -> String {
    let root = normalize_public_site_url(base);
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        root
    } else {
        format!("{root}{trimmed}")
    }
}

/// Site URL with exactly one trailing slash.
pub fn normalize_public_site_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    format!("{trimmed}/")
}
