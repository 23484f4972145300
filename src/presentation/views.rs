use crate::application::error::{ErrorReport, HttpError};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Internal server error",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// The "Uh Oh!" page, rendered with an empty sidebar.
pub fn render_not_found_response(chrome: LayoutChrome, detail: impl Into<String>) -> Response {
    let content = ErrorPageView::not_found();
    let chrome = chrome.with_meta(content.meta_title(), content.description.clone());
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        detail,
    )
    .attach(&mut response);
    response
}

/// The static database error page. The report carries the underlying failure.
pub fn render_database_error_response(chrome: LayoutChrome, report: ErrorReport) -> Response {
    let content = ErrorPageView::database_unavailable();
    let chrome = chrome.with_meta(content.meta_title(), content.description.clone());
    let view = LayoutContext::new(chrome, content);
    let mut response =
        render_template_response(ErrorTemplate { view }, StatusCode::INTERNAL_SERVER_ERROR);
    report.attach(&mut response);
    response
}

#[derive(Clone)]
pub struct ExternalLinkView {
    pub url: String,
    pub text: String,
}

/// Branding shared by every page.
#[derive(Clone)]
pub struct SiteView {
    pub title: String,
    pub author: String,
    pub keywords: String,
    pub icon_width: u32,
    pub icon_height: u32,
    pub icon_alt: String,
    pub profile_image_url: String,
    pub profile_image_alt: String,
    pub profile_html: String,
    pub license: String,
    pub license_url: String,
    pub external_link: Option<ExternalLinkView>,
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
    /// Absolute URL of this page.
    pub canonical: String,
    /// Site-relative path of this page without the leading slash.
    pub base: String,
    pub csp: bool,
    pub csp_img_src: Option<String>,
}

impl PageMetaView {
    pub fn with_content(self, title: String, description: String) -> Self {
        Self {
            title,
            description,
            ..self
        }
    }
}

#[derive(Clone)]
pub struct PopularCard {
    pub href: String,
    pub image: String,
    pub image_alt: String,
    pub title: String,
    pub description: String,
}

#[derive(Clone)]
pub struct TagLink {
    pub label: String,
    pub href: String,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct ArchiveEntryView {
    pub href: String,
    pub fragment: String,
    pub title: String,
}

#[derive(Clone)]
pub struct ArchiveMonthView {
    pub month: String,
    pub name: String,
    pub entries: Vec<ArchiveEntryView>,
}

#[derive(Clone)]
pub struct ArchiveYearView {
    pub year: String,
    pub months: Vec<ArchiveMonthView>,
}

#[derive(Clone, Default)]
pub struct SidebarView {
    pub popular: Vec<PopularCard>,
    pub tags: Vec<TagLink>,
    pub filter: String,
    pub archive: Vec<ArchiveYearView>,
}

impl SidebarView {
    pub fn is_empty(&self) -> bool {
        self.popular.is_empty() && self.tags.is_empty() && self.archive.is_empty()
    }
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub site: SiteView,
    pub meta: PageMetaView,
    pub sidebar: SidebarView,
}

impl LayoutChrome {
    pub fn with_meta(self, title: String, description: String) -> Self {
        Self {
            meta: self.meta.with_content(title, description),
            ..self
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site: SiteView,
    pub meta: PageMetaView,
    pub sidebar: SidebarView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            site: chrome.site,
            meta: chrome.meta,
            sidebar: chrome.sidebar,
            content,
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub href: String,
    pub image: String,
    pub image_alt: String,
    pub title: String,
    pub description: String,
    pub preview: String,
    pub author: String,
    pub published: String,
    pub modified: String,
    pub date_label: String,
}

#[derive(Clone)]
pub struct PageLink {
    pub number: u64,
    pub href: String,
    pub is_current: bool,
}

pub struct ListingView {
    pub posts: Vec<PostCard>,
    pub filter: String,
    pub page: u64,
    pub last_page: u64,
    pub pages: Vec<PageLink>,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<ListingView>,
}

#[derive(Clone)]
pub struct ImageView {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub alt: String,
}

pub struct PostDetailView {
    pub title: String,
    pub description: String,
    pub preview: String,
    pub author: String,
    pub image: ImageView,
    pub published: String,
    pub modified: String,
    pub date_label: String,
    pub tags: Vec<TagLink>,
    pub content_html: String,
    pub json_ld: String,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailView>,
}

pub struct ErrorPageView {
    pub heading: String,
    pub description: String,
    pub message: String,
    pub image: Option<ImageView>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            heading: "Uh Oh!".to_string(),
            description: "Did you mistype the link?".to_string(),
            message: "Unfortunately the post ID you have provided in the URL could not be found. Please check the URL and try again. If you think this is an error, then feel free to contact me about it.".to_string(),
            image: Some(ImageView {
                url: "/static/badID.webp".to_string(),
                width: Some(1280),
                height: Some(800),
                alt: "macintosh computer with frown and X for eyes".to_string(),
            }),
        }
    }

    pub fn database_unavailable() -> Self {
        Self {
            heading: "Database Error".to_string(),
            description: "The blog could not reach its database.".to_string(),
            message: "The server could not connect to the database. Please try again in a few minutes.".to_string(),
            image: None,
        }
    }

    fn meta_title(&self) -> String {
        self.heading.clone()
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

/// Link to the listing filtered by `tag`; the empty tag links to the unfiltered home page.
pub fn filter_href(tag: &str) -> String {
    if tag.is_empty() {
        "/".to_string()
    } else {
        format!("/filter/{}", encode_path_segment(tag))
    }
}

/// Link to page `page` of the listing filtered by `tag`. Page zero is the bare listing.
pub fn listing_href(tag: &str, page: u64) -> String {
    match (tag.is_empty(), page) {
        (_, 0) => filter_href(tag),
        (true, page) => format!("/page/{page}"),
        (false, page) => format!("{}/page/{page}", filter_href(tag)),
    }
}

pub fn post_href(key: &str) -> String {
    format!("/post/{key}")
}

pub fn build_tag_links<'a, T>(tags: T, active: &str) -> Vec<TagLink>
where
    T: IntoIterator<Item = &'a String>,
{
    tags.into_iter()
        .map(|tag| TagLink {
            label: tag.clone(),
            href: filter_href(tag),
            is_active: tag == active,
        })
        .collect()
}

fn encode_path_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_links_follow_route_shapes() {
        assert_eq!(listing_href("", 0), "/");
        assert_eq!(listing_href("", 3), "/page/3");
        assert_eq!(listing_href("rust", 0), "/filter/rust");
        assert_eq!(listing_href("rust", 2), "/filter/rust/page/2");
    }

    #[test]
    fn filter_links_escape_path_characters() {
        assert_eq!(filter_href("c++ / c#"), "/filter/c%2B%2B%20%2F%20c%23");
        assert_eq!(filter_href("café"), "/filter/caf%C3%A9");
    }

    #[test]
    fn tag_links_mark_active_filter() {
        let tags = vec![String::new(), "rust".to_string(), "life".to_string()];
        let links = build_tag_links(&tags, "rust");
        assert_eq!(links[0].href, "/");
        assert!(links[1].is_active);
        assert!(!links[2].is_active);
    }
}
