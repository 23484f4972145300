use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, Uri, header::CONTENT_TYPE},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    application::{
        chrome::ChromeService,
        error::{ErrorReport, HttpError, ServiceFailure},
        listing::ListingService,
        pagination::parse_page_number,
        post::PostService,
        sitemap::SitemapService,
        syndication::SyndicationService,
    },
    domain::posts::PostKey,
    infra::assets::StaticFiles,
    presentation::views::{
        IndexTemplate, LayoutContext, PostTemplate, render_database_error_response,
        render_not_found_response, render_template_response,
    },
};

use super::{
    DatabaseProbe, db_health_response,
    middleware::{
        ContentSecurityPolicy, log_responses, set_content_security_policy, set_request_context,
    },
};

#[derive(Clone)]
pub struct HttpState {
    pub chrome: Arc<ChromeService>,
    pub listing: Arc<ListingService>,
    pub posts: Arc<PostService>,
    pub syndication: Arc<SyndicationService>,
    pub sitemap: Arc<SitemapService>,
    pub assets: Arc<StaticFiles>,
    pub db: Arc<dyn DatabaseProbe>,
    /// Present when every response should carry a `Content-Security-Policy` header.
    pub csp: Option<ContentSecurityPolicy>,
}

pub fn build_router(state: HttpState) -> Router {
    let csp = state.csp.clone();

    let router = Router::new()
        .route("/", get(index))
        .route("/filter/{tag}", get(tag_index))
        .route("/page/{page}", get(page_index))
        .route("/filter/{tag}/page/{page}", get(tag_page_index))
        .route("/post/{id}", get(post_detail))
        .route("/rss", get(rss_feed))
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots_txt))
        .route("/static/{*path}", get(static_file))
        .route("/_health/db", get(public_health))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses));

    let router = match csp {
        Some(policy) => router.layer(middleware::from_fn_with_state(
            policy,
            set_content_security_policy,
        )),
        None => router,
    };

    router.layer(middleware::from_fn(set_request_context))
}

async fn index(State(state): State<HttpState>) -> Response {
    listing_response(&state, "", 0).await
}

async fn tag_index(State(state): State<HttpState>, Path(tag): Path<String>) -> Response {
    listing_response(&state, &tag, 0).await
}

async fn page_index(State(state): State<HttpState>, Path(page): Path<String>) -> Response {
    match parse_page_number(&page) {
        Ok(page) => listing_response(&state, "", page).await,
        Err(err) => not_found(&state, err.to_string()),
    }
}

async fn tag_page_index(
    State(state): State<HttpState>,
    Path((tag, page)): Path<(String, String)>,
) -> Response {
    match parse_page_number(&page) {
        Ok(page) => listing_response(&state, &tag, page).await,
        Err(err) => not_found(&state, err.to_string()),
    }
}

async fn listing_response(state: &HttpState, filter: &str, page: u64) -> Response {
    const SOURCE: &str = "infra::http::public::listing";

    let listing = match state.listing.load(filter, page).await {
        Ok(listing) => listing,
        Err(err) => return service_failure(state, SOURCE, &err),
    };

    let chrome = match state
        .chrome
        .load(&listing.path(), &listing.tag_menu, filter)
        .await
    {
        Ok(chrome) => chrome,
        Err(err) => return service_failure(state, SOURCE, &err),
    };

    let content = listing.to_view(state.chrome.timezone());
    let view = LayoutContext::new(chrome, content);
    render_template_response(IndexTemplate { view }, StatusCode::OK)
}

async fn post_detail(State(state): State<HttpState>, Path(id): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::post_detail";

    let key = match PostKey::parse(&id) {
        Ok(key) => key,
        Err(err) => return not_found(&state, err.to_string()),
    };

    let page = match state.posts.load(&key).await {
        Ok(Some(page)) => page,
        Ok(None) => return not_found(&state, format!("no post stored under `{key}`")),
        Err(err) => return service_failure(&state, SOURCE, &err),
    };

    let chrome = match state.chrome.load(&page.path(), &page.tags, "").await {
        Ok(chrome) => chrome,
        Err(err) => return service_failure(&state, SOURCE, &err),
    };

    let content = page.to_view(state.chrome.timezone(), state.chrome.site());
    let chrome = chrome.with_meta(content.title.clone(), content.description.clone());
    let view = LayoutContext::new(chrome, content);
    render_template_response(PostTemplate { view }, StatusCode::OK)
}

async fn rss_feed(State(state): State<HttpState>) -> Response {
    match state.syndication.rss_feed().await {
        Ok(body) => xml_response(body, "application/rss+xml"),
        Err(err) => service_failure(&state, "infra::http::public::rss", &err),
    }
}

async fn sitemap(State(state): State<HttpState>) -> Response {
    match state.sitemap.sitemap_xml().await {
        Ok(body) => xml_response(body, "application/xml"),
        Err(err) => service_failure(&state, "infra::http::public::sitemap", &err),
    }
}

async fn robots_txt(State(state): State<HttpState>) -> Response {
    plain_response(state.sitemap.robots_txt())
}

async fn static_file(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    state.assets.serve(&path).await
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.ping().await)
}

async fn fallback(State(state): State<HttpState>, uri: Uri) -> Response {
    not_found(&state, format!("no page at `{}`", uri.path()))
}

fn not_found(state: &HttpState, detail: impl Into<String>) -> Response {
    render_not_found_response(state.chrome.bare("/"), detail)
}

/// The database error page when the store is unreachable, a plain 500 otherwise.
fn service_failure<E: ServiceFailure>(state: &HttpState, source: &'static str, err: &E) -> Response {
    if err.is_unavailable() {
        let report = ErrorReport::from_error(source, StatusCode::INTERNAL_SERVER_ERROR, err);
        render_database_error_response(state.chrome.bare("/"), report)
    } else {
        HttpError::internal(source, err).into_response()
    }
}

fn xml_response(body: String, content_type: &str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn plain_response(body: String) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
