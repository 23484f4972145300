mod support;

use axum::http::{StatusCode, header};
use support::{AppOptions, Post, app, get, get_text, post};

fn posts() -> Vec<Post> {
    vec![
        post(1, "202101051200", "Starting Out", &["life"]),
        post(2, "202102101530", "Borrow Checker Blues", &["Rust", "programming"]),
        post(3, "202103151000", "Async All The Way", &["rust", "async"]),
        post(4, "202104200800", "Garden Notes", &["life", "garden"]),
        post(5, "202105251900", "Lifetimes Explained", &["rust"]),
        post(6, "202106300700", "Summer Reading", &["books"]),
        post(7, "202107041200", "Trait Objects", &["rust", "programming"]),
    ]
}

fn options() -> AppOptions {
    AppOptions {
        posts: posts(),
        ..AppOptions::default()
    }
}

#[tokio::test]
async fn home_lists_newest_five_posts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(options(), dir.path());

    let (status, body) = get_text(&app.router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Trait Objects"));
    assert!(body.contains("Borrow Checker Blues"));
    assert!(!body.contains("<h2><a href=\"/post/202101051200\">"));

    let first = body.find("/post/202107041200").expect("newest post");
    let second = body.find("/post/202106300700").expect("second post");
    assert!(first < second);
}

#[tokio::test]
async fn second_page_holds_the_rest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(options(), dir.path());

    let (status, body) = get_text(&app.router, "/page/1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<h2><a href=\"/post/202102101530\">"));
    assert!(body.contains("<h2><a href=\"/post/202101051200\">"));
    assert!(!body.contains("<h2><a href=\"/post/202107041200\">"));
    assert!(body.contains("rel=\"prev\""));
}

#[tokio::test]
async fn out_of_range_page_is_empty_listing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(options(), dir.path());

    let (status, body) = get_text(&app.router, "/page/40").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("No posts found."));
}

#[tokio::test]
async fn non_numeric_page_is_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(options(), dir.path());

    let (status, body) = get_text(&app.router, "/page/two").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Uh Oh!"));

    let response = get(&app.router, "/filter/rust/page/-1").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tag_filter_matches_case_insensitive_substrings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(options(), dir.path());

    let (status, body) = get_text(&app.router, "/filter/RUS").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Trait Objects"));
    assert!(body.contains("Borrow Checker Blues"));
    assert!(!body.contains("Summer Reading</a></h2>"));
    assert!(body.contains("Posts tagged &ldquo;RUS&rdquo;"));
}

#[tokio::test]
async fn unmatched_tag_filter_renders_empty_listing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(options(), dir.path());

    let (status, body) = get_text(&app.router, "/filter/haskell/page/0").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("No posts found."));
    assert!(!body.contains("class=\"pager\""));
}

#[tokio::test]
async fn every_stored_post_renders() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(options(), dir.path());

    for post in posts() {
        let uri = format!("/post/{}", post.record.key);
        let (status, body) = get_text(&app.router, &uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(body.contains(&post.record.title), "{uri}");
        assert!(body.contains("application/ld+json"));
    }
}

#[tokio::test]
async fn post_page_shifts_headings_and_lists_its_tags() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(options(), dir.path());

    let (_, body) = get_text(&app.router, "/post/202103151000").await;
    assert!(body.contains("<h3 id=\"async-all-the-way\">"), "{body}");
    assert!(body.contains("href=\"/filter/async\""));
}

#[tokio::test]
async fn missing_or_malformed_posts_are_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(options(), dir.path());

    for uri in ["/post/209901010000", "/post/abc", "/post/2021"] {
        let (status, body) = get_text(&app.router, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert!(body.contains("/static/badID.webp"), "{uri}");
    }
}

#[tokio::test]
async fn database_outage_renders_error_page() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(options(), dir.path());
    app.store.take_down();

    for uri in ["/", "/filter/rust", "/post/202101051200", "/rss", "/sitemap.xml"] {
        let (status, body) = get_text(&app.router, uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert!(body.contains("Database Error"), "{uri}");
    }

    let health = get(&app.router, "/_health/db").await;
    assert_eq!(health.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn rss_feed_is_newest_first() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(options(), dir.path());

    let response = get(&app.router, "/rss").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).expect("type"),
        "application/rss+xml"
    );
    let body = support::body_text(response).await;

    let keys: Vec<usize> = posts()
        .iter()
        .rev()
        .map(|post| {
            body.find(&format!("<guid>https://blog.example.com/post/{}</guid>", post.record.key))
                .expect("item present")
        })
        .collect();
    assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
async fn sitemap_and_robots_point_at_the_site() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(options(), dir.path());

    let response = get(&app.router, "/sitemap.xml").await;
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).expect("type"),
        "application/xml"
    );
    let body = support::body_text(response).await;
    assert!(body.contains("<loc>https://blog.example.com/</loc>"));
    assert_eq!(body.matches("<url>").count(), posts().len() + 1);

    let (status, robots) = get_text(&app.router, "/robots.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert!(robots.contains("Sitemap: https://blog.example.com/sitemap.xml"));
}

#[tokio::test]
async fn popular_posts_come_from_the_request_log() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = "\
[pid: 9] 10.0.0.2 () [Sat Jul 10 10:00:00 2021] GET /post/202103151000 => generated 1 bytes
[pid: 9] 10.0.0.2 () [Sat Jul 10 10:00:01 2021] GET /post/202103151000 => generated 1 bytes
[pid: 9] 10.0.0.2 () [Sat Jul 10 10:00:02 2021] GET /post/199912312359 => generated 1 bytes
";
    let app = app(
        AppOptions {
            posts: posts(),
            request_log: Some(log.to_string()),
            csp: false,
        },
        dir.path(),
    );

    let (_, body) = get_text(&app.router, "/").await;
    assert!(body.contains("class=\"popular-card\" href=\"/post/202103151000\""));
    assert!(!body.contains("199912312359"));
}

#[tokio::test]
async fn missing_request_log_still_renders() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(
        AppOptions {
            posts: posts(),
            request_log: None,
            csp: false,
        },
        dir.path(),
    );

    let (status, body) = get_text(&app.router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("class=\"popular\""));
}

#[tokio::test]
async fn csp_header_is_sent_when_enabled() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = app(
        AppOptions {
            posts: posts(),
            csp: true,
            ..AppOptions::default()
        },
        dir.path(),
    );

    for uri in ["/", "/post/209901010000", "/nowhere"] {
        let response = get(&app.router, uri).await;
        let policy = response
            .headers()
            .get(header::CONTENT_SECURITY_POLICY)
            .expect("policy header")
            .to_str()
            .expect("ascii");
        assert!(policy.contains("img-src 'self' cdn.matthewrease.net"), "{uri}");
    }

    let plain = support::app(options(), dir.path());
    let response = get(&plain.router, "/").await;
    assert!(
        response
            .headers()
            .get(header::CONTENT_SECURITY_POLICY)
            .is_none()
    );
}

#[tokio::test]
async fn static_files_and_fallback() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("robots-note.txt"), "hello").expect("write");
    let app = app(options(), dir.path());

    let (status, body) = get_text(&app.router, "/static/robots-note.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "hello");

    let missing = get(&app.router, "/static/absent.webp").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let (status, body) = get_text(&app.router, "/about").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Uh Oh!"));
}
