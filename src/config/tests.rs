use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_match_the_blog_conventions() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.cache.ttl, Duration::from_secs(7200));
    assert_eq!(settings.cache.top_tags_limit.get(), 15);
    assert_eq!(settings.popularity.limit.get(), 3);
    assert_eq!(settings.popularity.log_path, PathBuf::from("uwsgi.log"));
    assert_eq!(settings.content.static_dir, PathBuf::from("static"));
    assert_eq!(settings.content.timezone, Tz::UTC);
    assert!(!settings.server.content_security_policy);
    assert_eq!(settings.database.user, "blog");
    assert!(settings.database.url.is_none());
    assert_eq!(settings.site.title, "Compressed Thoughts");
    assert_eq!(settings.site.csp_img_src.as_deref(), Some("cdn.matthewrease.net"));
}

#[test]
fn blank_feed_texts_fall_back_to_page_texts() {
    let mut raw = RawSettings::default();
    raw.site.description = Some("About things".to_string());
    raw.site.license = Some("CC0".to_string());
    raw.site.rss_description = Some("  ".to_string());
    raw.site.rss_license = Some(String::new());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.site.rss_description, "About things");
    assert_eq!(settings.site.rss_license, "CC0");
}

#[test]
fn blank_external_url_disables_link() {
    let mut raw = RawSettings::default();
    raw.site.external_url = Some(String::new());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.site.external_link.is_none());
}

#[test]
fn rejects_invalid_values() {
    let mut raw = RawSettings::default();
    raw.cache.ttl_seconds = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "cache.ttl_seconds",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.site.url = Some("ftp://example.com".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid { key: "site.url", .. })
    ));

    let mut raw = RawSettings::default();
    raw.content.timezone = Some("Mars/Olympus".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "content.timezone",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.database.max_connections = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "inkwell",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "postgres://override",
        "--content-security-policy",
        "true",
        "--popularity-log-path",
        "/var/log/uwsgi.log",
    ]);

    assert_eq!(args.overrides.server_host.as_deref(), Some("0.0.0.0"));
    assert_eq!(
        args.overrides.database_url.as_deref(),
        Some("postgres://override")
    );
    assert_eq!(args.overrides.content_security_policy, Some(true));

    let mut raw = RawSettings::default();
    raw.apply_serve_overrides(&args.overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.server.content_security_policy);
    assert_eq!(
        settings.popularity.log_path,
        PathBuf::from("/var/log/uwsgi.log")
    );
    assert_eq!(settings.server.public_addr.ip().to_string(), "0.0.0.0");
}
