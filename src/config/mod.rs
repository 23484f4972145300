//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{CliArgs, ServeOverrides};

use std::{
    net::SocketAddr,
    num::NonZeroU32,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use chrono_tz::Tz;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "inkwell";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_USER: &str = "blog";
const DEFAULT_DB_PASSWORD: &str = "blog";
const DEFAULT_DB_NAME: &str = "blog";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CACHE_TTL_SECS: u64 = 2 * 60 * 60;
const DEFAULT_TOP_TAGS_LIMIT: u32 = 15;
const DEFAULT_POPULARITY_LOG: &str = "uwsgi.log";
const DEFAULT_POPULAR_LIMIT: u32 = 3;
const DEFAULT_STATIC_DIR: &str = "static";

const DEFAULT_SITE_URL: &str = "https://blog.matthewrease.net";
const DEFAULT_SITE_TITLE: &str = "Compressed Thoughts";
const DEFAULT_SITE_AUTHOR: &str = "Matthew Rease";
const DEFAULT_SITE_DESCRIPTION: &str = "Welcome to the thoughts of 1/7,762,000,000 of the world.";
const DEFAULT_SITE_KEYWORDS: [&str; 14] = [
    "matthew",
    "rease",
    "blog",
    "compressed",
    "thoughts",
    "old",
    "forge",
    "inn",
    "oldforgeinn",
    "post",
    "technology",
    "personal",
    "life",
    "blogging",
];
const DEFAULT_ICON_SIZE: u32 = 548;
const DEFAULT_ICON_ALT: &str = "Silhouette of a human head between a vise clamp.";
const DEFAULT_PROFILE_IMAGE_URL: &str = "https://cdn.matthewrease.net/images/me_young.jp2";
const DEFAULT_PROFILE_IMAGE_ALT: &str =
    "My Mom holding my arm, while I (a child) am trying to pet a bear cub at the zoo.";
const DEFAULT_PROFILE_HTML: &str = "Bedroom programmer, all-day nerd. I've been programming since I was in middle school, and I've always liked to entertain people, so I hope that will come across in my posts. If you want to learn more about me, see <a href=\"https://matthewrease.net/about/\"><strong>my profile</strong></a>.";
const DEFAULT_LICENSE: &str = "CC BY-NC-SA 4.0";
const DEFAULT_LICENSE_URL: &str = "https://creativecommons.org/licenses/by-nc-sa/4.0/";
const DEFAULT_RSS_DESCRIPTION: &str =
    "Personal blog of Matthew Rease. Elsewhere called \"the thoughts of 1/7,762,000,000 of the world.\"";
const DEFAULT_RSS_LICENSE: &str =
    "the Creative Commons Attribution NonCommercial ShareAlike 4.0 International";
const DEFAULT_EXTERNAL_URL: &str = "https://matthewrease.net/";
const DEFAULT_EXTERNAL_TEXT: &str = "Return to the Inn";
const DEFAULT_CSP_IMG_SRC: &str = "cdn.matthewrease.net";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub popularity: PopularitySettings,
    pub content: ContentSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub graceful_shutdown: Duration,
    pub content_security_policy: bool,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Connection settings; `url` wins over the individual fields when present.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: NonZeroU32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub top_tags_limit: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct PopularitySettings {
    pub log_path: PathBuf,
    pub limit: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub static_dir: PathBuf,
    pub timezone: Tz,
}

/// Branding and personalization shown on every page and in the feeds.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub url: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub icon_width: u32,
    pub icon_height: u32,
    pub icon_alt: String,
    pub profile_image_url: String,
    pub profile_image_alt: String,
    pub profile_html: String,
    pub license: String,
    pub license_url: String,
    pub rss_description: String,
    pub rss_license: String,
    pub external_link: Option<ExternalLink>,
    pub csp_img_src: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExternalLink {
    pub url: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("INKWELL").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_serve_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

impl Settings {
    /// Built-in defaults with no file, environment or CLI input applied.
    pub fn defaults() -> Result<Self, LoadError> {
        Self::from_raw(RawSettings::default())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    popularity: RawPopularitySettings,
    content: RawContentSettings,
    site: RawSiteSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(enabled) = overrides.content_security_policy {
            self.server.content_security_policy = Some(enabled);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(path) = overrides.popularity_log_path.as_ref() {
            self.popularity.log_path = Some(path.clone());
        }
        if let Some(dir) = overrides.static_dir.as_ref() {
            self.content.static_dir = Some(dir.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
            popularity,
            content,
            site,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            popularity: build_popularity_settings(popularity)?,
            content: build_content_settings(content)?,
            site: build_site_settings(site)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let public_addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        public_addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
        content_security_policy: server.content_security_policy.unwrap_or(false),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_empty(database.url);

    let port = database.port.unwrap_or(DEFAULT_DB_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "database.port",
            "port must be greater than zero",
        ));
    }

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    let acquire_secs = database
        .acquire_timeout_seconds
        .unwrap_or(DEFAULT_DB_ACQUIRE_TIMEOUT_SECS);
    if acquire_secs == 0 {
        return Err(LoadError::invalid(
            "database.acquire_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(DatabaseSettings {
        url,
        host: non_empty(database.host).unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
        port,
        user: non_empty(database.user).unwrap_or_else(|| DEFAULT_DB_USER.to_string()),
        password: database
            .password
            .unwrap_or_else(|| DEFAULT_DB_PASSWORD.to_string()),
        name: non_empty(database.name).unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
        max_connections,
        acquire_timeout: Duration::from_secs(acquire_secs),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl_secs = cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_secs == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }

    let top_tags_limit = non_zero_u32(
        cache
            .top_tags_limit
            .unwrap_or(DEFAULT_TOP_TAGS_LIMIT)
            .into(),
        "cache.top_tags_limit",
    )?;

    Ok(CacheSettings {
        ttl: Duration::from_secs(ttl_secs),
        top_tags_limit,
    })
}

fn build_popularity_settings(
    popularity: RawPopularitySettings,
) -> Result<PopularitySettings, LoadError> {
    let log_path = popularity
        .log_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_POPULARITY_LOG));
    if log_path.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "popularity.log_path",
            "path must not be empty",
        ));
    }

    let limit = non_zero_u32(
        popularity.limit.unwrap_or(DEFAULT_POPULAR_LIMIT).into(),
        "popularity.limit",
    )?;

    Ok(PopularitySettings { log_path, limit })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let static_dir = content
        .static_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));
    if static_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "content.static_dir",
            "path must not be empty",
        ));
    }

    let timezone = match non_empty(content.timezone) {
        Some(name) => Tz::from_str(&name).map_err(|err| {
            LoadError::invalid("content.timezone", format!("unknown timezone `{name}`: {err}"))
        })?,
        None => Tz::UTC,
    };

    Ok(ContentSettings {
        static_dir,
        timezone,
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let url = non_empty(site.url).unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
    let parsed = Url::parse(&url)
        .map_err(|err| LoadError::invalid("site.url", format!("invalid url `{url}`: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "site.url",
            "scheme must be http or https",
        ));
    }

    let keywords = site.keywords.unwrap_or_else(|| {
        DEFAULT_SITE_KEYWORDS
            .iter()
            .map(|keyword| keyword.to_string())
            .collect()
    });
    if keywords.iter().all(|keyword| keyword.trim().is_empty()) {
        return Err(LoadError::invalid(
            "site.keywords",
            "at least one keyword is required",
        ));
    }

    let description =
        non_empty(site.description).unwrap_or_else(|| DEFAULT_SITE_DESCRIPTION.to_string());
    let license = non_empty(site.license).unwrap_or_else(|| DEFAULT_LICENSE.to_string());

    // Blank feed texts fall back to the page-level ones.
    let rss_description = match site.rss_description {
        Some(value) if value.trim().is_empty() => description.clone(),
        Some(value) => value,
        None => DEFAULT_RSS_DESCRIPTION.to_string(),
    };
    let rss_license = match site.rss_license {
        Some(value) if value.trim().is_empty() => license.clone(),
        Some(value) => value,
        None => DEFAULT_RSS_LICENSE.to_string(),
    };

    let external_url = match site.external_url {
        Some(value) => non_empty(Some(value)),
        None => Some(DEFAULT_EXTERNAL_URL.to_string()),
    };
    let external_link = external_url.map(|url| ExternalLink {
        url,
        text: non_empty(site.external_text.clone())
            .unwrap_or_else(|| DEFAULT_EXTERNAL_TEXT.to_string()),
    });

    let csp_img_src = match site.csp_img_src {
        Some(value) => non_empty(Some(value)),
        None => Some(DEFAULT_CSP_IMG_SRC.to_string()),
    };

    Ok(SiteSettings {
        url,
        title: non_empty(site.title).unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string()),
        author: non_empty(site.author).unwrap_or_else(|| DEFAULT_SITE_AUTHOR.to_string()),
        description,
        keywords,
        icon_width: site.icon_width.unwrap_or(DEFAULT_ICON_SIZE),
        icon_height: site.icon_height.unwrap_or(DEFAULT_ICON_SIZE),
        icon_alt: site
            .icon_alt
            .unwrap_or_else(|| DEFAULT_ICON_ALT.to_string()),
        profile_image_url: site
            .profile_image_url
            .unwrap_or_else(|| DEFAULT_PROFILE_IMAGE_URL.to_string()),
        profile_image_alt: site
            .profile_image_alt
            .unwrap_or_else(|| DEFAULT_PROFILE_IMAGE_ALT.to_string()),
        profile_html: site
            .profile_html
            .unwrap_or_else(|| DEFAULT_PROFILE_HTML.to_string()),
        license,
        license_url: site
            .license_url
            .unwrap_or_else(|| DEFAULT_LICENSE_URL.to_string()),
        rss_description,
        rss_license,
        external_link,
        csp_img_src,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
    content_security_policy: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    name: Option<String>,
    max_connections: Option<u32>,
    acquire_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    ttl_seconds: Option<u64>,
    top_tags_limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPopularitySettings {
    log_path: Option<PathBuf>,
    limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    static_dir: Option<PathBuf>,
    timezone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    url: Option<String>,
    title: Option<String>,
    author: Option<String>,
    description: Option<String>,
    keywords: Option<Vec<String>>,
    icon_width: Option<u32>,
    icon_height: Option<u32>,
    icon_alt: Option<String>,
    profile_image_url: Option<String>,
    profile_image_alt: Option<String>,
    profile_html: Option<String>,
    license: Option<String>,
    license_url: Option<String>,
    rss_description: Option<String>,
    rss_license: Option<String>,
    external_url: Option<String>,
    external_text: Option<String>,
    csp_img_src: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;
