use std::path::PathBuf;

use clap::{Args, Parser, builder::BoolishValueParser};

/// Command-line arguments for the Inkwell binary.
#[derive(Debug, Parser)]
#[command(name = "inkwell", version, about = "Inkwell blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "INKWELL_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Send a Content-Security-Policy header with every response.
    #[arg(
        long = "content-security-policy",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub content_security_policy: Option<bool>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the request log scanned for popular posts.
    #[arg(long = "popularity-log-path", value_name = "PATH")]
    pub popularity_log_path: Option<PathBuf>,

    /// Override the directory served under `/static`.
    #[arg(long = "static-dir", value_name = "PATH")]
    pub static_dir: Option<PathBuf>,
}
