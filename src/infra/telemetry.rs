use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for every metric the server emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "inkwell_cache_hit_total",
            Unit::Count,
            "Reads served from a fresh cached view."
        );
        describe_counter!(
            "inkwell_cache_refresh_total",
            Unit::Count,
            "Successful synchronous refreshes of a stale or empty cached view."
        );
        describe_counter!(
            "inkwell_cache_refresh_failed_total",
            Unit::Count,
            "Refresh attempts that failed and left the previous value in place."
        );
        describe_histogram!(
            "inkwell_cache_refresh_ms",
            Unit::Milliseconds,
            "Time spent recomputing a cached view."
        );
        describe_counter!(
            "inkwell_db_reconnect_total",
            Unit::Count,
            "Statements retried after the database connection was lost."
        );
    });
}
