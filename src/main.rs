use std::{future::IntoFuture, process, sync::Arc, time::Duration};

use inkwell::{
    application::{
        chrome::ChromeService,
        error::AppError,
        listing::ListingService,
        popularity::FileRequestLog,
        post::PostService,
        render::markdown_renderer,
        sitemap::SitemapService,
        syndication::SyndicationService,
    },
    cache::{CacheConfig, SiteCache, SystemClock},
    config,
    infra::{
        assets::StaticFiles,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ContentSecurityPolicy, HttpState},
        telemetry,
    },
};
use tokio::{net::TcpListener, sync::Notify, task::JoinError};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    let pool = PostgresRepositories::connect_lazy(&settings.database)
        .map_err(|err| InfraError::database(err.to_string()))?;
    let repositories = Arc::new(PostgresRepositories::new(pool));

    let cache = Arc::new(SiteCache::new(
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        Arc::new(FileRequestLog::new(settings.popularity.log_path.clone())),
        CacheConfig::from(&settings),
        Arc::new(SystemClock),
    ));

    let chrome = Arc::new(ChromeService::new(cache.clone(), &settings));
    let site = Arc::new(settings.site.clone());
    let timezone = settings.content.timezone;

    let csp = if settings.server.content_security_policy {
        let policy = ContentSecurityPolicy::build(settings.site.csp_img_src.as_deref());
        if policy.is_none() {
            return Err(AppError::unexpected(
                "site.csp_img_src cannot be used in a Content-Security-Policy header",
            ));
        }
        policy
    } else {
        None
    };

    let state = HttpState {
        chrome,
        listing: Arc::new(ListingService::new(cache.clone(), repositories.clone())),
        posts: Arc::new(PostService::new(
            repositories.clone(),
            repositories.clone(),
            cache.clone(),
            settings.content.static_dir.clone(),
            markdown_renderer(),
        )),
        syndication: Arc::new(SyndicationService::new(
            cache.clone(),
            site.clone(),
            timezone,
        )),
        sitemap: Arc::new(SitemapService::new(cache, site, timezone)),
        assets: Arc::new(StaticFiles::new(settings.content.static_dir.clone())),
        db: repositories,
        csp,
    };

    serve_http(&settings, state).await
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let addr = settings.server.public_addr;
    let router = http::build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| InfraError::bind(addr, err))?;
    info!(target = "inkwell::serve", %addr, "listening");

    let shutdown = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown({
        let shutdown = shutdown.clone();
        async move { shutdown.notified().await }
    });
    let mut server = tokio::spawn(server.into_future());

    tokio::select! {
        joined = &mut server => return server_result(joined),
        () = shutdown_signal() => {
            info!(target = "inkwell::serve", "shutdown requested; draining connections");
            shutdown.notify_one();
        }
    }

    drain(server, settings.server.graceful_shutdown).await
}

async fn drain(
    server: tokio::task::JoinHandle<std::io::Result<()>>,
    grace: Duration,
) -> Result<(), AppError> {
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => server_result(joined),
        Err(_) => {
            warn!(
                target = "inkwell::serve",
                grace_seconds = grace.as_secs(),
                "connections still open after the shutdown grace period"
            );
            Ok(())
        }
    }
}

fn server_result(joined: Result<std::io::Result<()>, JoinError>) -> Result<(), AppError> {
    match joined {
        Ok(result) => result.map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "inkwell::serve", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(target = "inkwell::serve", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
