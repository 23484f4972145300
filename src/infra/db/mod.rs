//! Postgres-backed repository implementations.

mod posts;
mod tags;
mod users;
mod util;

pub use util::{MAX_RECONNECT_ATTEMPTS, is_connection_lost, map_sqlx_error, with_reconnect};

use std::sync::Arc;

use sqlx::{
    postgres::{PgConnectOptions, PgPool, PgPoolOptions},
    query,
};

use crate::config::DatabaseSettings;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Build a pool that opens connections on first checkout rather than at startup.
    pub fn connect_lazy(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
        let options = connect_options(settings)?;
        Ok(PgPoolOptions::new()
            .max_connections(settings.max_connections.get())
            .acquire_timeout(settings.acquire_timeout)
            .connect_lazy_with(options))
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}

/// Connection options from either the full URL or the individual fields.
pub fn connect_options(settings: &DatabaseSettings) -> Result<PgConnectOptions, sqlx::Error> {
    match settings.url.as_deref() {
        Some(url) => url.parse(),
        None => Ok(PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.name)),
    }
}
