use std::future::Future;

use metrics::counter;
use tracing::warn;

use crate::application::repos::RepoError;

/// Retries allowed after a lost connection before a statement is reported unavailable.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 1;

/// Whether the error means the connection itself went away, as opposed to a bad statement.
pub fn is_connection_lost(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => true,
        sqlx::Error::Database(db) => db.code().is_some_and(|code| {
            let code: &str = &code;
            code.starts_with("08") || matches!(code, "57P01" | "57P02" | "57P03")
        }),
        _ => false,
    }
}

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => {
            RepoError::unavailable("timed out waiting for a database connection")
        }
        err if is_connection_lost(&err) => RepoError::unavailable(err),
        other => RepoError::from_persistence(other),
    }
}

/// Run a statement, re-running it on a fresh pooled connection if the connection drops.
///
/// Each call to `run` checks out its own connection, so a retry never reuses the
/// connection that failed. After `MAX_RECONNECT_ATTEMPTS` retries the loss is
/// reported as [`RepoError::Unavailable`].
pub async fn with_reconnect<T, F, Fut>(statement: &'static str, mut run: F) -> Result<T, RepoError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut retries = 0;
    loop {
        match run().await {
            Ok(value) => return Ok(value),
            Err(err) if retries < MAX_RECONNECT_ATTEMPTS && is_connection_lost(&err) => {
                retries += 1;
                counter!("inkwell_db_reconnect_total", "statement" => statement).increment(1);
                warn!(
                    target = "inkwell::db",
                    statement,
                    attempt = retries,
                    error = %err,
                    "lost database connection, retrying on a fresh connection"
                );
            }
            Err(err) => return Err(map_sqlx_error(err)),
        }
    }
}

/// Convert a `LIMIT`/`OFFSET` operand into the signed type Postgres expects.
pub(super) fn to_sql_bound(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(super) fn from_sql_count(value: i64) -> Result<u64, RepoError> {
    u64::try_from(value).map_err(|_| RepoError::from_persistence("negative row count"))
}
