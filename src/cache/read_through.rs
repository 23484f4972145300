//! Generic read-through cell with a fixed staleness window.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::clock::Clock;

struct Slot<T> {
    value: Option<T>,
    refreshed_at: Option<Instant>,
}

/// Holds one derived view and recomputes it synchronously once it is older than `ttl`.
///
/// Callers of the same cell queue on its lock, so a stale view is refreshed at most
/// once no matter how many requests notice it. A failed refresh keeps the previous
/// value and timestamp.
pub struct ReadThrough<T> {
    view: &'static str,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: Mutex<Slot<T>>,
}

impl<T: Clone> ReadThrough<T> {
    pub fn new(view: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            view,
            ttl,
            clock,
            slot: Mutex::new(Slot {
                value: None,
                refreshed_at: None,
            }),
        }
    }

    pub fn view(&self) -> &'static str {
        self.view
    }

    /// Return the cached value, running `refresh` first when the cell is empty or stale.
    pub async fn get_or_refresh<F, Fut, E>(&self, refresh: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut slot = self.slot.lock().await;
        let now = self.clock.now();

        if let (Some(value), Some(refreshed_at)) = (slot.value.as_ref(), slot.refreshed_at)
            && now.saturating_duration_since(refreshed_at) <= self.ttl
        {
            counter!("inkwell_cache_hit_total", "view" => self.view).increment(1);
            return Ok(value.clone());
        }

        let started = Instant::now();
        match refresh().await {
            Ok(value) => {
                slot.value = Some(value.clone());
                slot.refreshed_at = Some(now);

                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                counter!("inkwell_cache_refresh_total", "view" => self.view).increment(1);
                histogram!("inkwell_cache_refresh_ms", "view" => self.view).record(elapsed_ms);
                debug!(
                    target = "inkwell::cache",
                    view = self.view,
                    elapsed_ms,
                    "cache view refreshed"
                );
                Ok(value)
            }
            Err(err) => {
                counter!("inkwell_cache_refresh_failed_total", "view" => self.view).increment(1);
                warn!(
                    target = "inkwell::cache",
                    view = self.view,
                    error = %err,
                    "cache view refresh failed"
                );
                Err(err)
            }
        }
    }

    /// When the held value was last refreshed, if ever.
    pub async fn refreshed_at(&self) -> Option<Instant> {
        self.slot.lock().await.refreshed_at
    }

    /// Forget the held value so the next read refreshes.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        slot.value = None;
        slot.refreshed_at = None;
    }
}
