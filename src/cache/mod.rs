//! Inkwell cache layer.
//!
//! Every derived view the site needs on most requests (the all-posts index, the
//! top tags, the post count and the popular posts) lives in a [`ReadThrough`]
//! cell. A cell is refreshed synchronously by the request that finds it stale;
//! nothing refreshes in the background.
//!
//! ```toml
//! [cache]
//! ttl_seconds = 7200
//! top_tags_limit = 15
//! ```

mod clock;
mod config;
mod read_through;
mod site;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use read_through::ReadThrough;
pub use site::SiteCache;
