//! Popular-post ranking from the front server's request log.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;

const POST_REQUEST_MARKER: &str = "] GET /post/";

/// Where the raw request log comes from.
#[async_trait]
pub trait RequestLogSource: Send + Sync {
    async fn read_log(&self) -> io::Result<String>;
}

/// Reads the whole request log file on each refresh.
#[derive(Debug, Clone)]
pub struct FileRequestLog {
    path: PathBuf,
}

impl FileRequestLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl RequestLogSource for FileRequestLog {
    async fn read_log(&self) -> io::Result<String> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Rank post keys by how often `GET /post/<key>` appears in the log.
///
/// Ties keep the order in which keys first appeared. Only the first `limit` keys are returned.
pub fn rank_popular(log: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

    for line in log.lines() {
        let Some((_, rest)) = line.split_once(POST_REQUEST_MARKER) else {
            continue;
        };
        let Some(key) = rest.split_whitespace().next() else {
            continue;
        };
        let first_seen = counts.len();
        counts.entry(key).or_insert((0, first_seen)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(key, (hits, first_seen))| (key, hits, first_seen))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(key, _, _)| key.to_string())
        .collect()
}
