use std::path::PathBuf;

use tracing::{debug, warn};

/// Append-only on-disk store for raw provider responses, one file per
/// session-scoped request. Entries are never rewritten or expired; the
/// directory itself is created once at startup.
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ResponseCache { dir: dir.into() }
    }

    pub fn file_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize(key)))
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let body = tokio::fs::read_to_string(self.file_path(key)).await.ok()?;
        debug!("cache hit for {key}");
        Some(body)
    }

    /// Best effort: a failed write is logged and the response is still
    /// served from memory.
    pub async fn put(&self, key: &str, body: &str) {
        if let Err(err) = tokio::fs::write(self.file_path(key), body).await {
            warn!("failed to cache response for {key}: {err}");
        }
    }
}

fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
