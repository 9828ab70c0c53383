use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Disk-backed response cache, one JSON file per request.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    ttl: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    stored_at: u64,
    value: Value,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// SHA-256 over method, path and JSON body, NUL separated.
    pub fn key(method: &str, path: &str, body: Option<&Value>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(method.as_bytes());
        hasher.update(b"\0");
        hasher.update(path.as_bytes());
        hasher.update(b"\0");
        if let Some(body) = body {
            hasher.update(body.to_string().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let path = self.entry_path(key);
        let raw = tokio::fs::read(&path).await.ok()?;

        let entry: CacheEntry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Dropping corrupt cache entry {}: {}", path.display(), e);
                let _ = tokio::fs::remove_file(&path).await;
                return None;
            }
        };

        let age = now_secs().saturating_sub(entry.stored_at);
        if age > self.ttl.as_secs() {
            tracing::debug!("Cache entry {} expired ({}s old)", key, age);
            let _ = tokio::fs::remove_file(&path).await;
            return None;
        }

        tracing::debug!("Cache hit: {}", key);
        Some(entry.value)
    }

    pub async fn put(&self, key: &str, value: &Value) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let entry = CacheEntry {
            stored_at: now_secs(),
            value: value.clone(),
        };
        tokio::fs::write(self.entry_path(key), serde_json::to_vec(&entry)?).await?;
        Ok(())
    }

    /// Remove every entry; returns how many files were deleted.
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub async fn len(&self) -> Result<usize> {
        let mut count = 0;
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        while let Some(item) = dir.next_entry().await? {
            if item.path().extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
        Ok(count)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_key_depends_on_method_path_and_body() {
        let body = json!({"startDate": "2024-01-01T00:00:00+03:00"});
        let a = DiskCache::key("POST", "/markets/dam/data/mcp", Some(&body));
        let b = DiskCache::key("POST", "/markets/dam/data/mcp", Some(&body));
        let c = DiskCache::key("GET", "/markets/dam/data/mcp", Some(&body));
        let d = DiskCache::key("POST", "/markets/dam/data/mcp", None);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.len(), 64);
        assert_ne!(
            DiskCache::key("POST", "/markets", None),
            DiskCache::key("POS", "T/markets", None)
        );
    }

    #[tokio::test]
    async fn test_put_get_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskCache::new(temp_dir.path().join("cache"), Duration::from_secs(60));

        assert!(cache.get("missing").await.is_none());
        assert_eq!(cache.len().await.unwrap(), 0);

        cache.put("abc", &json!({"items": [1, 2]})).await.unwrap();
        assert_eq!(cache.get("abc").await.unwrap()["items"][1], 2);
        assert_eq!(cache.len().await.unwrap(), 1);

        assert_eq!(cache.clear().await.unwrap(), 1);
        assert!(cache.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_entries_are_removed() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskCache::new(temp_dir.path(), Duration::from_secs(10));

        let stale = json!({"stored_at": now_secs() - 3600, "value": {"x": 1}});
        std::fs::write(temp_dir.path().join("old.json"), stale.to_string()).unwrap();

        assert!(cache.get("old").await.is_none());
        assert!(!temp_dir.path().join("old.json").exists());
    }

    #[tokio::test]
    async fn test_corrupt_entries_are_removed() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskCache::new(temp_dir.path(), Duration::from_secs(10));
        let path = temp_dir.path().join("bad.json");
        std::fs::write(&path, b"{not json").unwrap();

        assert!(cache.get("bad").await.is_none());
        assert!(!path.exists());
    }
}
