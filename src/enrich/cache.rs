// src/enrich/cache.rs
//! Content-addressed, TTL-bound store for model replies, shared across runs.
//!
//! One JSON record per key under the cache directory. Entries are immutable
//! once written (identical inputs hash to the same key), so concurrent
//! writers need no locking: writes are whole-file tmp+rename replacements,
//! and same-key writers are idempotent.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::enrich::model::ModelVerdict;

/// Entries older than this are evicted lazily at lookup time.
pub const CACHE_TTL_HOURS: i64 = 168;

/// How much of the article text participates in the cache key.
const KEY_TEXT_PREFIX_CHARS: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: ModelVerdict,
    pub cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn default_dir() -> PathBuf {
        PathBuf::from("cache/model")
    }

    /// Deterministic content hash over `(url, title, text prefix)`.
    pub fn cache_key(url: &str, title: &str, text: &str) -> String {
        let prefix: String = text.chars().take(KEY_TEXT_PREFIX_CHARS).collect();
        let mut hasher = Sha256::new();
        hasher.update(format!("{url}:{title}:{prefix}").as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn lookup(&self, key: &str) -> Option<ModelVerdict> {
        self.lookup_at(key, Utc::now())
    }

    /// TTL is enforced against `now`; expired or unreadable entries are
    /// deleted and treated as misses.
    pub fn lookup_at(&self, key: &str, now: DateTime<Utc>) -> Option<ModelVerdict> {
        let path = self.entry_path(key);
        let raw = fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = ?e, key, "corrupt cache entry, deleting");
                let _ = fs::remove_file(&path);
                return None;
            }
        };
        let age_hours = (now - entry.cached_at).num_hours();
        if age_hours >= CACHE_TTL_HOURS {
            tracing::debug!(key, age_hours, "cache entry expired");
            let _ = fs::remove_file(&path);
            return None;
        }
        tracing::debug!(key = &key[..8.min(key.len())], "cache hit");
        Some(entry.value)
    }

    pub fn store(&self, key: &str, value: &ModelVerdict) -> Result<()> {
        self.store_at(key, value, Utc::now())
    }

    pub fn store_at(&self, key: &str, value: &ModelVerdict, now: DateTime<Utc>) -> Result<()> {
        let entry = CacheEntry {
            key: key.to_string(),
            value: value.clone(),
            cached_at: now,
        };
        fs::create_dir_all(&self.dir).context("creating cache dir")?;
        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&entry).context("serializing cache entry")?;
        let mut f = fs::File::create(&tmp).context("creating cache tmp file")?;
        f.write_all(json.as_bytes()).context("writing cache tmp file")?;
        fs::rename(&tmp, &path).context("publishing cache entry")?;
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn verdict() -> ModelVerdict {
        ModelVerdict {
            blurb: Some("短い要約".to_string()),
            category: Some("tech".to_string()),
            stars: Some(4),
        }
    }

    #[test]
    fn key_depends_on_each_input() {
        let a = ResponseCache::cache_key("https://e.com/1", "t", "body");
        let b = ResponseCache::cache_key("https://e.com/2", "t", "body");
        let c = ResponseCache::cache_key("https://e.com/1", "t", "other body");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, ResponseCache::cache_key("https://e.com/1", "t", "body"));
    }

    #[test]
    fn only_the_text_prefix_matters() {
        let long_a = format!("{}{}", "x".repeat(500), "tail one");
        let long_b = format!("{}{}", "x".repeat(500), "tail two");
        assert_eq!(
            ResponseCache::cache_key("u", "t", &long_a),
            ResponseCache::cache_key("u", "t", &long_b)
        );
    }

    #[test]
    fn entry_survives_within_ttl_and_expires_after() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(tmp.path().to_path_buf());
        let t0 = Utc::now();
        cache.store_at("k1", &verdict(), t0).unwrap();

        let within = t0 + Duration::hours(CACHE_TTL_HOURS - 1);
        assert_eq!(cache.lookup_at("k1", within), Some(verdict()));

        let after = t0 + Duration::hours(CACHE_TTL_HOURS);
        assert_eq!(cache.lookup_at("k1", after), None);
        // Lazy eviction removed the file; a later in-window lookup stays a miss.
        assert_eq!(cache.lookup_at("k1", within), None);
    }

    #[test]
    fn corrupt_entries_become_misses_and_are_deleted() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(tmp.path().to_path_buf());
        let path = tmp.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(cache.lookup_at("bad", Utc::now()), None);
        assert!(!path.exists());
    }
}
