//! Disk-backed record store
//!
//! Provides a `CacheManager` that stores each record as a JSON file in an
//! XDG-compliant cache directory. Writes land in a temporary file that is
//! renamed over the old one, so a reader sees either the previous record or
//! the new one, never a partial file.

use async_trait::async_trait;
use directories::ProjectDirs;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

use super::store::{RecordStore, StoreError};
use crate::data::{Record, RecordKey};

/// Manages reading and writing records on disk
///
/// Uses `~/.cache/ratecache/` on Linux, or the equivalent per-platform path.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
    /// Serializes writers across clones of this manager
    write_lock: Arc<Mutex<()>>,
}

impl CacheManager {
    /// Creates a new CacheManager using the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "ratecache")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    /// Creates a new CacheManager with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Uses `dir` when given, otherwise the platform cache directory
    pub fn open(dir: Option<PathBuf>) -> Result<Self, StoreError> {
        match dir {
            Some(dir) => Ok(Self::with_dir(dir)),
            None => Self::new().ok_or(StoreError::NoCacheDir),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to a cache file for the given key
    fn cache_path(&self, key: &RecordKey) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key.storage_name()))
    }

    fn write_atomic(dir: &Path, path: &Path, json: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(dir)?;

        // Unique temp file per write; other processes may target the same key
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for CacheManager {
    async fn get(&self, key: &RecordKey) -> Result<Option<Record>, StoreError> {
        let content = match tokio::fs::read_to_string(self.cache_path(key)).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: Record = serde_json::from_str(&content)?;
        if &record.key != key {
            tracing::warn!(%key, found = %record.key, "cache file holds a different key");
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn upsert(&self, record: Record) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(&record)?;
        let dir = self.cache_dir.clone();
        let path = self.cache_path(&record.key);
        let lock = Arc::clone(&self.write_lock);

        // The blocking task runs to completion even if this future is dropped,
        // so a cancelled caller cannot leave a half-written record behind.
        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            Self::write_atomic(&dir, &path, &json)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CurrencyCode;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn create_test_cache() -> (CacheManager, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = CacheManager::with_dir(temp_dir.path().to_path_buf());
        (cache, temp_dir)
    }

    fn usd_key() -> RecordKey {
        RecordKey::Rates("usd".parse::<CurrencyCode>().unwrap())
    }

    fn record(key: RecordKey, payload: &str) -> Record {
        Record {
            key,
            payload: payload.to_string(),
            fetched_at: Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_file_in_cache_directory() {
        let (cache, temp_dir) = create_test_cache();

        cache
            .upsert(record(usd_key(), r#"{"usd":{"eur":0.9}}"#))
            .await
            .expect("Write should succeed");

        let expected_path = temp_dir.path().join("rates_usd.json");
        assert!(expected_path.exists(), "Cache file should exist");
        let entries = fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(entries, 1, "No temp files should be left behind");

        let content = fs::read_to_string(&expected_path).expect("Should read file");
        assert!(content.contains("fetched_at"));
        assert!(content.contains("eur"));
    }

    #[tokio::test]
    async fn test_get_returns_none_for_missing_key() {
        let (cache, _temp_dir) = create_test_cache();
        let result = cache.get(&RecordKey::Catalogue).await.unwrap();
        assert!(result.is_none(), "Should return None for missing key");
    }

    #[tokio::test]
    async fn test_record_survives_roundtrip() {
        let (cache, _temp_dir) = create_test_cache();
        let original = record(RecordKey::Catalogue, r#"{"eur":"Euro"}"#);

        cache.upsert(original.clone()).await.unwrap();
        let loaded = cache.get(&RecordKey::Catalogue).await.unwrap();

        assert_eq!(loaded, Some(original));
    }

    #[tokio::test]
    async fn test_upsert_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("cache").join("dir");
        let cache = CacheManager::with_dir(nested_path.clone());

        cache.upsert(record(usd_key(), "{}")).await.unwrap();

        assert!(nested_path.join("rates_usd.json").exists());
    }

    #[tokio::test]
    async fn test_overwrite_existing_record() {
        let (cache, _temp_dir) = create_test_cache();

        cache.upsert(record(usd_key(), "first")).await.unwrap();
        cache.upsert(record(usd_key(), "second")).await.unwrap();

        let loaded = cache.get(&usd_key()).await.unwrap().unwrap();
        assert_eq!(loaded.payload, "second");
    }

    #[tokio::test]
    async fn test_keys_do_not_collide() {
        let (cache, _temp_dir) = create_test_cache();
        let eur = RecordKey::Rates("eur".parse::<CurrencyCode>().unwrap());

        cache.upsert(record(usd_key(), "usd-payload")).await.unwrap();
        cache.upsert(record(eur.clone(), "eur-payload")).await.unwrap();
        cache.upsert(record(RecordKey::Catalogue, "cat")).await.unwrap();

        assert_eq!(cache.get(&usd_key()).await.unwrap().unwrap().payload, "usd-payload");
        assert_eq!(cache.get(&eur).await.unwrap().unwrap().payload, "eur-payload");
        assert_eq!(cache.get(&RecordKey::Catalogue).await.unwrap().unwrap().payload, "cat");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let (cache, temp_dir) = create_test_cache();
        fs::write(temp_dir.path().join("currencies.json"), "{ not json").unwrap();

        let result = cache.get(&RecordKey::Catalogue).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_leave_a_complete_record() {
        let (cache, _temp_dir) = create_test_cache();

        let writes = (0..16).map(|i| {
            let cache = cache.clone();
            async move { cache.upsert(record(usd_key(), &format!("payload-{i}"))).await }
        });
        for result in futures::future::join_all(writes).await {
            result.unwrap();
        }

        let loaded = cache.get(&usd_key()).await.unwrap().unwrap();
        assert!(loaded.payload.starts_with("payload-"));
    }

    #[test]
    fn test_independent_managers_on_same_dir_never_mix_records() {
        // Separate managers have separate locks, like two CLI processes
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let long = format!("{{\"usd\":{{\"eur\":0.9}},\"pad\":\"{}\"}}", "x".repeat(4096));
        let short = r#"{"usd":{"eur":0.8}}"#.to_string();

        let writers: Vec<_> = [long.clone(), short.clone()]
            .into_iter()
            .map(|payload| {
                let cache = CacheManager::with_dir(temp_dir.path().to_path_buf());
                std::thread::spawn(move || {
                    let runtime = tokio::runtime::Builder::new_current_thread()
                        .build()
                        .unwrap();
                    for _ in 0..25 {
                        runtime
                            .block_on(cache.upsert(record(usd_key(), &payload)))
                            .unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let content = fs::read_to_string(temp_dir.path().join("rates_usd.json")).unwrap();
        let loaded: Record = serde_json::from_str(&content).expect("record must be complete");
        assert!(loaded.payload == long || loaded.payload == short);
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(cache) = CacheManager::new() {
            let path_str = cache.cache_dir.to_string_lossy();
            assert!(
                path_str.contains("ratecache"),
                "Cache path should contain project name"
            );
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }

    #[test]
    fn test_open_prefers_explicit_dir() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheManager::open(Some(temp_dir.path().to_path_buf())).unwrap();
        assert_eq!(cache.cache_dir(), temp_dir.path());
    }
}
